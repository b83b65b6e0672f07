//! Single-pass reduction of a point sequence into distance, elevation and duration.

use chrono::{DateTime, Utc};

use crate::geodesic::distance_between;
use crate::gpx_types::{ElevationStats, GeoPoint};

/// Unrounded aggregates of one point sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackStats {
    pub distance_m: f64,
    pub elevation: ElevationStats,
    pub duration_secs: Option<f64>,
}

impl TrackStats {
    /// Distance in kilometers rounded to two decimals, elevation to whole meters.
    pub fn rounded(&self) -> (f64, ElevationStats) {
        let km = (self.distance_m / 1000.0 * 100.0).round() / 100.0;
        let elevation = ElevationStats {
            min: whole_meters(self.elevation.min),
            max: whole_meters(self.elevation.max),
            gain: whole_meters(self.elevation.gain),
            loss: whole_meters(self.elevation.loss),
        };
        (km, elevation)
    }
}

/// Round to the nearest meter; `-0.0` becomes `0.0`.
fn whole_meters(value: f64) -> f64 {
    value.round() + 0.0
}

/// Accumulate distance over consecutive pairs and elevation over elevation-bearing points.
///
/// Points without elevation do not break the gain/loss chain: the last point that
/// carried elevation stays the reference for the next one that does.
pub fn aggregate(points: &[GeoPoint]) -> TrackStats {
    let mut distance_m = 0.0;
    let mut gain = 0.0;
    let mut loss = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut last_ele: Option<f64> = None;
    let mut last_time: Option<DateTime<Utc>> = None;
    let mut duration_secs = 0.0;
    let mut timed_pairs = 0usize;
    let mut prev: Option<&GeoPoint> = None;

    for pt in points {
        if let Some(p) = prev {
            distance_m += distance_between(p, pt);
        }
        prev = Some(pt);

        if let Some(ele) = pt.elevation {
            min = min.min(ele);
            max = max.max(ele);
            if let Some(last) = last_ele {
                let diff = ele - last;
                if diff > 0.0 {
                    gain += diff;
                } else {
                    loss += -diff;
                }
            }
            last_ele = Some(ele);
        }

        if let Some(t) = pt.timestamp {
            if let Some(last) = last_time {
                let delta = (t - last).num_milliseconds() as f64 / 1000.0;
                if delta > 0.0 {
                    duration_secs += delta;
                }
                timed_pairs += 1;
            }
            last_time = Some(t);
        }
    }

    if last_ele.is_none() {
        min = 0.0;
        max = 0.0;
    }

    TrackStats {
        distance_m,
        elevation: ElevationStats {
            min,
            max,
            gain,
            loss,
        },
        duration_secs: (timed_pairs > 0).then_some(duration_secs),
    }
}
