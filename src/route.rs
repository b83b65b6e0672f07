//! Assembly of the final [`RouteInfo`] and the public parse entry points.

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::error::ParseError;
use crate::gpx_types::{ParsedDocument, RouteInfo};
use crate::options::ParseOptions;
use crate::parser::parse_document;
use crate::stats::aggregate;

/// Source of the processing instant used when a document carries no time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Parse GPX text with default options and the system clock.
pub fn parse(gpx: &str, fallback_name: &str) -> Result<RouteInfo, ParseError> {
    parse_with(gpx, fallback_name, &ParseOptions::default(), &SystemClock)
}

/// Parse GPX text and derive its route statistics.
///
/// `fallback_name` is used when neither `<metadata>` nor any `<trk>` names the route.
#[instrument(skip_all, fields(fallback_name = %fallback_name))]
pub fn parse_with(
    gpx: &str,
    fallback_name: &str,
    opts: &ParseOptions,
    clock: &impl Clock,
) -> Result<RouteInfo, ParseError> {
    let doc = parse_document(gpx, opts)?;
    let route = assemble(doc, fallback_name, clock);
    debug!(
        points = route.points.len(),
        skipped = route.skipped_points,
        distance_km = route.distance_km,
        "parsed route"
    );
    Ok(route)
}

/// Combine parsed metadata and aggregated statistics into a [`RouteInfo`].
pub fn assemble(doc: ParsedDocument, fallback_name: &str, clock: &impl Clock) -> RouteInfo {
    let stats = aggregate(&doc.points);
    let (distance_km, elevation) = stats.rounded();

    RouteInfo {
        name: doc.meta.name.unwrap_or_else(|| fallback_name.to_string()),
        description: doc.meta.description.unwrap_or_default(),
        source_date: doc.meta.time.unwrap_or_else(|| clock.now()),
        points: doc.points,
        distance_km,
        elevation,
        duration_secs: stats.duration_secs,
        skipped_points: doc.skipped_points,
    }
}
