use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const KM_TO_MILES: f64 = 0.621_371;

/// One track vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            elevation: None,
            timestamp: None,
        }
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }
}

/// Document-level fields read from `<metadata>` or the first `<trk>` carrying them.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DocumentMeta {
    pub name: Option<String>,
    pub description: Option<String>,
    pub time: Option<DateTime<Utc>>,
}

/// Parser output: every track point of every segment, flattened in document order.
#[derive(Debug, Default)]
pub struct ParsedDocument {
    pub meta: DocumentMeta,
    pub points: Vec<GeoPoint>,
    pub skipped_points: usize,
}

/// Elevation figures in whole meters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElevationStats {
    pub min: f64,
    pub max: f64,
    pub gain: f64,
    pub loss: f64,
}

/// The parsed-and-derived result for one GPX document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteInfo {
    pub name: String,
    pub description: String,
    pub source_date: DateTime<Utc>,
    pub points: Vec<GeoPoint>,
    /// Kilometers, two decimals.
    pub distance_km: f64,
    pub elevation: ElevationStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    pub skipped_points: usize,
}

impl RouteInfo {
    pub fn distance_miles(&self) -> f64 {
        self.distance_km * KM_TO_MILES
    }

    pub fn distance_label(&self) -> String {
        format!("{:.2} km", self.distance_km)
    }
}
