//! The JSON sidecar stored next to every uploaded GPX file, and file loading.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::ParseError;
use crate::gpx_types::RouteInfo;
use crate::options::ParseOptions;
use crate::route::{Clock, parse_with};

/// Elevation block of a sidecar; loss is not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SidecarElevation {
    pub min: f64,
    pub max: f64,
    pub gain: f64,
}

/// One stored upload, written as `<fileName>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMetadata {
    pub title: String,
    pub description: String,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    /// ISO-8601, millisecond precision, UTC.
    pub uploaded_at: String,
    /// Kilometers.
    pub distance: f64,
    pub elevation: SidecarElevation,
}

/// Upload-form fields that accompany a GPX file.
#[derive(Debug, Clone, Default)]
pub struct Upload<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub file_name: &'a str,
    pub original_name: Option<&'a str>,
}

impl RouteMetadata {
    /// Build the sidecar for `route`. A non-empty upload description wins over the
    /// description found in the document.
    pub fn from_route(route: &RouteInfo, upload: &Upload<'_>, uploaded_at: DateTime<Utc>) -> Self {
        let description = upload
            .description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map_or_else(|| route.description.clone(), str::to_string);

        Self {
            title: upload.title.to_string(),
            description,
            file_name: upload.file_name.to_string(),
            original_name: upload.original_name.map(str::to_string),
            uploaded_at: uploaded_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            distance: route.distance_km,
            elevation: SidecarElevation {
                min: route.elevation.min,
                max: route.elevation.max,
                gain: route.elevation.gain,
            },
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    fn uploaded_instant(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.uploaded_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Sort sidecars newest upload first. Records with an unreadable date go last.
pub fn sort_newest_first(records: &mut [RouteMetadata]) {
    records.sort_by(|a, b| b.uploaded_instant().cmp(&a.uploaded_instant()));
}

/// Read a `.gpx` file fully and parse it, naming the route after the file stem
/// when the document has no name.
#[instrument(skip(opts, clock))]
pub fn load_route(
    path: &Path,
    opts: &ParseOptions,
    clock: &impl Clock,
) -> Result<RouteInfo, ParseError> {
    let content = std::fs::read_to_string(path)?;
    let fallback = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    debug!(bytes = content.len(), "read gpx file");
    parse_with(&content, &fallback, opts, clock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpx_types::ElevationStats;
    use chrono::TimeZone;

    fn route() -> RouteInfo {
        RouteInfo {
            name: "Coast Road".to_string(),
            description: "From the document".to_string(),
            source_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            points: Vec::new(),
            distance_km: 42.17,
            elevation: ElevationStats {
                min: 3.0,
                max: 118.0,
                gain: 560.0,
                loss: 555.0,
            },
            duration_secs: None,
            skipped_points: 0,
        }
    }

    fn upload(description: Option<&'static str>) -> Upload<'static> {
        Upload {
            title: "Coast Road",
            description,
            file_name: "1714550400000-coast.gpx",
            original_name: Some("coast.gpx"),
        }
    }

    #[test]
    fn test_description_precedence() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();

        let m = RouteMetadata::from_route(&route(), &upload(Some("Typed by admin")), at);
        assert_eq!(m.description, "Typed by admin");

        let m = RouteMetadata::from_route(&route(), &upload(Some("  ")), at);
        assert_eq!(m.description, "From the document");

        let m = RouteMetadata::from_route(&route(), &upload(None), at);
        assert_eq!(m.description, "From the document");
        assert_eq!(m.uploaded_at, "2024-05-01T08:00:00.000Z");
        assert_eq!(m.elevation.gain, 560.0);
    }

    #[test]
    fn test_json_field_names() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let m = RouteMetadata::from_route(&route(), &upload(None), at);
        let value: serde_json::Value = serde_json::from_str(&m.to_json_pretty().unwrap()).unwrap();
        assert_eq!(value["fileName"], "1714550400000-coast.gpx");
        assert_eq!(value["originalName"], "coast.gpx");
        assert_eq!(value["uploadedAt"], "2024-05-01T08:00:00.000Z");
        assert_eq!(value["distance"], 42.17);
        assert!(value["elevation"].get("loss").is_none());

        assert_eq!(RouteMetadata::from_json(&m.to_json_pretty().unwrap()).unwrap(), m);
    }

    #[test]
    fn test_sort_newest_first() {
        let mut records: Vec<RouteMetadata> = [
            "2024-01-01T00:00:00.000Z",
            "not a date",
            "2024-03-01T00:00:00.000Z",
            "2024-02-01T00:00:00.000Z",
        ]
        .iter()
        .map(|at| RouteMetadata {
            uploaded_at: at.to_string(),
            ..RouteMetadata::from_route(&route(), &upload(None), Utc::now())
        })
        .collect();

        sort_newest_first(&mut records);
        let order: Vec<&str> = records.iter().map(|r| r.uploaded_at.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "2024-03-01T00:00:00.000Z",
                "2024-02-01T00:00:00.000Z",
                "2024-01-01T00:00:00.000Z",
                "not a date",
            ]
        );
    }
}
