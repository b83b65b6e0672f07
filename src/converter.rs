use geojson::{Feature, Geometry, Value};
use serde_json::{Map, Value as JsonValue};

use crate::gpx_types::{GeoPoint, RouteInfo};
use crate::options::ParseOptions;

/// What a map renderer needs to draw a route: its title and ordered points.
#[derive(Debug, Clone, Copy)]
pub struct RenderableRoute<'r> {
    pub name: &'r str,
    pub points: &'r [GeoPoint],
    pub distance_km: f64,
    pub elevation_gain: f64,
}

impl<'r> From<&'r RouteInfo> for RenderableRoute<'r> {
    fn from(route: &'r RouteInfo) -> Self {
        Self {
            name: &route.name,
            points: &route.points,
            distance_km: route.distance_km,
            elevation_gain: route.elevation.gain,
        }
    }
}

/// Convert a route to a single GeoJSON Feature.
///
/// Two or more points become a LineString, a single point a Point, and an empty
/// route a Feature without geometry.
pub fn to_feature(route: RenderableRoute<'_>, opts: &ParseOptions) -> Feature {
    let geometry = match route.points {
        [] => None,
        [pt] => Some(Geometry::new(Value::Point(point_coords(
            pt,
            opts.include_elevation,
        )))),
        points => {
            let coords: Vec<Vec<f64>> = points
                .iter()
                .map(|pt| point_coords(pt, opts.include_elevation))
                .collect();
            Some(Geometry::new(Value::LineString(coords)))
        }
    };

    let mut props = Map::new();
    props.insert("name".to_string(), JsonValue::String(route.name.to_string()));
    insert_number(&mut props, "distanceKm", route.distance_km);
    insert_number(&mut props, "elevationGain", route.elevation_gain);

    if opts.include_time {
        insert_coordinate_times(&mut props, route.points);
    }

    Feature {
        bbox: None,
        geometry,
        id: None,
        properties: Some(props),
        foreign_members: None,
    }
}

/// Build [lon, lat] or [lon, lat, ele] coordinate array.
fn point_coords(pt: &GeoPoint, include_elevation: bool) -> Vec<f64> {
    match (include_elevation, pt.elevation) {
        (true, Some(ele)) => vec![pt.lon, pt.lat, ele],
        _ => vec![pt.lon, pt.lat],
    }
}

fn insert_number(props: &mut Map<String, JsonValue>, key: &str, value: f64) {
    if let Some(n) = serde_json::Number::from_f64(value) {
        props.insert(key.to_string(), JsonValue::Number(n));
    }
}

fn insert_coordinate_times(props: &mut Map<String, JsonValue>, points: &[GeoPoint]) {
    let times: Vec<JsonValue> = points
        .iter()
        .map(|pt| match &pt.timestamp {
            Some(t) => JsonValue::String(t.to_rfc3339()),
            None => JsonValue::Null,
        })
        .collect();

    // Only include if at least one time is present
    if times.iter().any(|t| !t.is_null()) {
        let mut coord_props = Map::new();
        coord_props.insert("times".to_string(), JsonValue::Array(times));
        props.insert(
            "coordinateProperties".to_string(),
            JsonValue::Object(coord_props),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{FixedClock, parse_with};
    use chrono::{TimeZone, Utc};

    fn route(xml: &str) -> RouteInfo {
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        parse_with(xml, "fallback", &ParseOptions::default(), &clock).unwrap()
    }

    #[test]
    fn test_line_string_with_elevation() {
        let route = route(
            r#"<gpx><trk><name>Run</name><trkseg>
  <trkpt lat="35.0" lon="139.0"><ele>10</ele></trkpt>
  <trkpt lat="35.001" lon="139.001"/>
</trkseg></trk></gpx>"#,
        );
        let f = to_feature(RenderableRoute::from(&route), &ParseOptions::default());

        match &f.geometry.as_ref().unwrap().value {
            Value::LineString(coords) => {
                assert_eq!(coords.len(), 2);
                assert_eq!(coords[0], vec![139.0, 35.0, 10.0]);
                assert_eq!(coords[1], vec![139.001, 35.001]);
            }
            _ => panic!("Expected LineString geometry"),
        }

        let props = f.properties.as_ref().unwrap();
        assert_eq!(props["name"], "Run");
        assert!(props.get("coordinateProperties").is_none());
    }

    #[test]
    fn test_times_and_no_elevation() {
        let route = route(
            r#"<gpx><trk><trkseg>
  <trkpt lat="35.0" lon="139.0"><ele>10</ele><time>2025-01-01T00:00:00Z</time></trkpt>
  <trkpt lat="35.001" lon="139.001"/>
</trkseg></trk></gpx>"#,
        );
        let opts = ParseOptions {
            include_elevation: false,
            ..Default::default()
        };
        let f = to_feature(RenderableRoute::from(&route), &opts);

        if let Value::LineString(coords) = &f.geometry.as_ref().unwrap().value {
            assert_eq!(coords[0].len(), 2);
        }

        let props = f.properties.as_ref().unwrap();
        let times = props["coordinateProperties"]["times"].as_array().unwrap();
        assert_eq!(times[0], "2025-01-01T00:00:00+00:00");
        assert!(times[1].is_null());
    }

    #[test]
    fn test_single_and_empty() {
        let single = route(r#"<gpx><trk><trkseg><trkpt lat="1" lon="2"/></trkseg></trk></gpx>"#);
        let f = to_feature(RenderableRoute::from(&single), &ParseOptions::default());
        assert!(matches!(f.geometry.as_ref().unwrap().value, Value::Point(_)));

        let empty = route(r#"<gpx><trk/></gpx>"#);
        let f = to_feature(RenderableRoute::from(&empty), &ParseOptions::default());
        assert!(f.geometry.is_none());
        assert_eq!(f.properties.as_ref().unwrap()["name"], "fallback");
    }
}
