//! GPX track parsing and route statistics: distance, elevation gain/loss, bounds and duration.
//!
//! The core is [`parse`] / [`parse_with`], a pure in-memory computation. File loading,
//! sidecar records and GeoJSON rendering sit around it for the hosting site.

pub mod converter;
pub mod error;
pub mod geodesic;
pub mod gpx_types;
pub mod metadata;
pub mod options;
pub mod parser;
pub mod route;
pub mod stats;

use wasm_bindgen::prelude::*;

pub use crate::converter::{RenderableRoute, to_feature};
pub use crate::error::{ParseError, PointDefect};
pub use crate::geodesic::{EARTH_RADIUS_M, distance_between, haversine_distance};
pub use crate::gpx_types::{ElevationStats, GeoPoint, RouteInfo};
pub use crate::metadata::{RouteMetadata, Upload, load_route, sort_newest_first};
pub use crate::options::ParseOptions;
pub use crate::route::{Clock, FixedClock, SystemClock, parse, parse_with};

/// Parse a GPX string into route statistics, returned as a JS object.
#[wasm_bindgen(js_name = parseGpxRoute)]
pub fn parse_gpx_route(
    gpx_string: &str,
    fallback_name: &str,
    options: JsValue,
) -> Result<JsValue, JsValue> {
    init_runtime();

    let opts = parse_options(options)?;
    let route = parse_with(gpx_string, fallback_name, &opts, &HostClock)?;
    serde_wasm_bindgen::to_value(&route).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Parse a GPX string and render it as a GeoJSON Feature string for the map.
#[wasm_bindgen(js_name = gpxRouteToGeoJson)]
pub fn gpx_route_to_geojson(
    gpx_string: &str,
    fallback_name: &str,
    options: JsValue,
) -> Result<String, JsValue> {
    init_runtime();

    let opts = parse_options(options)?;
    let route = parse_with(gpx_string, fallback_name, &opts, &HostClock)?;
    let feature = to_feature(RenderableRoute::from(&route), &opts);
    serde_json::to_string(&feature).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn parse_options(options: JsValue) -> Result<ParseOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(ParseOptions::default())
    } else {
        serde_wasm_bindgen::from_value(options).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

fn init_runtime() {
    console_error_panic_hook::set_once();

    #[cfg(target_arch = "wasm32")]
    {
        static LOGGING: std::sync::Once = std::sync::Once::new();
        LOGGING.call_once(tracing_wasm::set_as_global_default);
    }
}

/// The JS host's clock (`Date.now()`).
struct HostClock;

impl Clock for HostClock {
    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        #[cfg(target_arch = "wasm32")]
        {
            let millis = js_sys::Date::now() as i64;
            if let Some(now) = chrono::DateTime::from_timestamp_millis(millis) {
                return now;
            }
        }
        chrono::Utc::now()
    }
}
