//! Great-circle distance on a spherical Earth.

use crate::gpx_types::GeoPoint;

/// Mean Earth radius in meters, used for every distance in the crate.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters between two points given in decimal degrees.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1 for near-antipodal points.
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Distance in meters between two track points. Elevation is ignored.
pub fn distance_between(a: &GeoPoint, b: &GeoPoint) -> f64 {
    haversine_distance(a.lat, a.lon, b.lat, b.lon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_points() {
        let p = GeoPoint::new(48.2082, 16.3738);
        assert_eq!(distance_between(&p, &p), 0.0);
    }

    #[test]
    fn test_one_degree_of_longitude_at_equator() {
        let d = haversine_distance(0.0, 0.0, 0.0, 1.0);
        let expected = EARTH_RADIUS_M * 1f64.to_radians();
        assert!((d - expected).abs() < 1e-6, "got {d}");
    }

    #[test]
    fn test_symmetry() {
        let pairs = [
            ((52.5200, 13.4050), (48.8566, 2.3522)),
            ((-33.8688, 151.2093), (40.7128, -74.0060)),
            ((0.0, 179.9), (0.0, -179.9)),
            ((89.9, 0.0), (-89.9, 180.0)),
        ];
        for ((lat1, lon1), (lat2, lon2)) in pairs {
            let a = GeoPoint::new(lat1, lon1);
            let b = GeoPoint::new(lat2, lon2);
            assert_eq!(distance_between(&a, &b), distance_between(&b, &a));
        }
    }

    #[test]
    fn test_berlin_paris() {
        // ~878 km
        let d = haversine_distance(52.5200, 13.4050, 48.8566, 2.3522);
        assert!((d - 878_000.0).abs() < 10_000.0, "got {d}");
    }

    #[test]
    fn test_antimeridian_is_short() {
        let d = haversine_distance(0.0, 179.9, 0.0, -179.9);
        assert!(d < 25_000.0, "got {d}");
    }

    #[test]
    fn test_antipodal_is_half_circumference() {
        let d = haversine_distance(0.0, 0.0, 0.0, 180.0);
        let half = std::f64::consts::PI * EARTH_RADIUS_M;
        assert!((d - half).abs() < 1e-3, "got {d}");
    }

    #[test]
    fn test_right_triangle_on_local_patch() {
        // Legs of ~1 km each near the equator: the hypotenuse follows Pythagoras
        // to well under the spherical approximation error.
        let origin = GeoPoint::new(0.0, 0.0);
        let east = GeoPoint::new(0.0, 0.009);
        let north = GeoPoint::new(0.009, 0.0);

        let leg_a = distance_between(&origin, &east);
        let leg_b = distance_between(&origin, &north);
        let hyp = distance_between(&east, &north);

        let flat = (leg_a.powi(2) + leg_b.powi(2)).sqrt();
        assert!((hyp - flat).abs() / flat < 1e-4, "hyp {hyp} vs flat {flat}");
        assert!((leg_a - 1000.75).abs() < 1.0, "got {leg_a}");
    }
}
