//! Great-circle distance between geodetic points.

use geo::Point;

/// Sphere radius used for every distance in the tracker, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters between two lat/lon pairs given in degrees.
///
/// NaN inputs propagate to the result.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Same as [`haversine_distance`] for geo points (x = lon, y = lat).
pub fn point_distance(a: Point, b: Point) -> f64 {
    haversine_distance(a.y(), a.x(), b.y(), b.x())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_for_identical_points() {
        for (lat, lon) in [(0.0, 0.0), (39.9, 116.4), (-33.86, 151.2), (89.9, -179.9)] {
            assert_eq!(haversine_distance(lat, lon, lat, lon), 0.0);
        }
    }

    #[test]
    fn test_symmetric() {
        let d1 = haversine_distance(39.9042, 116.4074, 31.2304, 121.4737);
        let d2 = haversine_distance(31.2304, 121.4737, 39.9042, 116.4074);
        assert_eq!(d1, d2);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let dist = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111_195.0).abs() < 1.0);
    }

    #[test]
    fn test_monotonic_with_separation() {
        let mut last = 0.0;
        for step in 1..50 {
            let d = haversine_distance(40.0, -105.0, 40.0 + step as f64 * 0.0001, -105.0);
            assert!(d > last);
            last = d;
        }
    }

    #[test]
    fn test_nan_propagates() {
        assert!(haversine_distance(f64::NAN, 0.0, 1.0, 1.0).is_nan());
    }

    #[test]
    fn test_point_distance_matches() {
        let a = Point::new(116.4, 39.9);
        let b = Point::new(116.401, 39.901);
        assert_eq!(
            point_distance(a, b),
            haversine_distance(39.9, 116.4, 39.901, 116.401)
        );
    }
}
