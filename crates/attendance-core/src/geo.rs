//! Great-circle distance and the proximity threshold.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Callers farther than this from [`REFERENCE_POINT`] are turned away
pub const MAX_DISTANCE_KM: f64 = 1.0;

/// Campus coordinate in São Luís that callers must be near
pub const REFERENCE_POINT: Coordinate = Coordinate::new(-2.5897, -44.2103);

/// A WGS84 point in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90..=90)
    pub latitude: f64,
    /// Longitude in degrees (-180..=180)
    pub longitude: f64,
}

impl Coordinate {
    #[inline]
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Haversine distance between two coordinates, in kilometers.
///
/// Never fails: identical points yield 0 and antipodal points about 20015 km.
#[must_use]
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1.0 for antipodes
    let c = 2.0 * h.sqrt().clamp(0.0, 1.0).asin();

    EARTH_RADIUS_KM * c
}

/// Whether a distance is inside the allowed radius (inclusive)
#[inline]
#[must_use]
pub fn within_range(distance_km: f64) -> bool {
    distance_km <= MAX_DISTANCE_KM
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_points_are_zero() {
        let p = Coordinate::new(47.644_548, -122.326_897);
        assert_eq!(distance_km(p, p), 0.0);
    }

    #[test]
    fn test_reference_point_is_in_range() {
        let d = distance_km(REFERENCE_POINT, REFERENCE_POINT);
        assert_eq!(d, 0.0);
        assert!(within_range(d));
    }

    #[test]
    fn test_distance_is_symmetric() {
        let pairs = [
            (REFERENCE_POINT, Coordinate::new(-23.5505, -46.6333)),
            (Coordinate::new(51.5074, -0.1278), Coordinate::new(40.7128, -74.0060)),
            (Coordinate::new(-33.8688, 151.2093), Coordinate::new(35.6762, 139.6503)),
            (Coordinate::new(89.9, 0.0), Coordinate::new(-89.9, 179.9)),
        ];
        for (a, b) in pairs {
            assert!((distance_km(a, b) - distance_km(b, a)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_antipodal_points_do_not_overflow() {
        let d = distance_km(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 180.0));
        assert!(d.is_finite());
        assert!((d - 20_015.086).abs() < 0.01, "got {d}");
    }

    #[test]
    fn test_known_city_distance() {
        // London to Paris is roughly 343.5 km great-circle
        let london = Coordinate::new(51.5074, -0.1278);
        let paris = Coordinate::new(48.8566, 2.3522);
        let d = distance_km(london, paris);
        assert!((d - 343.5).abs() < 1.0, "got {d}");
    }

    #[test]
    fn test_threshold_is_inclusive() {
        assert!(within_range(MAX_DISTANCE_KM));
        assert!(within_range(0.42));
        assert!(!within_range(1.000_001));
        assert!(!within_range(5.0));
    }

    #[test]
    fn test_point_one_degree_north_of_equator() {
        let d = distance_km(Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 0.0));
        let expected = EARTH_RADIUS_KM * 1f64.to_radians();
        assert!((d - expected).abs() < 1e-6);
    }
}
