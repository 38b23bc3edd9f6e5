//! Great-circle distance and free-flow travel time.
//!
//! Used for segment lengths and for synthesizing a straight-line route when
//! the provider is unavailable. Less accurate than a road network (ignores
//! roads) but always available.

use crate::coordinate::Coordinate;

/// Nominal free-flow driving speed when the provider gives no duration.
pub const DEFAULT_SPEED_KMH: f64 = 50.0;

/// Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters.
pub fn haversine_m(from: Coordinate, to: Coordinate) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lng = (to.lng - from.lng).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_M * c
}

/// Sum of great-circle distances over consecutive coordinate pairs.
pub fn path_length_m(coords: &[Coordinate]) -> f64 {
    coords
        .windows(2)
        .map(|pair| haversine_m(pair[0], pair[1]))
        .sum()
}

/// Estimates travel time from distance at an assumed constant speed.
#[derive(Debug, Clone)]
pub struct FreeFlowEstimator {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
}

impl Default for FreeFlowEstimator {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl FreeFlowEstimator {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    /// Convert a distance in meters to travel time in seconds.
    pub fn meters_to_seconds(&self, meters: f64) -> f64 {
        if self.speed_kmh <= 0.0 {
            return 0.0;
        }
        meters / (self.speed_kmh / 3.6)
    }

    /// Straight-line travel time between two points.
    pub fn seconds_between(&self, from: Coordinate, to: Coordinate) -> f64 {
        self.meters_to_seconds(haversine_m(from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_same_point() {
        let p = Coordinate::new(36.1, -115.1);
        assert!(haversine_m(p, p) < 0.001, "Same point should have ~0 distance");
    }

    #[test]
    fn test_haversine_known_distance() {
        // Las Vegas (36.17, -115.14) to Los Angeles (34.05, -118.24)
        // Actual distance ~370 km
        let dist = haversine_m(Coordinate::new(36.17, -115.14), Coordinate::new(34.05, -118.24));
        assert!(dist > 350_000.0 && dist < 400_000.0, "LV to LA should be ~370km, got {}", dist);
    }

    #[test]
    fn test_haversine_symmetric() {
        let a = Coordinate::new(36.1, -115.1);
        let b = Coordinate::new(36.2, -115.2);
        assert!((haversine_m(a, b) - haversine_m(b, a)).abs() < 1e-9);
    }

    #[test]
    fn test_path_length_sums_legs() {
        let a = Coordinate::new(36.10, -115.17);
        let b = Coordinate::new(36.11, -115.17);
        let c = Coordinate::new(36.12, -115.17);
        let total = path_length_m(&[a, b, c]);
        assert!((total - (haversine_m(a, b) + haversine_m(b, c))).abs() < 1e-9);
        assert_eq!(path_length_m(&[a]), 0.0);
        assert_eq!(path_length_m(&[]), 0.0);
    }

    #[test]
    fn test_reasonable_travel_time() {
        let estimator = FreeFlowEstimator::new(50.0);
        // 10 km at 50 km/h = 0.2 hours = 720 seconds
        assert!((estimator.meters_to_seconds(10_000.0) - 720.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_speed_is_not_infinite() {
        assert_eq!(FreeFlowEstimator::new(0.0).meters_to_seconds(1000.0), 0.0);
    }
}
