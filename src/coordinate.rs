//! Geographic coordinate value type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True when both axes are within `epsilon` degrees of `other`.
    pub fn approx_eq(&self, other: &Coordinate, epsilon: f64) -> bool {
        (self.lat - other.lat).abs() <= epsilon && (self.lng - other.lng).abs() <= epsilon
    }

    /// Rounds both axes to `decimals` places, for use as a cache key.
    pub fn rounded(&self, decimals: u32) -> (i64, i64) {
        let scale = 10f64.powi(decimals as i32);
        (
            (self.lat * scale).round() as i64,
            (self.lng * scale).round() as i64,
        )
    }

    /// Provider wire order is `[lon, lat]`.
    pub fn to_lon_lat(&self) -> [f64; 2] {
        [self.lng, self.lat]
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

impl From<Coordinate> for (f64, f64) {
    fn from(coord: Coordinate) -> Self {
        (coord.lat, coord.lng)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lng)
    }
}

/// Parses `"lat,lng"`.
impl FromStr for Coordinate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| format!("expected LAT,LNG, got {s:?}"))?;
        let lat: f64 = lat.trim().parse().map_err(|e| format!("bad latitude: {e}"))?;
        let lng: f64 = lng.trim().parse().map_err(|e| format!("bad longitude: {e}"))?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(format!("coordinate out of range: {lat},{lng}"));
        }
        Ok(Self { lat, lng })
    }
}
