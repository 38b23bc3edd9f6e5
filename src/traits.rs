//! Seams between the routing pipeline and its collaborators.
//!
//! The engine is generic over where routes come from and how congestion is
//! judged, so tests can substitute deterministic stand-ins.

use chrono::NaiveDateTime;

use crate::congestion::CongestionLevel;
use crate::coordinate::Coordinate;
use crate::error::ProviderError;

/// A single routing request sent to a provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteRequest {
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub want_alternatives: bool,
}

/// One route as reported by a provider, geometry still encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRoute {
    pub geometry: String,
    /// Reported distance in meters, if any.
    pub distance_m: Option<f64>,
    /// Reported duration in seconds, if any.
    pub duration_secs: Option<f64>,
}

/// An external routing service.
///
/// Implementations may block on I/O; the engine runs them off the caller's
/// thread and enforces its own deadline.
pub trait RouteProvider: Send + Sync {
    fn routes_for(&self, request: &RouteRequest) -> Result<Vec<ProviderRoute>, ProviderError>;
}

/// Assigns a congestion level to a point on a route.
///
/// Must be a pure function of its arguments.
pub trait CongestionModel: Sync {
    fn estimate(
        &self,
        coord: Coordinate,
        at: NaiveDateTime,
        route_fraction: f64,
    ) -> CongestionLevel;
}

/// Multiplicative noise applied to the congestion load factor.
pub trait JitterSource: Sync {
    /// Returns a factor near 1.0, within `1.0 ± spread`.
    fn factor(&self, coord: Coordinate, at: NaiveDateTime, route_fraction: f64, spread: f64)
    -> f64;
}
