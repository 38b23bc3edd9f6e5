//! Route acquisition from a provider, with straight-line fallback.
//!
//! Provider failures never reach the caller. A failed request, an empty
//! answer, or an answer whose geometries all fail to decode turns into a
//! single synthesized two-point candidate and a degraded result.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{Span, debug, warn};

use crate::cancel::CancelToken;
use crate::coordinate::Coordinate;
use crate::error::ProviderError;
use crate::haversine::{FreeFlowEstimator, haversine_m, path_length_m};
use crate::polyline;
use crate::traits::{ProviderRoute, RouteProvider, RouteRequest};

/// How often a waiting caller re-checks its cancel token.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// A decoded route geometry awaiting segmentation.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteCandidate {
    pub coordinates: Vec<Coordinate>,
    /// Travel time before congestion, in seconds.
    pub base_duration_secs: f64,
    /// Distance reported by the provider, if any.
    pub reported_distance_m: Option<f64>,
    /// True when `base_duration_secs` was estimated at free-flow speed.
    pub duration_estimated: bool,
}

impl RouteCandidate {
    /// Great-circle length of the geometry.
    pub fn path_length_m(&self) -> f64 {
        path_length_m(&self.coordinates)
    }

    /// Distance used to break duration ties: the provider's figure when it
    /// reported one, otherwise the geometry length.
    pub fn raw_distance_m(&self) -> f64 {
        self.reported_distance_m
            .unwrap_or_else(|| self.path_length_m())
    }
}

/// The candidates for one request. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Acquired {
    candidates: Vec<RouteCandidate>,
    degraded: bool,
}

impl Acquired {
    /// Returns `None` when there are no candidates.
    pub fn provided(candidates: Vec<RouteCandidate>) -> Option<Self> {
        (!candidates.is_empty()).then_some(Self {
            candidates,
            degraded: false,
        })
    }

    pub fn fallback(candidate: RouteCandidate) -> Self {
        Self {
            candidates: vec![candidate],
            degraded: true,
        }
    }

    pub fn candidates(&self) -> &[RouteCandidate] {
        &self.candidates
    }

    /// True when the only candidate is the synthesized fallback.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}

/// Straight-line candidate between the two endpoints.
pub fn fallback_candidate(
    origin: Coordinate,
    destination: Coordinate,
    estimator: &FreeFlowEstimator,
) -> RouteCandidate {
    let distance = haversine_m(origin, destination);
    RouteCandidate {
        coordinates: vec![origin, destination],
        base_duration_secs: estimator.meters_to_seconds(distance),
        reported_distance_m: None,
        duration_estimated: true,
    }
}

/// Decodes provider routes, dropping any with malformed geometry.
pub fn candidates_from(
    routes: Vec<ProviderRoute>,
    estimator: &FreeFlowEstimator,
) -> Result<Vec<RouteCandidate>, ProviderError> {
    let total = routes.len();
    let mut candidates = Vec::with_capacity(total);

    for (index, route) in routes.into_iter().enumerate() {
        let coordinates = match polyline::decode(&route.geometry) {
            Ok(coordinates) => coordinates,
            Err(err) => {
                warn!(index, error = %err, "dropping route with undecodable geometry");
                continue;
            }
        };
        if coordinates.len() < 2 {
            warn!(index, points = coordinates.len(), "dropping route with degenerate geometry");
            continue;
        }

        let (base_duration_secs, duration_estimated) = match route.duration_secs {
            Some(secs) if secs.is_finite() && secs >= 0.0 => (secs, false),
            _ => (estimator.meters_to_seconds(path_length_m(&coordinates)), true),
        };
        candidates.push(RouteCandidate {
            coordinates,
            base_duration_secs,
            reported_distance_m: route.distance_m,
            duration_estimated,
        });
    }

    if candidates.is_empty() {
        return Err(ProviderError::NoUsableGeometry);
    }
    debug!(usable = candidates.len(), total, "decoded provider routes");
    Ok(candidates)
}

/// Turns a provider outcome into candidates, falling back on any error.
pub fn resolve(
    outcome: Result<Vec<ProviderRoute>, ProviderError>,
    request: &RouteRequest,
    estimator: &FreeFlowEstimator,
) -> Acquired {
    let acquired = outcome
        .and_then(|routes| candidates_from(routes, estimator))
        .and_then(|candidates| Acquired::provided(candidates).ok_or(ProviderError::NoUsableGeometry));
    match acquired {
        Ok(acquired) => acquired,
        Err(err) => {
            warn!(
                error = %err,
                origin = %request.origin,
                destination = %request.destination,
                "provider failed, using straight-line fallback"
            );
            Acquired::fallback(fallback_candidate(request.origin, request.destination, estimator))
        }
    }
}

/// Queries `provider` on the calling thread and resolves the outcome.
pub fn acquire<P: RouteProvider + ?Sized>(
    provider: &P,
    origin: Coordinate,
    destination: Coordinate,
    want_alternatives: bool,
    estimator: &FreeFlowEstimator,
) -> Acquired {
    let request = RouteRequest {
        origin,
        destination,
        want_alternatives,
    };
    resolve(provider.routes_for(&request), &request, estimator)
}

/// Like [`acquire`], but bounded by `deadline` and abandonable via `token`.
///
/// Returns `None` only when the token was cancelled. A deadline overrun is a
/// provider failure and falls back.
pub fn acquire_cancellable<P: RouteProvider + 'static>(
    provider: &Arc<P>,
    request: RouteRequest,
    estimator: &FreeFlowEstimator,
    deadline: Duration,
    token: &CancelToken,
) -> Option<Acquired> {
    match fetch_with_deadline(provider, request, deadline, token) {
        Err(ProviderError::Cancelled) => {
            debug!(origin = %request.origin, destination = %request.destination, "route request cancelled");
            None
        }
        outcome => Some(resolve(outcome, &request, estimator)),
    }
}

/// Runs the provider call on a worker thread and waits for it.
///
/// An abandoned worker finishes on its own; its result is discarded.
pub fn fetch_with_deadline<P: RouteProvider + 'static>(
    provider: &Arc<P>,
    request: RouteRequest,
    deadline: Duration,
    token: &CancelToken,
) -> Result<Vec<ProviderRoute>, ProviderError> {
    if token.is_cancelled() {
        return Err(ProviderError::Cancelled);
    }

    let (tx, rx) = mpsc::channel();
    let worker_provider = Arc::clone(provider);
    let span = Span::current();
    thread::Builder::new()
        .name("route-provider".to_string())
        .spawn(move || {
            let _entered = span.enter();
            // The receiver may be gone if the caller gave up.
            let _ = tx.send(worker_provider.routes_for(&request));
        })
        .map_err(|_| ProviderError::WorkerLost)?;

    let expires = Instant::now() + deadline;
    loop {
        if token.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }
        let remaining = expires.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ProviderError::Timeout(deadline));
        }
        match rx.recv_timeout(remaining.min(POLL_INTERVAL)) {
            Ok(outcome) => return outcome,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return Err(ProviderError::WorkerLost),
        }
    }
}
