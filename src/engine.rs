//! The routing engine: acquisition, segmentation and selection behind one
//! call.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use rayon::prelude::*;
use tracing::info;

use crate::acquisition::{Acquired, acquire_cancellable, fallback_candidate};
use crate::cache::RouteCache;
use crate::cancel::CancelToken;
use crate::congestion::{CongestionEstimator, SeededJitter};
use crate::config::EngineConfig;
use crate::coordinate::Coordinate;
use crate::error::ProviderError;
use crate::haversine::FreeFlowEstimator;
use crate::ors::OrsClient;
use crate::segmentation::SegmentationConfig;
use crate::selector::{RouteResult, select_fastest};
use crate::traits::{CongestionModel, RouteProvider, RouteRequest};

pub struct RouteEngine<P, M = CongestionEstimator<SeededJitter>> {
    provider: Arc<P>,
    model: M,
    segmentation: SegmentationConfig,
    estimator: FreeFlowEstimator,
    deadline: Duration,
    cache: Option<RouteCache>,
}

impl RouteEngine<OrsClient> {
    /// Engine backed by the HTTP provider and the configured congestion model.
    pub fn from_config(config: &EngineConfig) -> Result<Self, ProviderError> {
        let provider = OrsClient::new(config.provider.clone())?;
        let jitter = config
            .jitter_seed
            .map(SeededJitter::new)
            .unwrap_or_else(SeededJitter::from_entropy);
        let model = CongestionEstimator::new(config.congestion.clone(), jitter);
        Ok(Self::new(provider, model, config))
    }
}

impl<P, M> RouteEngine<P, M>
where
    P: RouteProvider + 'static,
    M: CongestionModel,
{
    pub fn new(provider: P, model: M, config: &EngineConfig) -> Self {
        Self {
            provider: Arc::new(provider),
            model,
            segmentation: config.segmentation.clone(),
            estimator: FreeFlowEstimator::new(config.free_flow_speed_kmh),
            deadline: config.provider_deadline(),
            cache: config
                .cache
                .enabled
                .then(|| RouteCache::new(config.cache.clone())),
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Routes from `origin` to `destination` departing now.
    pub fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        want_alternatives: bool,
    ) -> RouteResult {
        self.route_at(origin, destination, want_alternatives, Local::now().naive_local())
    }

    /// Routes departing at `at` (local wall-clock time).
    pub fn route_at(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        want_alternatives: bool,
        at: NaiveDateTime,
    ) -> RouteResult {
        let token = CancelToken::new();
        match self.route_cancellable_at(origin, destination, want_alternatives, at, &token) {
            Some(result) => result,
            // An uncancelled token never yields `None`; stay total regardless.
            None => self.fallback(origin, destination, at),
        }
    }

    /// Routes departing now; `None` if `token` is cancelled first.
    pub fn route_cancellable(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        want_alternatives: bool,
        token: &CancelToken,
    ) -> Option<RouteResult> {
        let at = Local::now().naive_local();
        self.route_cancellable_at(origin, destination, want_alternatives, at, token)
    }

    pub fn route_cancellable_at(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        want_alternatives: bool,
        at: NaiveDateTime,
        token: &CancelToken,
    ) -> Option<RouteResult> {
        let request = RouteRequest {
            origin,
            destination,
            want_alternatives,
        };
        let compute = || self.compute(request, at, token);

        match &self.cache {
            Some(cache) => {
                let key = cache.key(origin, destination, want_alternatives, at);
                cache.get_or_compute(key, token, compute)
            }
            None => compute(),
        }
    }

    /// Routes many independent pairs in parallel, all departing at `at`.
    pub fn route_batch_at(
        &self,
        pairs: &[(Coordinate, Coordinate)],
        want_alternatives: bool,
        at: NaiveDateTime,
    ) -> Vec<RouteResult> {
        pairs
            .par_iter()
            .map(|&(origin, destination)| self.route_at(origin, destination, want_alternatives, at))
            .collect()
    }

    pub fn route_batch(
        &self,
        pairs: &[(Coordinate, Coordinate)],
        want_alternatives: bool,
    ) -> Vec<RouteResult> {
        self.route_batch_at(pairs, want_alternatives, Local::now().naive_local())
    }

    fn compute(&self, request: RouteRequest, at: NaiveDateTime, token: &CancelToken) -> Option<RouteResult> {
        let acquired = acquire_cancellable(&self.provider, request, &self.estimator, self.deadline, token)?;
        let result = select_fastest(&acquired, at, &self.model, &self.segmentation);
        if token.is_cancelled() {
            return None;
        }

        info!(
            origin = %request.origin,
            destination = %request.destination,
            duration_secs = result.total_duration_secs,
            distance_m = result.total_distance_m,
            segments = result.segments.len(),
            candidates = result.candidates_considered,
            degraded = result.degraded,
            "route selected"
        );
        Some(result)
    }

    fn fallback(&self, origin: Coordinate, destination: Coordinate, at: NaiveDateTime) -> RouteResult {
        let acquired = Acquired::fallback(fallback_candidate(origin, destination, &self.estimator));
        select_fastest(&acquired, at, &self.model, &self.segmentation)
    }
}
