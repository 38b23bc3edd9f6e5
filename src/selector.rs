//! Picking the fastest candidate once traffic is accounted for.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::acquisition::{Acquired, RouteCandidate};
use crate::congestion::CongestionLevel;
use crate::coordinate::Coordinate;
use crate::segmentation::{RouteSegment, SegmentationConfig, segment_or_whole, stitch};
use crate::traits::CongestionModel;

/// The route handed back to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteResult {
    pub coordinates: Vec<Coordinate>,
    pub segments: Vec<RouteSegment>,
    /// Sum of segment durations, in seconds.
    pub total_duration_secs: u64,
    /// Sum of segment lengths, in meters.
    pub total_distance_m: f64,
    /// Set when the route is a straight-line fallback.
    pub degraded: bool,
    pub candidates_considered: usize,
}

impl RouteResult {
    fn from_segments(coordinates: Vec<Coordinate>, segments: Vec<RouteSegment>) -> Self {
        let total_duration_secs = segments.iter().map(RouteSegment::duration_secs).sum();
        let total_distance_m = segments.iter().map(RouteSegment::length_m).sum();
        Self {
            coordinates,
            segments,
            total_duration_secs,
            total_distance_m,
            degraded: false,
            candidates_considered: 1,
        }
    }

    /// Geometry rebuilt from the segments; equals `coordinates`.
    pub fn stitched_coordinates(&self) -> Vec<Coordinate> {
        stitch(&self.segments)
    }

    /// Number of segments at each congestion level.
    pub fn congestion_summary(&self) -> BTreeMap<CongestionLevel, usize> {
        let mut summary = BTreeMap::new();
        for segment in &self.segments {
            *summary.entry(segment.level()).or_insert(0) += 1;
        }
        summary
    }

    /// Total duration rounded up to whole minutes, for ETA labels.
    pub fn eta_minutes(&self) -> u64 {
        self.total_duration_secs.div_ceil(60)
    }
}

/// Segments every candidate and returns the one with the lowest
/// traffic-adjusted duration.
///
/// Ties go to the shorter raw distance, then to the earlier candidate.
pub fn select_fastest<M: CongestionModel + ?Sized>(
    acquired: &Acquired,
    at: NaiveDateTime,
    model: &M,
    config: &SegmentationConfig,
) -> RouteResult {
    let candidates = acquired.candidates();

    let mut scored: Vec<(RouteResult, f64)> = candidates
        .par_iter()
        .map(|candidate| (score(candidate, at, model, config), candidate.raw_distance_m()))
        .collect();

    let mut best = 0;
    for index in 1..scored.len() {
        let (result, distance) = (&scored[index].0, scored[index].1);
        let (leader, leader_distance) = (&scored[best].0, scored[best].1);
        if result.total_duration_secs < leader.total_duration_secs
            || (result.total_duration_secs == leader.total_duration_secs && distance < leader_distance)
        {
            best = index;
        }
    }

    for (index, (result, distance)) in scored.iter().enumerate() {
        debug!(
            index,
            duration_secs = result.total_duration_secs,
            distance_m = distance,
            selected = index == best,
            "scored candidate"
        );
    }

    let (mut chosen, _) = scored.swap_remove(best);
    chosen.degraded = acquired.is_degraded();
    chosen.candidates_considered = candidates.len();
    chosen
}

fn score<M: CongestionModel + ?Sized>(
    candidate: &RouteCandidate,
    at: NaiveDateTime,
    model: &M,
    config: &SegmentationConfig,
) -> RouteResult {
    let segments = segment_or_whole(
        &candidate.coordinates,
        candidate.base_duration_secs,
        at,
        model,
        config,
    );
    RouteResult::from_segments(candidate.coordinates.clone(), segments)
}
