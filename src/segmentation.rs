//! Partitioning a route geometry into congestion-annotated segments.
//!
//! A route of `n` points is cut into `clamp(n / 12, 4, 10)` contiguous
//! chunks. Consecutive chunks share their boundary point, so stitching the
//! chunks (dropping each later chunk's first point) reproduces the geometry
//! exactly. Each chunk gets a congestion level from its first point and an
//! even share of the base duration scaled by that level's speed multiplier.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::congestion::{CongestionLevel, SpeedMultipliers};
use crate::coordinate::Coordinate;
use crate::error::{ConfigError, GeometryInvariantViolation};
use crate::haversine::path_length_m;
use crate::traits::CongestionModel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Geometry points per segment before clamping.
    pub points_per_segment: usize,
    pub min_segments: usize,
    pub max_segments: usize,
    pub speed_multipliers: SpeedMultipliers,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            points_per_segment: 12,
            min_segments: 4,
            max_segments: 10,
            speed_multipliers: SpeedMultipliers::default(),
        }
    }
}

impl SegmentationConfig {
    /// Rejects bounds that cannot produce a segment count.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_segments == 0 {
            return Err(ConfigError::Invalid("segmentation.min_segments must be at least 1".to_string()));
        }
        if self.min_segments > self.max_segments {
            return Err(ConfigError::Invalid(format!(
                "segmentation.min_segments ({}) exceeds max_segments ({})",
                self.min_segments, self.max_segments
            )));
        }
        Ok(())
    }

    /// Segment count bounds, normalized to `1 <= min <= max`.
    pub fn bounds(&self) -> (usize, usize) {
        let min = self.min_segments.max(1);
        (min, self.max_segments.max(min))
    }
}

/// A contiguous run of route geometry with one congestion level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSegment {
    coordinates: Vec<Coordinate>,
    level: CongestionLevel,
    duration_secs: u64,
    length_m: f64,
    /// Padding chunk that repeats the final point; contributes no geometry.
    #[serde(skip)]
    padding: bool,
}

impl RouteSegment {
    fn new(coordinates: Vec<Coordinate>, level: CongestionLevel, duration_secs: u64) -> Self {
        let length_m = path_length_m(&coordinates);
        Self {
            coordinates,
            level,
            duration_secs,
            length_m,
            padding: false,
        }
    }

    fn padding(at: Coordinate, level: CongestionLevel, duration_secs: u64) -> Self {
        Self {
            coordinates: vec![at; 2],
            level,
            duration_secs,
            length_m: 0.0,
            padding: true,
        }
    }

    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }

    pub fn level(&self) -> CongestionLevel {
        self.level
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    pub fn length_m(&self) -> f64 {
        self.length_m
    }

    pub fn first(&self) -> Coordinate {
        self.coordinates[0]
    }

    pub fn last(&self) -> Coordinate {
        self.coordinates[self.coordinates.len() - 1]
    }
}

/// Number of segments for a geometry of `points` coordinates.
pub fn segment_count(points: usize, config: &SegmentationConfig) -> usize {
    let per = config.points_per_segment.max(1);
    let (min, max) = config.bounds();
    (points / per).clamp(min, max)
}

/// Splits `coords` into segments and checks the result.
///
/// `base_duration_secs` is the provider's (or estimated) travel time for the
/// whole route; each segment receives an equal share of it, inflated or
/// deflated by its congestion level.
pub fn segment<M: CongestionModel + ?Sized>(
    coords: &[Coordinate],
    base_duration_secs: f64,
    at: NaiveDateTime,
    model: &M,
    config: &SegmentationConfig,
) -> Result<Vec<RouteSegment>, GeometryInvariantViolation> {
    if coords.len() < 2 {
        return Err(GeometryInvariantViolation::TooFewCoordinates(coords.len()));
    }

    let count = segment_count(coords.len(), config);
    let last = coords.len() - 1;
    let share = base_duration_secs.max(0.0) / count as f64;

    let mut segments = Vec::with_capacity(count);
    let mut start = 0;
    for index in 0..count {
        let end = if index + 1 == count {
            last
        } else {
            ((index + 1) * last / count).max(start + 1).min(last)
        };

        let level = model.estimate(coords[start], at, index as f64 / count as f64);
        let duration = (share * config.speed_multipliers.for_level(level)).round() as u64;

        // Out of points: a zero-length chunk parked on the final coordinate.
        if start == end {
            segments.push(RouteSegment::padding(coords[start], level, duration));
        } else {
            segments.push(RouteSegment::new(coords[start..=end].to_vec(), level, duration));
        }

        start = end;
    }

    verify(coords, &segments, config)?;
    Ok(segments)
}

/// Like [`segment`], but never fails.
///
/// An invariant violation is a bug: it panics in debug builds. Release builds
/// log it and return the whole route as one segment.
pub fn segment_or_whole<M: CongestionModel + ?Sized>(
    coords: &[Coordinate],
    base_duration_secs: f64,
    at: NaiveDateTime,
    model: &M,
    config: &SegmentationConfig,
) -> Vec<RouteSegment> {
    match segment(coords, base_duration_secs, at, model, config) {
        Ok(segments) => segments,
        Err(violation) => {
            if cfg!(debug_assertions) {
                panic!("segmentation invariant violated: {violation}");
            }
            recover_whole(coords, base_duration_secs, at, model, config, &violation)
        }
    }
}

/// Release-build recovery: the whole route as a single segment.
fn recover_whole<M: CongestionModel + ?Sized>(
    coords: &[Coordinate],
    base_duration_secs: f64,
    at: NaiveDateTime,
    model: &M,
    config: &SegmentationConfig,
    violation: &GeometryInvariantViolation,
) -> Vec<RouteSegment> {
    error!(%violation, points = coords.len(), "segmentation failed, using a single segment");
    whole_route(coords, base_duration_secs, at, model, config)
        .into_iter()
        .collect()
}

fn whole_route<M: CongestionModel + ?Sized>(
    coords: &[Coordinate],
    base_duration_secs: f64,
    at: NaiveDateTime,
    model: &M,
    config: &SegmentationConfig,
) -> Option<RouteSegment> {
    let chunk = match coords {
        [] => return None,
        [only] => vec![*only; 2],
        _ => coords.to_vec(),
    };
    let level = model.estimate(chunk[0], at, 0.0);
    let duration =
        (base_duration_secs.max(0.0) * config.speed_multipliers.for_level(level)).round() as u64;
    Some(RouteSegment::new(chunk, level, duration))
}

/// Rebuilds the full geometry from segments that share boundary points.
pub fn stitch(segments: &[RouteSegment]) -> Vec<Coordinate> {
    let mut coords = Vec::new();
    for (index, segment) in segments.iter().enumerate() {
        if index == 0 {
            coords.extend_from_slice(&segment.coordinates);
        } else if !segment.padding {
            coords.extend_from_slice(&segment.coordinates[1..]);
        }
    }
    coords
}

fn verify(
    coords: &[Coordinate],
    segments: &[RouteSegment],
    config: &SegmentationConfig,
) -> Result<(), GeometryInvariantViolation> {
    let count = segments.len();
    let (min, max) = config.bounds();
    if count < min || count > max {
        return Err(GeometryInvariantViolation::SegmentCountOutOfRange { count, min, max });
    }
    if let Some((index, short)) = segments
        .iter()
        .enumerate()
        .find(|(_, segment)| segment.coordinates.len() < 2)
    {
        return Err(GeometryInvariantViolation::ShortSegment {
            index,
            points: short.coordinates.len(),
        });
    }
    if segments.windows(2).any(|pair| pair[0].last() != pair[1].first()) || stitch(segments) != coords {
        return Err(GeometryInvariantViolation::CoverageMismatch);
    }

    let path = path_length_m(coords);
    let summed: f64 = segments.iter().map(RouteSegment::length_m).sum();
    if (summed - path).abs() > 1e-6 * path.max(1.0) {
        return Err(GeometryInvariantViolation::LengthMismatch {
            segments: summed,
            path,
        });
    }
    Ok(())
}
