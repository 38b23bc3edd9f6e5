//! Error taxonomy for the routing engine.
//!
//! [`DecodeError`] and [`ProviderError`] are recovered inside the engine and
//! turned into a degraded fallback route. [`GeometryInvariantViolation`] is a
//! programming defect.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("polyline ends mid-value at byte {offset}")]
    Truncated { offset: usize },
    #[error("byte {byte:#04x} at offset {offset} is outside the polyline alphabet")]
    InvalidByte { offset: usize, byte: u8 },
    #[error("varint starting at byte {offset} does not fit in 64 bits")]
    Overflow { offset: usize },
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned status {0}")]
    Status(u16),
    #[error("malformed provider response: {0}")]
    MalformedBody(String),
    #[error("provider returned no routes")]
    EmptyRoutes,
    #[error("no route geometry could be decoded")]
    NoUsableGeometry,
    #[error("provider did not answer within {0:?}")]
    Timeout(Duration),
    #[error("request was cancelled")]
    Cancelled,
    #[error("provider worker exited without a response")]
    WorkerLost,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryInvariantViolation {
    #[error("cannot segment {0} coordinate(s); at least 2 are required")]
    TooFewCoordinates(usize),
    #[error("stitched segments do not reproduce the route geometry")]
    CoverageMismatch,
    #[error("segment lengths sum to {segments} m but the path is {path} m")]
    LengthMismatch { segments: f64, path: f64 },
    #[error("{count} segments is outside [{min}, {max}]")]
    SegmentCountOutOfRange { count: usize, min: usize, max: usize },
    #[error("segment {index} has {points} coordinate(s)")]
    ShortSegment { index: usize, points: usize },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
