//! traffic-route core
//!
//! Turns an origin/destination pair into a traffic-annotated route: provider
//! acquisition with straight-line fallback, polyline decoding, congestion
//! estimation, bounded segmentation and fastest-candidate selection.

pub mod acquisition;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod congestion;
pub mod coordinate;
pub mod engine;
pub mod error;
pub mod haversine;
pub mod ors;
pub mod polyline;
pub mod segmentation;
pub mod selector;
pub mod traits;

pub use cancel::{CancelToken, RequestSlot};
pub use config::EngineConfig;
pub use congestion::CongestionLevel;
pub use coordinate::Coordinate;
pub use engine::RouteEngine;
pub use selector::RouteResult;
