//! Test fixtures for traffic-route.
//!
//! Provides:
//! - Real Las Vegas landmarks (from OpenStreetMap)
//! - Stub route providers and congestion models
//! - A local axum server standing in for the routing provider

#![allow(dead_code)]

pub mod las_vegas;
pub mod stubs;

pub use las_vegas::*;
pub use stubs::*;
