//! Heuristic traffic congestion model.
//!
//! A load factor starts at a base value and is scaled by time-of-day,
//! day-of-week and geographic modifiers, then by a bounded jitter. The final
//! load maps onto one of five [`CongestionLevel`] bands. All constants live in
//! [`CongestionConfig`]; the defaults describe Las Vegas.

use std::fmt;

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use crate::coordinate::Coordinate;
use crate::haversine::haversine_m;
use crate::traits::{CongestionModel, JitterSource};

/// Traffic severity, ordered from free-flowing to gridlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CongestionLevel {
    Free,
    Low,
    Medium,
    High,
    Heavy,
}

impl CongestionLevel {
    pub const ALL: [CongestionLevel; 5] = [
        CongestionLevel::Free,
        CongestionLevel::Low,
        CongestionLevel::Medium,
        CongestionLevel::High,
        CongestionLevel::Heavy,
    ];

    /// Default travel-time multiplier for this level.
    pub const fn speed_multiplier(self) -> f64 {
        match self {
            CongestionLevel::Free => 0.8,
            CongestionLevel::Low => 1.0,
            CongestionLevel::Medium => 1.3,
            CongestionLevel::High => 1.7,
            CongestionLevel::Heavy => 2.2,
        }
    }
}

impl fmt::Display for CongestionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CongestionLevel::Free => "free",
            CongestionLevel::Low => "low",
            CongestionLevel::Medium => "medium",
            CongestionLevel::High => "high",
            CongestionLevel::Heavy => "heavy",
        };
        f.write_str(name)
    }
}

/// Per-level travel-time multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedMultipliers {
    pub free: f64,
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub heavy: f64,
}

impl Default for SpeedMultipliers {
    fn default() -> Self {
        Self {
            free: CongestionLevel::Free.speed_multiplier(),
            low: CongestionLevel::Low.speed_multiplier(),
            medium: CongestionLevel::Medium.speed_multiplier(),
            high: CongestionLevel::High.speed_multiplier(),
            heavy: CongestionLevel::Heavy.speed_multiplier(),
        }
    }
}

impl SpeedMultipliers {
    pub fn for_level(&self, level: CongestionLevel) -> f64 {
        match level {
            CongestionLevel::Free => self.free,
            CongestionLevel::Low => self.low,
            CongestionLevel::Medium => self.medium,
            CongestionLevel::High => self.high,
            CongestionLevel::Heavy => self.heavy,
        }
    }
}

/// Axis-aligned latitude/longitude box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    pub const fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    pub fn contains(&self, coord: Coordinate) -> bool {
        (self.south..=self.north).contains(&coord.lat) && (self.west..=self.east).contains(&coord.lng)
    }
}

/// Half-open range of hours `[start, end)`; wraps past midnight when
/// `start > end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourWindow {
    pub start: u32,
    pub end: u32,
}

impl HourWindow {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, hour: u32) -> bool {
        if self.start <= self.end {
            hour >= self.start && hour < self.end
        } else {
            hour >= self.start || hour < self.end
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CongestionConfig {
    pub base_load: f64,

    pub rush_windows: Vec<HourWindow>,
    pub rush_multiplier: f64,
    pub midday_window: HourWindow,
    pub weekday_midday_multiplier: f64,
    pub night_window: HourWindow,
    pub night_multiplier: f64,
    pub weekend_multiplier: f64,
    pub weekend_midday_multiplier: f64,

    pub core_zone: BoundingBox,
    pub core_multiplier: f64,
    pub arterial_anchors: Vec<Coordinate>,
    pub arterial_radius_m: f64,
    pub arterial_multiplier: f64,
    pub residential_zone: BoundingBox,
    pub residential_multiplier: f64,

    /// Jitter stays within `1.0 ± jitter_spread`.
    pub jitter_spread: f64,

    /// Upper bounds (exclusive) of the Free, Low, Medium and High bands.
    pub band_thresholds: [f64; 4],
}

impl Default for CongestionConfig {
    fn default() -> Self {
        Self {
            base_load: 0.3,

            rush_windows: vec![HourWindow::new(7, 10), HourWindow::new(17, 20)],
            rush_multiplier: 2.5,
            midday_window: HourWindow::new(12, 14),
            weekday_midday_multiplier: 1.4,
            night_window: HourWindow::new(22, 6),
            night_multiplier: 0.2,
            weekend_multiplier: 0.6,
            weekend_midday_multiplier: 1.3,

            // The Strip and downtown.
            core_zone: BoundingBox::new(36.08, -115.20, 36.18, -115.13),
            core_multiplier: 1.5,
            arterial_anchors: vec![
                Coordinate::new(36.1725, -115.1560), // I-15 / US-95
                Coordinate::new(36.1167, -115.1870), // I-15 / Flamingo
                Coordinate::new(36.1003, -115.1835), // I-15 / Tropicana
                Coordinate::new(36.1443, -115.1563), // Sahara / Las Vegas Blvd
                Coordinate::new(36.1147, -115.1537), // Flamingo / Paradise
            ],
            arterial_radius_m: 1000.0,
            arterial_multiplier: 1.3,
            // Summerlin.
            residential_zone: BoundingBox::new(36.12, -115.35, 36.22, -115.24),
            residential_multiplier: 0.8,

            jitter_spread: 0.2,

            band_thresholds: [0.3, 0.6, 1.0, 1.5],
        }
    }
}

impl CongestionConfig {
    /// Time-of-day and day-of-week component of the load factor.
    pub fn temporal_multiplier(&self, at: NaiveDateTime) -> f64 {
        let hour = at.hour();
        let weekend = matches!(at.weekday(), Weekday::Sat | Weekday::Sun);
        let mut multiplier = 1.0;

        if weekend {
            multiplier *= self.weekend_multiplier;
            if self.midday_window.contains(hour) {
                multiplier *= self.weekend_midday_multiplier;
            }
        } else if self.rush_windows.iter().any(|window| window.contains(hour)) {
            multiplier *= self.rush_multiplier;
        } else if self.midday_window.contains(hour) {
            multiplier *= self.weekday_midday_multiplier;
        }

        if self.night_window.contains(hour) {
            multiplier *= self.night_multiplier;
        }

        multiplier
    }

    /// Location component of the load factor.
    pub fn geographic_multiplier(&self, coord: Coordinate) -> f64 {
        let mut multiplier = 1.0;
        let in_core = self.core_zone.contains(coord);

        if in_core {
            multiplier *= self.core_multiplier;
        }
        if self
            .arterial_anchors
            .iter()
            .any(|anchor| haversine_m(*anchor, coord) <= self.arterial_radius_m)
        {
            multiplier *= self.arterial_multiplier;
        }
        if !in_core && self.residential_zone.contains(coord) {
            multiplier *= self.residential_multiplier;
        }

        multiplier
    }

    pub fn level_for_load(&self, load: f64) -> CongestionLevel {
        let [free, low, medium, high] = self.band_thresholds;
        if load < free {
            CongestionLevel::Free
        } else if load < low {
            CongestionLevel::Low
        } else if load < medium {
            CongestionLevel::Medium
        } else if load < high {
            CongestionLevel::High
        } else {
            CongestionLevel::Heavy
        }
    }
}

/// No jitter at all; every factor is 1.0.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl JitterSource for NoJitter {
    fn factor(&self, _: Coordinate, _: NaiveDateTime, _: f64, _: f64) -> f64 {
        1.0
    }
}

/// Jitter derived from a seed and the estimate's inputs.
///
/// The same seed and inputs always give the same factor, so congestion stays
/// a pure function of (coordinate, time, route fraction).
#[derive(Debug, Clone, Copy)]
pub struct SeededJitter {
    seed: u64,
}

impl SeededJitter {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl JitterSource for SeededJitter {
    fn factor(&self, coord: Coordinate, at: NaiveDateTime, route_fraction: f64, spread: f64) -> f64 {
        if spread <= 0.0 {
            return 1.0;
        }
        let mut key = [0u8; 40];
        key[0..8].copy_from_slice(&self.seed.to_le_bytes());
        key[8..16].copy_from_slice(&coord.lat.to_bits().to_le_bytes());
        key[16..24].copy_from_slice(&coord.lng.to_bits().to_le_bytes());
        key[24..32].copy_from_slice(&at.and_utc().timestamp().to_le_bytes());
        key[32..40].copy_from_slice(&route_fraction.to_bits().to_le_bytes());

        let mut rng = ChaCha8Rng::seed_from_u64(xxh3_64(&key));
        rng.gen_range(1.0 - spread..=1.0 + spread)
    }
}

/// The default [`CongestionModel`]: configured heuristics plus jitter.
#[derive(Debug, Clone)]
pub struct CongestionEstimator<J = SeededJitter> {
    config: CongestionConfig,
    jitter: J,
}

impl<J: JitterSource> CongestionEstimator<J> {
    pub fn new(config: CongestionConfig, jitter: J) -> Self {
        Self { config, jitter }
    }

    pub fn config(&self) -> &CongestionConfig {
        &self.config
    }

    /// Final load factor after all modifiers and jitter.
    pub fn load_factor(&self, coord: Coordinate, at: NaiveDateTime, route_fraction: f64) -> f64 {
        let config = &self.config;
        config.base_load
            * config.temporal_multiplier(at)
            * config.geographic_multiplier(coord)
            * self
                .jitter
                .factor(coord, at, route_fraction, config.jitter_spread)
    }
}

impl<J: JitterSource> CongestionModel for CongestionEstimator<J> {
    fn estimate(&self, coord: Coordinate, at: NaiveDateTime, route_fraction: f64) -> CongestionLevel {
        let load = self.load_factor(coord, at, route_fraction);
        self.config.level_for_load(load)
    }
}
