//! Engine configuration.
//!
//! Every section has defaults; a JSON file only needs the fields it changes.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::congestion::CongestionConfig;
use crate::error::ConfigError;
use crate::haversine::DEFAULT_SPEED_KMH;
use crate::ors::OrsConfig;
use crate::segmentation::SegmentationConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub provider: OrsConfig,
    pub congestion: CongestionConfig,
    pub segmentation: SegmentationConfig,
    pub cache: CacheConfig,
    /// Speed assumed when no provider duration exists.
    pub free_flow_speed_kmh: f64,
    /// Upper bound on waiting for the provider, independent of its own timeout.
    pub provider_deadline_secs: u64,
    /// Fixes congestion jitter; a random seed is drawn when absent.
    pub jitter_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider: OrsConfig::default(),
            congestion: CongestionConfig::default(),
            segmentation: SegmentationConfig::default(),
            cache: CacheConfig::default(),
            free_flow_speed_kmh: DEFAULT_SPEED_KMH,
            provider_deadline_secs: 12,
            jitter_seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let bytes = fs::read(path)?;
        let config: Self = serde_json::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.segmentation.validate()
    }

    pub fn provider_deadline(&self) -> Duration {
        Duration::from_secs(self.provider_deadline_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: EngineConfig = serde_json::from_str(
            r#"{
                "provider": { "base_url": "https://ors.example.org", "api_key": "k" },
                "congestion": { "rush_multiplier": 3.0 },
                "jitter_seed": 9
            }"#,
        )
        .unwrap();
        assert_eq!(config.provider.base_url, "https://ors.example.org");
        assert_eq!(config.provider.api_key.as_deref(), Some("k"));
        assert_eq!(config.provider.profile, "driving-car");
        assert_eq!(config.congestion.rush_multiplier, 3.0);
        assert_eq!(config.congestion.base_load, 0.3);
        assert_eq!(config.segmentation.max_segments, 10);
        assert_eq!(config.jitter_seed, Some(9));
        assert_eq!(config.free_flow_speed_kmh, 50.0);
    }

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("traffic-route-{name}-{}.json", std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_inverted_segment_bounds_rejected() {
        let path = write_temp("inverted", r#"{"segmentation":{"min_segments":12}}"#);
        let err = EngineConfig::from_json_file(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
    }

    #[test]
    fn test_zero_min_segments_rejected() {
        let path = write_temp("zero-min", r#"{"segmentation":{"min_segments":0}}"#);
        let err = EngineConfig::from_json_file(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
    }

    #[test]
    fn test_valid_file_loads() {
        let path = write_temp("valid", r#"{"segmentation":{"min_segments":2,"max_segments":6}}"#);
        let config = EngineConfig::from_json_file(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(config.segmentation.min_segments, 2);
        assert_eq!(config.segmentation.max_segments, 6);
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::from_json_file("/nonexistent/traffic-route.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_invalid_json() {
        let path = write_temp("bad", "{ not json");
        let err = EngineConfig::from_json_file(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
