//! # Engine Configuration Module
//!
//! All tunable thresholds of the detection pipeline live in one immutable
//! [`EngineConfig`] value that is handed to the engine at construction.
//! Two engines with different configs can run side by side.
//!
//! Configs are plain JSON on disk. Every field has a default, so a file only
//! needs to mention the values it overrides.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};

/// Parameters of the frequency smoothing step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Percent change below which the slow blend is used.
    pub switch_threshold_percent: f32,
    /// Weight of the new measurement for small changes (previous gets the rest).
    pub slow_weight: f32,
    /// Weight of the new measurement for large jumps (previous gets the rest).
    pub fast_weight: f32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            switch_threshold_percent: 3.0,
            slow_weight: 0.7,
            fast_weight: 0.9,
        }
    }
}

/// Immutable configuration of a [`TunerEngine`](crate::engine::TunerEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum normalized signal strength for spectral analysis to run.
    pub volume_threshold: f32,
    /// RMS level that maps to a signal strength of 1.0.
    pub reference_level: f32,
    /// Capacity of the detection history.
    pub history_size: usize,
    /// Lower edge of the admissible band in Hz.
    pub min_frequency: f32,
    /// Upper edge of the admissible band in Hz.
    pub max_frequency: f32,
    /// Age in milliseconds after which the best recent detection is dropped.
    pub stale_after_ms: u64,
    pub smoothing: SmoothingConfig,
    /// Cents subtracted from the score of the six open guitar strings.
    pub open_string_bonus_cents: f32,
    /// Absolute magnitude below which a spectral peak is treated as noise.
    pub noise_floor: f32,
    /// Target note a fresh session starts with.
    pub default_target_note: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            volume_threshold: 0.03,
            reference_level: 0.1,
            history_size: 10,
            min_frequency: 70.0,
            max_frequency: 350.0,
            stale_after_ms: 30_000,
            smoothing: SmoothingConfig::default(),
            open_string_bonus_cents: 5.0,
            noise_floor: 0.01,
            default_target_note: "E2".to_string(),
        }
    }
}

impl EngineConfig {
    /// Checks that every field is usable by the pipeline.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.reference_level.is_finite() || self.reference_level <= 0.0 {
            return Err(ConfigError::invalid(
                "reference_level",
                format!("must be a positive number, got {}", self.reference_level),
            ));
        }
        if !(0.0..=1.0).contains(&self.volume_threshold) {
            return Err(ConfigError::invalid(
                "volume_threshold",
                format!("must be within [0, 1], got {}", self.volume_threshold),
            ));
        }
        if self.history_size == 0 {
            return Err(ConfigError::invalid("history_size", "must be at least 1"));
        }
        if !self.min_frequency.is_finite() || self.min_frequency <= 0.0 {
            return Err(ConfigError::invalid(
                "min_frequency",
                format!("must be a positive number, got {}", self.min_frequency),
            ));
        }
        if !self.max_frequency.is_finite() || self.max_frequency <= self.min_frequency {
            return Err(ConfigError::invalid(
                "max_frequency",
                format!(
                    "must be above min_frequency ({}), got {}",
                    self.min_frequency, self.max_frequency
                ),
            ));
        }
        for (field, weight) in [
            ("smoothing.slow_weight", self.smoothing.slow_weight),
            ("smoothing.fast_weight", self.smoothing.fast_weight),
        ] {
            if !(0.0..=1.0).contains(&weight) {
                return Err(ConfigError::invalid(
                    field,
                    format!("must be within [0, 1], got {}", weight),
                ));
            }
        }
        if self.smoothing.switch_threshold_percent.is_nan() || self.smoothing.switch_threshold_percent < 0.0 {
            return Err(ConfigError::invalid(
                "smoothing.switch_threshold_percent",
                "must not be negative",
            ));
        }
        if self.noise_floor.is_nan() || self.noise_floor < 0.0 {
            return Err(ConfigError::invalid("noise_floor", "must not be negative"));
        }
        if self.open_string_bonus_cents.is_nan() || self.open_string_bonus_cents < 0.0 {
            return Err(ConfigError::invalid(
                "open_string_bonus_cents",
                "must not be negative",
            ));
        }
        if self.default_target_note.trim().is_empty() {
            return Err(ConfigError::invalid(
                "default_target_note",
                "must not be empty",
            ));
        }
        Ok(())
    }

    /// Parses and validates a JSON config.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    /// Saves the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let json_string = serde_json::to_string_pretty(self)?;
        fs::write(path, json_string)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.history_size, 10);
        assert_eq!(config.stale_after_ms, 30_000);
        assert_eq!(config.default_target_note, "E2");
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{ "volume_threshold": 0.1, "smoothing": { "fast_weight": 1.0 } }"#)
                .unwrap();
        assert_eq!(config.volume_threshold, 0.1);
        assert_eq!(config.smoothing.fast_weight, 1.0);
        assert_eq!(config.smoothing.slow_weight, 0.7);
        assert_eq!(config.max_frequency, 350.0);
    }

    #[test]
    fn rejects_inverted_band() {
        let config = EngineConfig {
            min_frequency: 400.0,
            ..EngineConfig::default()
        };
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "max_frequency"),
            other => panic!("expected invalid max_frequency, got {:?}", other),
        }
    }

    #[test]
    fn rejects_zero_history_and_bad_weights() {
        let config = EngineConfig {
            history_size: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.smoothing.slow_weight = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            EngineConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn save_then_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tuner.json");
        let config = EngineConfig {
            default_target_note: "A2".to_string(),
            stale_after_ms: 5_000,
            ..EngineConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            EngineConfig::load(dir.path().join("absent.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
