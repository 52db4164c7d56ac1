// tuner-core/src/lib.rs

//! The core logic for the guitar tuner.
//! This crate is responsible for amplitude gating, spectral pitch detection,
//! note mapping and temporal smoothing of detections. It is completely
//! headless: it performs no audio or file I/O and contains no GUI code.
//! Audio frames and commands are handed in by the caller, and every
//! operation returns a new [`EngineState`] value.

pub mod command;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod fft;
pub mod pitch;
pub mod tracker;
pub mod tuning;

pub use config::{EngineConfig, SmoothingConfig};
pub use engine::TunerEngine;
pub use error::{ConfigError, ConfigResult};
pub use tracker::EngineState;

use serde::{Deserialize, Serialize};

/// Represents the result of analysing a single audio frame.
///
/// `note`, `frequency` and `deviation` are either all present or all absent.
/// They are absent when the frame was too quiet or no pitch was found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Name of the matched note, e.g. "E2".
    pub note: Option<String>,
    /// Smoothed frequency in Hz.
    pub frequency: Option<f32>,
    /// Deviation from the target note in cents.
    pub deviation: Option<i32>,
    /// Normalized loudness of the frame (0.0 to 1.0).
    pub signal_strength: f32,
    /// Monotonic capture time in milliseconds.
    pub timestamp: u64,
}

impl DetectionResult {
    /// A result carrying only the loudness of the frame.
    pub fn unresolved(signal_strength: f32, timestamp: u64) -> Self {
        Self {
            note: None,
            frequency: None,
            deviation: None,
            signal_strength,
            timestamp,
        }
    }

    /// True when both a note and a frequency were resolved.
    pub fn is_resolved(&self) -> bool {
        self.note.is_some() && self.frequency.is_some()
    }
}
