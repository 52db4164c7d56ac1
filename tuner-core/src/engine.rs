//! # Tuner Engine
//!
//! The public entry point of the crate. A [`TunerEngine`] holds an immutable
//! [`EngineConfig`] and turns `(state, input)` pairs into new states:
//!
//! ```
//! use tuner_core::TunerEngine;
//!
//! let engine = TunerEngine::default();
//! let state = engine.initial_state();
//! let state = engine.handle_command(&state, "tune to a");
//! let state = engine.process_frame(&state, &[0.0; 2048], 44100, 0);
//! assert_eq!(state.target_note, "A");
//! assert!(engine.status_text(&state, 0).starts_with("Volume too low"));
//! ```
//!
//! The caller owns exactly one state value at a time and replaces it with
//! whatever the engine returns.

use crate::config::EngineConfig;
use crate::error::ConfigResult;
use crate::tracker::{self, EngineState};
use crate::{command, display};

/// Pitch detection and tracking engine for a single configuration.
#[derive(Debug, Clone, Default)]
pub struct TunerEngine {
    config: EngineConfig,
}

impl TunerEngine {
    /// Creates an engine after validating `config`.
    pub fn new(config: EngineConfig) -> ConfigResult<Self> {
        config.validate()?;
        log::debug!("[ENGINE] Created with config {:?}", config);
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The state a new session starts in: active, empty history and the
    /// configured default target note.
    pub fn initial_state(&self) -> EngineState {
        EngineState::new(self.config.default_target_note.clone())
    }

    /// Processes one audio frame captured at `now` (monotonic milliseconds).
    ///
    /// `sample_rate` must be the true rate of `frame`.
    pub fn process_frame(&self, state: &EngineState, frame: &[f32], sample_rate: u32, now: u64) -> EngineState {
        tracker::advance(state, frame, sample_rate, now, &self.config)
    }

    /// Applies a lower-cased, trimmed free-text command.
    pub fn handle_command(&self, state: &EngineState, text: &str) -> EngineState {
        command::interpret(state, text)
    }

    /// Renders the status text for the display at time `now`.
    pub fn status_text(&self, state: &EngineState, now: u64) -> String {
        display::format_status(state, now, &self.config)
    }
}
