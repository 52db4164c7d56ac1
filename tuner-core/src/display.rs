//! Status text for the external display.

use crate::config::EngineConfig;
use crate::tracker::EngineState;

/// Message shown when no resolved detection is available.
pub const NO_PITCH_MESSAGE: &str = "No pitch detected\nPlay a string";

/// Message shown when the latest frame was below the volume threshold.
pub fn volume_too_low_message(volume_threshold: f32) -> String {
    format!(
        "Volume too low\nPlay louder (min {:.0}%)",
        volume_threshold * 100.0
    )
}

/// Renders the state as a short multi-line status string.
///
/// Priority order: too quiet, then no pitch, then the best recent detection
/// with its age in whole seconds relative to `now`.
pub fn format_status(state: &EngineState, now: u64, config: &EngineConfig) -> String {
    if let Some(strength) = state.signal_strength {
        if strength < config.volume_threshold {
            return volume_too_low_message(config.volume_threshold);
        }
    }

    let best = match &state.best_recent {
        Some(best) => best,
        None => return NO_PITCH_MESSAGE.to_string(),
    };
    let note = match &best.note {
        Some(note) => note,
        None => return NO_PITCH_MESSAGE.to_string(),
    };

    let frequency = best.frequency.unwrap_or_default();
    let seconds = now.saturating_sub(best.timestamp) / 1000;
    let unit = if seconds == 1 { "second" } else { "seconds" };

    format!(
        "Note: {}\nFrequency: {:.1} Hz\nSignal: {:.1}%\n{} {} ago",
        note,
        frequency,
        best.signal_strength * 100.0,
        seconds,
        unit
    )
}
