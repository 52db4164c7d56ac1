//! # Temporal State Tracker
//!
//! Owns the mutable state of a tuning session. Each audio frame produces a
//! new [`EngineState`]: the frequency estimate is smoothed against the
//! previous one, the frame's [`DetectionResult`] goes into a bounded FIFO
//! history, and the loudest resolved entry of that history is kept as the
//! best recent detection until it goes stale.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::config::{EngineConfig, SmoothingConfig};
use crate::{DetectionResult, pitch, tuning};

/// Complete state of one tuning session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    /// Whether audio frames are processed at all.
    pub active: bool,
    /// Note name (or prefix) used as the reference for deviations.
    pub target_note: String,
    pub detected_note: Option<String>,
    pub detected_frequency: Option<f32>,
    pub deviation: Option<i32>,
    /// Loudness of the most recent active frame.
    pub signal_strength: Option<f32>,
    /// Most recent detections, oldest first.
    pub history: VecDeque<DetectionResult>,
    /// Loudest resolved entry of `history`, until it goes stale.
    pub best_recent: Option<DetectionResult>,
}

impl EngineState {
    /// A fresh, active session state.
    pub fn new(target_note: impl Into<String>) -> Self {
        Self {
            active: true,
            target_note: target_note.into(),
            detected_note: None,
            detected_frequency: None,
            deviation: None,
            signal_strength: None,
            history: VecDeque::new(),
            best_recent: None,
        }
    }

    /// The newest history entry, if any.
    pub fn latest(&self) -> Option<&DetectionResult> {
        self.history.back()
    }
}

/// Blends a new frequency measurement with the previous estimate.
///
/// Small relative changes (below `switch_threshold_percent`) use the slow
/// blend to damp jitter; larger jumps use the fast blend so a real note
/// change takes over quickly. A missing or zero previous value returns
/// `measured` unchanged.
pub fn smooth_frequency(measured: f32, previous: Option<f32>, smoothing: &SmoothingConfig) -> f32 {
    let previous = match previous {
        Some(p) if p != 0.0 => p,
        _ => return measured,
    };
    let change_percent = (measured - previous).abs() / previous * 100.0;
    let weight = if change_percent < smoothing.switch_threshold_percent {
        smoothing.slow_weight
    } else {
        smoothing.fast_weight
    };
    weight * measured + (1.0 - weight) * previous
}

/// Appends `entry`, evicting the oldest entries beyond `capacity`.
pub fn push_history(history: &mut VecDeque<DetectionResult>, entry: DetectionResult, capacity: usize) {
    history.push_back(entry);
    while history.len() > capacity {
        history.pop_front();
    }
}

/// Finds the resolved entry with the highest signal strength.
///
/// Unresolved entries are never selected. On equal strengths the newer
/// entry wins.
pub fn select_best_recent(history: &VecDeque<DetectionResult>) -> Option<DetectionResult> {
    history
        .iter()
        .filter(|entry| entry.is_resolved())
        .max_by(|a, b| {
            a.signal_strength
                .partial_cmp(&b.signal_strength)
                .unwrap_or(std::cmp::Ordering::Less)
        })
        .cloned()
}

/// Drops `best` once it is more than `stale_after_ms` older than `now`.
pub fn expire_best_recent(best: Option<DetectionResult>, now: u64, stale_after_ms: u64) -> Option<DetectionResult> {
    best.filter(|entry| now.saturating_sub(entry.timestamp) <= stale_after_ms)
}

/// Advances the session by one audio frame.
///
/// An inactive state is returned unchanged. Otherwise the frame is gated,
/// analysed, smoothed and recorded as described in the module docs. The
/// input state is never modified.
pub fn advance(
    state: &EngineState,
    frame: &[f32],
    sample_rate: u32,
    now: u64,
    config: &EngineConfig,
) -> EngineState {
    if !state.active {
        return state.clone();
    }

    let mut next = state.clone();
    let strength = pitch::signal_strength(frame, config.reference_level);
    next.signal_strength = Some(strength);
    let mut result = DetectionResult::unresolved(strength, now);

    if strength < config.volume_threshold {
        log::trace!(
            "[TRACKER] Frame below volume threshold ({:.3} < {:.3})",
            strength,
            config.volume_threshold
        );
    } else if let Some(frequency) = pitch::detect_frequency(frame, sample_rate, config) {
        let smoothed = smooth_frequency(frequency, state.detected_frequency, &config.smoothing);
        if let Some(note) = tuning::find_closest_guitar_note(smoothed, config.open_string_bonus_cents) {
            let target_freq = tuning::get_target_frequency(&state.target_note);
            let deviation = tuning::calculate_cents_deviation(smoothed, target_freq);

            if state.detected_note.as_deref() != Some(note.name.as_str()) {
                log::debug!(
                    "[TRACKER] Detected {} at {:.2} Hz ({:+} cents from {})",
                    note.name,
                    smoothed,
                    deviation,
                    state.target_note
                );
            }

            next.detected_note = Some(note.name.clone());
            next.detected_frequency = Some(smoothed);
            next.deviation = Some(deviation);

            result.note = Some(note.name.clone());
            result.frequency = Some(smoothed);
            result.deviation = Some(deviation);
        }
    } else {
        log::trace!("[TRACKER] No pitch found in frame");
    }

    push_history(&mut next.history, result, config.history_size);
    let best = select_best_recent(&next.history);
    next.best_recent = expire_best_recent(best, now, config.stale_after_ms);
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(note: &str, strength: f32, timestamp: u64) -> DetectionResult {
        DetectionResult {
            note: Some(note.to_string()),
            frequency: Some(100.0),
            deviation: Some(0),
            signal_strength: strength,
            timestamp,
        }
    }

    #[test]
    fn smoothing_without_previous_is_identity() {
        let smoothing = SmoothingConfig::default();
        assert_eq!(smooth_frequency(110.0, None, &smoothing), 110.0);
        assert_eq!(smooth_frequency(110.0, Some(0.0), &smoothing), 110.0);
    }

    #[test]
    fn small_changes_use_slow_blend() {
        let smoothing = SmoothingConfig::default();
        // 2% change
        let smoothed = smooth_frequency(102.0, Some(100.0), &smoothing);
        assert!((smoothed - (0.7 * 102.0 + 0.3 * 100.0)).abs() < 1e-4);
    }

    #[test]
    fn large_jumps_use_fast_blend() {
        let smoothing = SmoothingConfig::default();
        let smoothed = smooth_frequency(150.0, Some(100.0), &smoothing);
        assert!((smoothed - (0.9 * 150.0 + 0.1 * 100.0)).abs() < 1e-4);
        let smoothed = smooth_frequency(95.0, Some(100.0), &smoothing);
        assert!((smoothed - (0.9 * 95.0 + 0.1 * 100.0)).abs() < 1e-4);
    }

    #[test]
    fn change_of_exactly_the_threshold_uses_fast_blend() {
        let smoothing = SmoothingConfig::default();
        // 3% change: 0.9 * 103 + 0.1 * 100, where the slow blend would give 102.1.
        let smoothed = smooth_frequency(103.0, Some(100.0), &smoothing);
        assert!((smoothed - 102.7).abs() < 1e-3);
    }

    #[test]
    fn history_is_fifo_and_bounded() {
        let mut history = VecDeque::new();
        for t in 0..15u64 {
            push_history(&mut history, DetectionResult::unresolved(0.5, t), 10);
        }
        assert_eq!(history.len(), 10);
        assert_eq!(history.front().unwrap().timestamp, 5);
        assert_eq!(history.back().unwrap().timestamp, 14);
    }

    #[test]
    fn best_recent_skips_unresolved_entries() {
        let mut history = VecDeque::new();
        history.push_back(DetectionResult::unresolved(0.99, 1));
        history.push_back(resolved("A2", 0.4, 2));
        history.push_back(resolved("E2", 0.7, 3));
        history.push_back(resolved("D3", 0.2, 4));
        assert_eq!(select_best_recent(&history).unwrap().note.as_deref(), Some("E2"));

        let only_unresolved: VecDeque<_> = vec![DetectionResult::unresolved(0.9, 1)].into();
        assert_eq!(select_best_recent(&only_unresolved), None);
    }

    #[test]
    fn stale_best_recent_expires() {
        let best = Some(resolved("E2", 0.5, 1_000));
        assert!(expire_best_recent(best.clone(), 31_000, 30_000).is_some());
        assert!(expire_best_recent(best, 31_001, 30_000).is_none());
    }

    #[test]
    fn inactive_state_passes_frames_through() {
        let config = EngineConfig::default();
        let mut state = EngineState::new("E2");
        state.active = false;
        let frame = vec![0.5f32; 1024];
        assert_eq!(advance(&state, &frame, 16000, 10, &config), state);
    }

    #[test]
    fn quiet_frame_is_recorded_without_detection() {
        let config = EngineConfig::default();
        let state = EngineState::new("E2");
        let next = advance(&state, &[0.0f32; 1024], 16000, 42, &config);
        assert_eq!(next.signal_strength, Some(0.0));
        assert_eq!(next.detected_note, None);
        assert_eq!(next.history.len(), 1);
        assert_eq!(next.latest(), Some(&DetectionResult::unresolved(0.0, 42)));
        assert_eq!(next.best_recent, None);
        // The input state is left untouched.
        assert!(state.history.is_empty());
    }
}
