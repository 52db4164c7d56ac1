//! History and best-recent behaviour of the state tracker across many frames.

use tuner_core::{EngineState, TunerEngine};

const SAMPLE_RATE: u32 = 16000;
const FRAME_SIZE: usize = 2048;

fn sine_frame(freq: f32, amplitude: f32) -> Vec<f32> {
    (0..FRAME_SIZE)
        .map(|i| {
            amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / SAMPLE_RATE as f32).sin()
        })
        .collect()
}

/// Checks the best-recent invariant against the current history.
fn assert_best_is_loudest_resolved(state: &EngineState) {
    if let Some(best) = &state.best_recent {
        assert!(best.is_resolved());
        for entry in state.history.iter().filter(|e| e.is_resolved()) {
            assert!(
                best.signal_strength >= entry.signal_strength,
                "best {} < entry {}",
                best.signal_strength,
                entry.signal_strength
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_bounded_fifo() {
        let engine = TunerEngine::default();
        let mut state = engine.initial_state();
        for t in 0..14u64 {
            state = engine.process_frame(&state, &sine_frame(110.0, 0.3), SAMPLE_RATE, t * 100);
            assert!(state.history.len() <= 10);
        }
        assert_eq!(state.history.len(), 10);
        let timestamps: Vec<u64> = state.history.iter().map(|e| e.timestamp).collect();
        assert_eq!(timestamps, (4..14u64).map(|t| t * 100).collect::<Vec<_>>());
    }

    #[test]
    fn test_best_recent_is_loudest_resolved_entry() {
        let engine = TunerEngine::default();
        let mut state = engine.initial_state();
        // Mix of loud, soft and silent frames.
        let amplitudes = [0.02, 0.1, 0.0, 0.05, 0.12, 0.0, 0.01, 0.08, 0.03, 0.11, 0.0, 0.02, 0.06];
        for (t, &amp) in amplitudes.iter().enumerate() {
            state = engine.process_frame(&state, &sine_frame(110.0, amp), SAMPLE_RATE, t as u64 * 50);
            assert_best_is_loudest_resolved(&state);
        }

        let best = state.best_recent.as_ref().expect("a resolved entry exists");
        let loudest = state
            .history
            .iter()
            .filter(|e| e.is_resolved())
            .map(|e| e.signal_strength)
            .fold(0.0f32, f32::max);
        assert_eq!(best.signal_strength, loudest);
    }

    #[test]
    fn test_best_recent_survives_quiet_frames() {
        let engine = TunerEngine::default();
        let mut state = engine.process_frame(&engine.initial_state(), &sine_frame(110.0, 0.3), SAMPLE_RATE, 0);
        for t in 1..5u64 {
            state = engine.process_frame(&state, &[0.0; FRAME_SIZE], SAMPLE_RATE, t * 1000);
        }
        assert_eq!(state.best_recent.as_ref().and_then(|b| b.note.as_deref()), Some("A2"));
        // Detection fields keep the last accepted value.
        assert_eq!(state.detected_note.as_deref(), Some("A2"));
    }

    #[test]
    fn test_stale_best_recent_is_cleared() {
        let engine = TunerEngine::default();
        let state = engine.process_frame(&engine.initial_state(), &sine_frame(110.0, 0.3), SAMPLE_RATE, 1_000);
        assert!(state.best_recent.is_some());

        let still_fresh = engine.process_frame(&state, &[0.0; FRAME_SIZE], SAMPLE_RATE, 31_000);
        assert!(still_fresh.best_recent.is_some());

        let stale = engine.process_frame(&state, &[0.0; FRAME_SIZE], SAMPLE_RATE, 31_001);
        assert_eq!(stale.best_recent, None);
        assert!(engine.status_text(&stale, 31_001).starts_with("Volume too low"));
    }

    #[test]
    fn test_evicted_best_recent_is_replaced() {
        let engine = TunerEngine::default();
        let mut state = engine.process_frame(&engine.initial_state(), &sine_frame(110.0, 0.12), SAMPLE_RATE, 0);
        let loud = state.best_recent.clone().unwrap();

        for t in 1..=10u64 {
            state = engine.process_frame(&state, &sine_frame(110.0, 0.02), SAMPLE_RATE, t * 10);
        }
        let best = state.best_recent.unwrap();
        assert!(best.signal_strength < loud.signal_strength);
        assert!(best.timestamp > 0);
    }
}
