//! Free-text command handling.
//!
//! Commands usually come from speech-to-text, already lower-cased and
//! trimmed. Rules are tried in priority order and the first match wins;
//! text matching no rule leaves the state unchanged.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::tracker::EngineState;

static TUNE_TO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)tune to ([a-g][#b]?)").expect("tune-to pattern is valid")
});

const DEACTIVATE_PHRASES: [&str; 2] = ["exit tuner", "chord mode"];
const ACTIVATE_PHRASES: [&str; 2] = ["tuner mode", "tune guitar"];

/// A recognised command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Change the reference note, e.g. "A" or "F#".
    SetTarget(String),
    /// Stop processing audio frames.
    Deactivate,
    /// Resume processing audio frames.
    Activate,
}

/// Parses a command, returning `None` when no rule matches.
pub fn parse_command(text: &str) -> Option<Command> {
    if let Some(captures) = TUNE_TO.captures(text) {
        return Some(Command::SetTarget(captures[1].to_uppercase()));
    }
    if DEACTIVATE_PHRASES.iter().any(|phrase| text.contains(phrase)) {
        return Some(Command::Deactivate);
    }
    if ACTIVATE_PHRASES.iter().any(|phrase| text.contains(phrase)) {
        return Some(Command::Activate);
    }
    None
}

/// Returns the state that results from applying `command`.
pub fn apply_command(state: &EngineState, command: &Command) -> EngineState {
    let mut next = state.clone();
    match command {
        Command::SetTarget(note) => next.target_note = note.clone(),
        Command::Deactivate => next.active = false,
        Command::Activate => next.active = true,
    }
    next
}

/// Parses `text` and applies it, leaving the state unchanged on no match.
pub fn interpret(state: &EngineState, text: &str) -> EngineState {
    match parse_command(text) {
        Some(command) => {
            log::info!("[COMMAND] {:?}", command);
            apply_command(state, &command)
        }
        None => {
            log::debug!("[COMMAND] Ignoring unrecognised command {:?}", text);
            state.clone()
        }
    }
}
