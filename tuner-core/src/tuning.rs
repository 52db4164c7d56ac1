//! # Musical Tuning Module
//!
//! This module maps frequencies to note names for a guitar tuner.
//! It handles note name conversions, target frequency lookup and cent
//! deviation measurements based on equal temperament with A4 = 440 Hz.
//!
//! ## Features
//! - 88-key note table (A0 to C8), ascending in pitch
//! - Generic chromatic mapping of any frequency to a note name
//! - Guitar-biased nearest-note search favouring the six open strings
//! - Target frequency lookup by note name prefix
//! - Cent deviation calculation

use once_cell::sync::Lazy;

/// Represents a single musical note with its name and frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// Note name (e.g., "A4", "C#3")
    pub name: String,
    /// Frequency in Hz
    pub frequency: f32,
}

/// Chromatic note names, starting at C.
const CHROMATIC_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Standard tuning, low to high.
pub const OPEN_STRINGS: [&str; 6] = ["E2", "A2", "D3", "G3", "B3", "E4"];

/// Name of the note whose frequency is used when a target cannot be resolved.
pub const FALLBACK_TARGET: &str = "E2";

/// Statically computed notes for the 88-key range (A0 to C8).
///
/// Frequencies follow equal temperament with A4 = 440 Hz. The table is
/// ordered by ascending pitch, and that order is what breaks ties in
/// [`find_closest_guitar_note`] and [`get_target_frequency`].
pub static NOTES: Lazy<Vec<Note>> = Lazy::new(|| {
    const NOTE_NAMES: [&str; 12] = [
        "A", "A#", "B", "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#",
    ];
    let mut notes = Vec::with_capacity(88);

    for i in 0..88 {
        // A4 is the 49th key, index 48.
        let frequency = 440.0 * 2.0_f64.powf((i as f64 - 48.0) / 12.0);

        let note_index = i % 12;
        // The octave number changes at C, three keys above A.
        let octave = (i + 9) / 12;
        let name = format!("{}{}", NOTE_NAMES[note_index], octave);

        notes.push(Note {
            name,
            frequency: frequency as f32,
        });
    }
    notes
});

/// Converts a frequency to the nearest chromatic note name, e.g. `"A4"`.
///
/// Works for any positive frequency, not just the 88-key range.
///
/// # Returns
/// * `Some(name)` - Note name with octave
/// * `None` - The frequency is not a positive finite number
pub fn frequency_to_note(freq: f32) -> Option<String> {
    if !freq.is_finite() || freq <= 0.0 {
        return None;
    }
    let half_steps = (12.0 * (freq as f64 / 440.0).log2()).round() as i64;
    // Shift the origin from A to C so octaves roll over at C.
    let from_c = half_steps + 9;
    let octave = 4 + from_c.div_euclid(12);
    let index = from_c.rem_euclid(12) as usize;
    Some(format!("{}{}", CHROMATIC_NAMES[index], octave))
}

/// Returns true if `name` is one of the six open strings in standard tuning.
pub fn is_open_string(name: &str) -> bool {
    OPEN_STRINGS.contains(&name)
}

/// Finds the table note closest to `freq`, biased toward open strings.
///
/// Each candidate scores its absolute cent distance from `freq`; open
/// strings get `open_string_bonus` cents taken off. The lowest score wins,
/// and equal scores keep the lower note.
///
/// # Returns
/// * `Some(note)` - Best matching note from [`NOTES`]
/// * `None` - The frequency is not a positive finite number
pub fn find_closest_guitar_note(freq: f32, open_string_bonus: f32) -> Option<&'static Note> {
    if !freq.is_finite() || freq <= 0.0 {
        return None;
    }
    closest_note_in(&NOTES, freq, open_string_bonus)
}

/// Scores every note of `notes` against `freq`; the first lowest score wins.
fn closest_note_in(notes: &[Note], freq: f32, open_string_bonus: f32) -> Option<&Note> {
    let mut best: Option<(&Note, f32)> = None;
    for note in notes {
        let mut score = cents_between(freq, note.frequency).abs();
        if is_open_string(&note.name) {
            score -= open_string_bonus;
        }
        match best {
            Some((_, best_score)) if score >= best_score => {}
            _ => best = Some((note, score)),
        }
    }
    best.map(|(note, _)| note)
}

/// Gets the target frequency for a note name or name prefix.
///
/// Returns the frequency of the first table note whose name starts with
/// `prefix`. A bare letter therefore resolves to its lowest octave in the
/// table (`"E"` gives E1). Unknown names fall back to E2.
pub fn get_target_frequency(prefix: &str) -> f32 {
    NOTES
        .iter()
        .find(|note| note.name.starts_with(prefix))
        .map(|note| note.frequency)
        .unwrap_or_else(fallback_target_frequency)
}

fn fallback_target_frequency() -> f32 {
    NOTES
        .iter()
        .find(|note| note.name == FALLBACK_TARGET)
        .map(|note| note.frequency)
        .unwrap_or(82.406_89)
}

/// Calculates the deviation from a target frequency in whole cents.
///
/// Cents are a logarithmic unit of pitch measurement where:
/// - 100 cents = 1 semitone
/// - 1200 cents = 1 octave
/// - Positive values indicate sharpness, negative values indicate flatness
pub fn calculate_cents_deviation(freq: f32, target_freq: f32) -> i32 {
    cents_between(freq, target_freq).round() as i32
}

fn cents_between(freq: f32, reference: f32) -> f32 {
    1200.0 * (freq / reference).log2()
}
