//! File-driven tuning: runs a WAV recording through the engine frame by frame.

use anyhow::{Context, Result};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;
use tuner_core::{EngineState, TunerEngine, fft, tuning};

use crate::audio::downmix;

/// Mono audio decoded from a WAV file.
#[derive(Debug, Clone)]
pub struct WavAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Outcome of running a recording through the engine.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub final_state: EngineState,
    /// `(timestamp_ms, note)` each time the detected note changed.
    pub note_changes: Vec<(u64, String)>,
    /// Resolved notes counted over every frame of the file.
    pub note_counts: BTreeMap<String, usize>,
    pub frames: usize,
    /// Timestamp of the last frame, used as "now" for the final status.
    pub end_ms: u64,
}

/// Reads a WAV file and downmixes it to mono samples in [-1, 1].
pub fn read_mono(path: &Path) -> Result<WavAudio> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file {}", path.display()))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .context("Failed to decode float samples")?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .context("Failed to decode integer samples")?
        }
    };

    log::info!(
        "[WAV] Loaded {} ({} Hz, {} channel(s), {} samples)",
        path.display(),
        spec.sample_rate,
        spec.channels,
        interleaved.len()
    );

    Ok(WavAudio {
        samples: downmix(&interleaved, spec.channels as usize),
        sample_rate: spec.sample_rate,
    })
}

/// Feeds `audio` to the engine in `frame_size` chunks.
///
/// Each frame is stamped with the time of its first sample, so the
/// staleness window behaves as it would for a live recording.
pub fn analyze(engine: &TunerEngine, audio: &WavAudio, frame_size: usize) -> FileReport {
    let mut state = engine.initial_state();
    let mut note_changes = Vec::new();
    let mut note_counts = BTreeMap::new();
    let mut frames = 0;
    let mut end_ms = 0;

    for (index, frame) in audio.samples.chunks(frame_size.max(1)).enumerate() {
        let now = (index * frame_size) as u64 * 1000 / audio.sample_rate.max(1) as u64;
        let next = engine.process_frame(&state, frame, audio.sample_rate, now);

        if let Some(note) = &next.detected_note {
            if next.detected_note != state.detected_note {
                note_changes.push((now, note.clone()));
            }
        }

        if let Some(note) = next.latest().and_then(|entry| entry.note.clone()) {
            *note_counts.entry(note).or_insert(0) += 1;
        }

        state = next;
        frames += 1;
        end_ms = now;
    }

    FileReport {
        final_state: state,
        note_changes,
        note_counts,
        frames,
        end_ms,
    }
}

/// A frequency that stands out across the whole recording.
#[derive(Debug, Clone, PartialEq)]
pub struct DominantFrequency {
    /// Bin frequency in Hz, rounded to 0.1 Hz.
    pub frequency: f32,
    /// Level relative to the loudest bin of the file, in dB (always <= 0).
    pub level_db: f32,
    pub note: String,
}

/// Finds the strongest spectral peaks of a recording.
///
/// Every frame is windowed and transformed at the same FFT size (the last
/// frame is zero-filled to `frame_size`), and each bin keeps its maximum
/// magnitude over all frames. Local maxima louder than `threshold_db`
/// relative to the loudest bin are ranked by level and the top `count`
/// are returned with their chromatic note names.
pub fn dominant_frequencies(
    audio: &WavAudio,
    frame_size: usize,
    count: usize,
    threshold_db: f32,
) -> Vec<DominantFrequency> {
    let frame_size = frame_size.max(1);
    let fft_size = frame_size.next_power_of_two();
    let mut peak_magnitudes = vec![0.0f32; fft_size / 2];

    for chunk in audio.samples.chunks(frame_size) {
        let mut frame = chunk.to_vec();
        frame.resize(frame_size, 0.0);
        let magnitudes = fft::spectrum_to_magnitudes(&fft::perform_fft(&frame));
        for (peak, magnitude) in peak_magnitudes.iter_mut().zip(magnitudes) {
            *peak = peak.max(magnitude);
        }
    }

    let loudest = peak_magnitudes.iter().copied().fold(0.0f32, f32::max);
    if loudest <= 0.0 {
        return Vec::new();
    }

    let mut peaks: Vec<(usize, f32)> = (0..peak_magnitudes.len())
        .filter(|&k| {
            let magnitude = peak_magnitudes[k];
            let left = if k > 0 { peak_magnitudes[k - 1] } else { 0.0 };
            let right = peak_magnitudes.get(k + 1).copied().unwrap_or(0.0);
            magnitude > left && magnitude > right
        })
        .map(|k| (k, 20.0 * (peak_magnitudes[k] / loudest).log10()))
        .filter(|&(_, level_db)| level_db > threshold_db)
        .collect();
    peaks.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let bin_width = audio.sample_rate as f32 / fft_size as f32;
    peaks
        .into_iter()
        .filter_map(|(k, level_db)| {
            let frequency = (k as f32 * bin_width * 10.0).round() / 10.0;
            tuning::frequency_to_note(frequency).map(|note| DominantFrequency {
                frequency,
                level_db,
                note,
            })
        })
        .take(count)
        .collect()
}
