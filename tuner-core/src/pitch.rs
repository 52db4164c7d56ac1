//! # Pitch Detection Module
//!
//! This module finds the fundamental frequency of a guitar note in a single
//! audio frame. It uses a spectral approach:
//!
//! 1. Amplitude gating on the RMS level, so silence never reaches the FFT
//! 2. Hamming-windowed FFT of the frame
//! 3. Peak search restricted to the admissible guitar band
//! 4. Quadratic interpolation for sub-bin accuracy

use crate::config::EngineConfig;
use crate::fft;

/// Normalized loudness of a frame in `[0, 1]`.
///
/// The RMS amplitude is divided by `reference_level` and clamped, so any
/// frame with an RMS at or above the reference reads as full strength.
/// An empty frame has strength 0.
pub fn signal_strength(signal: &[f32], reference_level: f32) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    let rms = (signal.iter().map(|&s| s * s).sum::<f32>() / signal.len() as f32).sqrt();
    (rms / reference_level).clamp(0.0, 1.0)
}

/// Inclusive bin range covering `[min_frequency, max_frequency]`.
///
/// The lower edge is floored and the upper edge ceiled, then clipped to the
/// magnitude half of the spectrum. Returns `None` when nothing is left.
pub fn band_bins(
    magnitude_len: usize,
    fft_size: usize,
    sample_rate: u32,
    min_frequency: f32,
    max_frequency: f32,
) -> Option<(usize, usize)> {
    if magnitude_len == 0 || sample_rate == 0 {
        return None;
    }
    let bins_per_hz = fft_size as f32 / sample_rate as f32;
    let start = (min_frequency * bins_per_hz).floor().max(0.0) as usize;
    let end = ((max_frequency * bins_per_hz).ceil().max(0.0) as usize).min(magnitude_len - 1);
    if start > end {
        None
    } else {
        Some((start, end))
    }
}

/// Finds the strongest bin inside the admissible band.
///
/// Returns `None` if the band is empty or the strongest magnitude is below
/// `noise_floor`. On equal magnitudes the lowest bin wins.
pub fn find_peak_bin(
    magnitudes: &[f32],
    fft_size: usize,
    sample_rate: u32,
    config: &EngineConfig,
) -> Option<usize> {
    let (start, end) = band_bins(
        magnitudes.len(),
        fft_size,
        sample_rate,
        config.min_frequency,
        config.max_frequency,
    )?;

    let mut peak_bin = start;
    for bin in start..=end {
        if magnitudes[bin] > magnitudes[peak_bin] {
            peak_bin = bin;
        }
    }

    if magnitudes[peak_bin] < config.noise_floor {
        return None;
    }
    Some(peak_bin)
}

/// Refines a peak bin to a sub-bin frequency using quadratic interpolation.
///
/// With `a`, `b`, `c` the magnitudes at `peak - 1`, `peak` and `peak + 1`,
/// the offset is `p = 0.5 * (a - c) / (a - 2b + c)`. A peak at either end of
/// the magnitude slice, or a flat neighbourhood (zero denominator), yields
/// the raw bin frequency.
pub fn interpolate_peak(magnitudes: &[f32], peak_bin: usize, fft_size: usize, sample_rate: u32) -> f32 {
    let bin_hz = sample_rate as f32 / fft_size as f32;
    let raw_freq = peak_bin as f32 * bin_hz;

    if peak_bin == 0 || peak_bin + 1 >= magnitudes.len() {
        return raw_freq;
    }

    let alpha = magnitudes[peak_bin - 1];
    let beta = magnitudes[peak_bin];
    let gamma = magnitudes[peak_bin + 1];

    let denominator = alpha - 2.0 * beta + gamma;
    if denominator == 0.0 {
        return raw_freq;
    }

    let offset = 0.5 * (alpha - gamma) / denominator;
    (peak_bin as f32 + offset) * bin_hz
}

/// Detects the fundamental frequency of a frame.
///
/// Does not apply the amplitude gate; callers check [`signal_strength`]
/// first.
///
/// # Returns
/// * `Some(frequency)` - Refined frequency in Hz, inside the admissible band
/// * `None` - No peak above the noise floor, or the refined value left the band
pub fn detect_frequency(signal: &[f32], sample_rate: u32, config: &EngineConfig) -> Option<f32> {
    let spectrum = fft::perform_fft(signal);
    let fft_size = spectrum.len();
    let magnitudes = fft::spectrum_to_magnitudes(&spectrum);

    let peak_bin = find_peak_bin(&magnitudes, fft_size, sample_rate, config)?;
    let frequency = interpolate_peak(&magnitudes, peak_bin, fft_size, sample_rate);

    if frequency.is_finite()
        && frequency >= config.min_frequency
        && frequency <= config.max_frequency
    {
        Some(frequency)
    } else {
        log::trace!(
            "[PITCH] Rejected out-of-band peak at {:.2} Hz (bin {})",
            frequency,
            peak_bin
        );
        None
    }
}
