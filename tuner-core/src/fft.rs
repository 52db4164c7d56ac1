//! # Fast Fourier Transform (FFT) Module
//!
//! This module turns a frame of audio samples into a frequency spectrum for
//! the pitch detector. It handles windowing, zero-padding and the transform
//! itself.
//!
//! ## Features
//! - Hamming windowing for reduced spectral leakage
//! - Zero-padding to the next power of two
//! - Forward transform through `rustfft`, with one planner per thread
//! - Magnitude extraction for the lower (Nyquist) half of the spectrum

use rustfft::{FftPlanner, num_complex::Complex};
use std::cell::RefCell;
use std::f64::consts::PI;

thread_local! {
    // FftPlanner keeps every plan it has built, keyed by length.
    static PLANNER: RefCell<FftPlanner<f32>> = RefCell::new(FftPlanner::new());
}

/// Applies a Hamming window to the input buffer to reduce spectral leakage.
///
/// `w[i] = 0.54 - 0.46 * cos(2*pi*i / (N - 1))`. Buffers of length 0 or 1
/// are left untouched, as the window is undefined there.
///
/// # Arguments
/// * `buffer` - Audio buffer to window (modified in-place)
pub fn apply_hamming_window(buffer: &mut [f32]) {
    let n = buffer.len();
    if n <= 1 {
        return;
    }
    let n_minus_1 = (n - 1) as f64;
    for (i, sample) in buffer.iter_mut().enumerate() {
        let multiplier = 0.54 - 0.46 * (2.0 * PI * i as f64 / n_minus_1).cos();
        *sample *= multiplier as f32;
    }
}

/// Copies a real signal into a complex buffer, zero-padded to the next power of two.
pub fn zero_pad(signal: &[f32]) -> Vec<Complex<f32>> {
    let padded_len = signal.len().max(1).next_power_of_two();
    let mut buffer: Vec<Complex<f32>> = signal
        .iter()
        .map(|&sample| Complex { re: sample, im: 0.0 })
        .collect();
    buffer.resize(padded_len, Complex { re: 0.0, im: 0.0 });
    buffer
}

/// Performs an in-place forward FFT.
///
/// Plans are cached per length on the calling thread, so repeated frames of
/// the same size reuse one plan. Bin `k` of the result corresponds to
/// `k * sample_rate / N` Hz.
///
/// # Panics
/// * If the buffer length is neither 0 nor a power of two
pub fn fft_in_place(buffer: &mut [Complex<f32>]) {
    let n = buffer.len();
    if n <= 1 {
        return;
    }
    assert!(
        n.is_power_of_two(),
        "FFT length must be a power of two, got {}",
        n
    );

    let fft = PLANNER.with(|planner| planner.borrow_mut().plan_fft_forward(n));
    fft.process(buffer);
}

/// Transforms a real signal, zero-padding it to a power of two first.
pub fn transform(signal: &[f32]) -> Vec<Complex<f32>> {
    let mut buffer = zero_pad(signal);
    fft_in_place(&mut buffer);
    buffer
}

/// Windows a copy of `signal` and returns its complex spectrum.
///
/// This is the analysis front end used by the pitch detector:
/// 1. Hamming windowing
/// 2. Zero-padding to the next power of two
/// 3. Forward FFT
pub fn perform_fft(signal: &[f32]) -> Vec<Complex<f32>> {
    let mut windowed = signal.to_vec();
    apply_hamming_window(&mut windowed);
    transform(&windowed)
}

/// Calculates the magnitude of the lower half of a spectrum.
///
/// Only bins `0..N/2` are returned; for real input the upper half mirrors
/// the lower one.
pub fn spectrum_to_magnitudes(spectrum: &[Complex<f32>]) -> Vec<f32> {
    spectrum
        .iter()
        .take(spectrum.len() / 2)
        .map(|c| c.norm()) // .norm() is sqrt(re^2 + im^2)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_signal(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f32;
                (t * 0.3).sin() * 0.6 + (t * 1.7).cos() * 0.25 + if i % 7 == 0 { 0.1 } else { -0.05 }
            })
            .collect()
    }

    #[test]
    fn length_one_is_identity() {
        let spectrum = transform(&[0.75]);
        assert_eq!(spectrum.len(), 1);
        assert_eq!(spectrum[0], Complex { re: 0.75, im: 0.0 });
    }

    #[test]
    fn pads_to_next_power_of_two() {
        assert_eq!(zero_pad(&[1.0; 1000]).len(), 1024);
        assert_eq!(zero_pad(&[1.0; 1024]).len(), 1024);
        assert_eq!(zero_pad(&[]).len(), 1);
        let padded = zero_pad(&[0.5; 3]);
        assert_eq!(padded[3], Complex { re: 0.0, im: 0.0 });
    }

    fn direct_dft(signal: &[f32]) -> Vec<Complex<f32>> {
        let n = signal.len();
        (0..n)
            .map(|k| {
                signal.iter().enumerate().fold(Complex { re: 0.0f64, im: 0.0 }, |acc, (i, &x)| {
                    let angle = -2.0 * PI * (k * i) as f64 / n as f64;
                    acc + Complex { re: angle.cos(), im: angle.sin() } * x as f64
                })
            })
            .map(|c| Complex { re: c.re as f32, im: c.im as f32 })
            .collect()
    }

    #[test]
    fn matches_direct_dft() {
        for len in [2usize, 8, 64, 512] {
            let signal = test_signal(len);
            let ours = transform(&signal);
            let reference = direct_dft(&signal);

            let scale = reference.iter().map(|c| c.norm()).fold(1.0f32, f32::max);
            for (k, (a, b)) in ours.iter().zip(reference.iter()).enumerate() {
                assert!(
                    (a - b).norm() / scale < 1e-4,
                    "len {} bin {}: {} vs {}",
                    len,
                    k,
                    a,
                    b
                );
            }
        }
    }

    #[test]
    fn repeated_lengths_reuse_the_same_result() {
        let signal = test_signal(1000);
        let first = transform(&signal);
        let _ = transform(&test_signal(64));
        assert_eq!(transform(&signal), first);
        assert_eq!(first.len(), 1024);
    }

    #[test]
    fn pure_tone_lands_in_expected_bin() {
        let n = 256;
        let bin = 10;
        let signal: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * bin as f32 * i as f32 / n as f32).sin())
            .collect();
        let magnitudes = spectrum_to_magnitudes(&transform(&signal));
        assert_eq!(magnitudes.len(), n / 2);
        let peak = magnitudes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(k, _)| k)
            .unwrap();
        assert_eq!(peak, bin);
        assert!((magnitudes[bin] - n as f32 / 2.0).abs() < 1e-2);
    }

    #[test]
    fn hamming_window_shape() {
        let mut buffer = vec![1.0f32; 5];
        apply_hamming_window(&mut buffer);
        assert!((buffer[0] - 0.08).abs() < 1e-6);
        assert!((buffer[2] - 1.0).abs() < 1e-6);
        assert!((buffer[4] - 0.08).abs() < 1e-6);

        let mut single = vec![0.3f32];
        apply_hamming_window(&mut single);
        assert_eq!(single, vec![0.3]);
    }
}
