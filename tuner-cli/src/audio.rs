//! # Audio Capture Module
//!
//! This module handles real-time audio capture using CPAL (Cross-Platform Audio Library).
//! It selects an input device configuration, downmixes to mono and streams
//! fixed-size frames to the tuner over a channel.

use anyhow::{Context, Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Sender, TrySendError};

/// Sample rate requested from the device when it supports it.
pub const TARGET_SAMPLE_RATE: u32 = 44100;

/// Starts audio capture from the default input device.
///
/// This function:
/// 1. Selects the default audio input device
/// 2. Picks an f32 configuration, preferring mono near 44.1 kHz
/// 3. Sets up a callback that downmixes and sends `frame_size` chunks
///
/// Frames are dropped when the receiver falls behind.
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Audio stream handle and its actual sample rate
/// * `Err(e)` - No device, no usable format, or the stream could not start
pub fn start_audio_capture(sender: Sender<Vec<f32>>, frame_size: usize) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    log::info!("[AUDIO] Using audio input device: {}", device.name()?);

    let configs = device
        .supported_input_configs()
        .context("Failed to query input configurations")?
        .collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, TARGET_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let rate = TARGET_SAMPLE_RATE.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config = supported_config.with_sample_rate(cpal::SampleRate(rate));

    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    let config: cpal::StreamConfig = config.into();

    log::info!(
        "[AUDIO] Selected sample rate: {} Hz, {} channel(s)",
        sample_rate,
        channels
    );

    let err_fn = |err| log::error!("[AUDIO] An error occurred on the audio stream: {}", err);

    // Accumulates mono samples until a full frame is available.
    let mut audio_buffer: Vec<f32> = Vec::with_capacity(frame_size * 2);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            audio_buffer.extend(downmix(data, channels));

            while audio_buffer.len() >= frame_size {
                let frame: Vec<f32> = audio_buffer.drain(..frame_size).collect();
                match sender.try_send(frame) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => log::trace!("[AUDIO] Tuner busy, dropping frame"),
                    Err(TrySendError::Disconnected(_)) => return,
                }
            }
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok((stream, sample_rate))
}

/// Averages interleaved channels into a mono signal.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Finds the best supported f32 configuration for the target sample rate.
///
/// Mono configurations win over multi-channel ones; within the same channel
/// count the range closest to `target_rate` wins.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let rate_diff = if (c.min_sample_rate().0..=c.max_sample_rate().0).contains(&target_rate) {
                0
            } else {
                let min_diff = (c.min_sample_rate().0 as i64 - target_rate as i64).abs();
                let max_diff = (c.max_sample_rate().0 as i64 - target_rate as i64).abs();
                min_diff.min(max_diff)
            };
            (c.channels() != 1, rate_diff)
        })
}
