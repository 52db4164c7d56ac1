//! # Guitar Tuner - Command Line Host
//!
//! Runs the tuner engine against either the default input device or a WAV
//! file and prints the status text the engine produces.
//!
//! ## Architecture
//! - **Audio callback**: CPAL stream that frames and downmixes samples
//! - **Command thread**: reads lines from stdin and forwards them as commands
//! - **Main thread**: owns the single engine state and selects over frames,
//!   commands and a status ticker
//! - **Communication**: Crossbeam channels between the three

mod audio;
mod wav;

use anyhow::{Context, Result};
use clap::Parser;
use cpal::traits::StreamTrait;
use crossbeam_channel::{Receiver, select};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tuner_core::{EngineConfig, EngineState, TunerEngine};

/// Frames buffered between the audio callback and the engine.
const FRAME_QUEUE_DEPTH: usize = 8;

#[derive(Debug, Parser)]
#[command(name = "guitar-tuner", about = "Real-time guitar pitch detection and tuning")]
struct Args {
    /// JSON engine configuration; omitted fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Analyze a WAV file instead of the live input device
    #[arg(long)]
    wav: Option<PathBuf>,

    /// Samples per analysis frame
    #[arg(long, default_value_t = 2048)]
    frame_size: usize,

    /// Interval between status updates in live mode
    #[arg(long, default_value_t = 500)]
    status_interval_ms: u64,

    /// In file mode, report the three strongest frequencies instead of one
    #[arg(long)]
    chord: bool,

    /// In file mode, ignore peaks quieter than this relative to the loudest (dB)
    #[arg(long, default_value_t = -20.0, allow_negative_numbers = true)]
    threshold_db: f32,

    /// Print state snapshots as JSON instead of status text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let engine = TunerEngine::new(config).context("Invalid engine configuration")?;

    if args.frame_size == 0 {
        anyhow::bail!("--frame-size must be at least 1");
    }

    match &args.wav {
        Some(path) => run_file(&engine, path, &args),
        None => run_live(&engine, &args),
    }
}

/// Runs a recording through the engine and prints note changes and a summary.
fn run_file(engine: &TunerEngine, path: &Path, args: &Args) -> Result<()> {
    let audio = wav::read_mono(path)?;
    let report = wav::analyze(engine, &audio, args.frame_size);

    for (timestamp, note) in &report.note_changes {
        println!("{:>8.3}s  {}", *timestamp as f64 / 1000.0, note);
    }

    println!();
    println!("{}", render(engine, &report.final_state, report.end_ms, args.json)?);

    if !report.note_counts.is_empty() {
        println!();
        println!("Frames per note:");
        for (note, count) in &report.note_counts {
            println!("  {:<4} {}", note, count);
        }
    }

    let count = if args.chord { 3 } else { 1 };
    let dominant = wav::dominant_frequencies(&audio, args.frame_size, count, args.threshold_db);
    if !dominant.is_empty() {
        println!();
        println!("Dominant frequencies:");
        for peak in &dominant {
            println!("  {:>7.1} Hz  {:<4} {:>6.1} dB", peak.frequency, peak.note, peak.level_db);
        }
    }
    log::info!("[CLI] Processed {} frames", report.frames);
    Ok(())
}

/// Captures live audio until `quit` is entered or input ends.
fn run_live(engine: &TunerEngine, args: &Args) -> Result<()> {
    let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Vec<f32>>(FRAME_QUEUE_DEPTH);
    let (stream, sample_rate) = audio::start_audio_capture(frame_tx, args.frame_size)
        .context("Failed to start audio capture")?;

    let command_rx = spawn_command_reader();
    let no_commands = crossbeam_channel::never::<String>();
    let mut commands_open = true;
    let ticker = crossbeam_channel::tick(Duration::from_millis(args.status_interval_ms.max(1)));
    let started = Instant::now();
    let mut state = engine.initial_state();

    log::info!("[CLI] Listening. Type commands (e.g. \"tune to a\"), or \"quit\" to stop.");

    loop {
        let commands = if commands_open { &command_rx } else { &no_commands };
        select! {
            recv(frame_rx) -> msg => match msg {
                Ok(frame) => {
                    state = engine.process_frame(&state, &frame, sample_rate, elapsed_ms(started));
                }
                Err(_) => {
                    log::error!("[CLI] Audio channel closed");
                    break;
                }
            },
            recv(commands) -> msg => match msg {
                Ok(text) if text == "quit" || text == "exit" => break,
                Ok(text) => state = engine.handle_command(&state, &text),
                Err(_) => {
                    log::debug!("[CLI] Command input closed");
                    commands_open = false;
                }
            },
            recv(ticker) -> _ => {
                println!("{}\n", render(engine, &state, elapsed_ms(started), args.json)?);
            },
        }
    }

    log::info!("[CLI] Stopping stream...");
    if let Err(e) = stream.pause() {
        log::warn!("[CLI] Error pausing stream: {}", e);
    }
    Ok(())
}

/// Forwards stdin lines, lower-cased and trimmed, until EOF.
fn spawn_command_reader() -> Receiver<String> {
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let command = line.trim().to_lowercase();
            if command.is_empty() {
                continue;
            }
            if tx.send(command).is_err() {
                break;
            }
        }
    });
    rx
}

fn render(engine: &TunerEngine, state: &EngineState, now: u64, json: bool) -> Result<String> {
    if json {
        Ok(serde_json::to_string(state)?)
    } else {
        Ok(engine.status_text(state, now))
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
