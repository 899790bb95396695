//! Simulation harness for the automatic-overlap procedure.
//!
//! Wires the overlap orchestrator to mock hardware: a mock delay line, two
//! monitor channels whose peak follows a slow envelope over delay, and an
//! error channel whose integrated signal crosses zero at a configurable
//! delay. Useful for exercising the full procedure end to end without a
//! beamline.
//!
//! The fixed refresh waits are realistic (100 ms per snapshot by default),
//! so a full run takes minutes like the real procedure; pass `--fast` to
//! skip them.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::info;
use mimalloc::MiMalloc;

use tcboc_overlap::align::AutoOverlap;
use tcboc_overlap::config::Settings;
use tcboc_overlap::data::write_curve_csv;
use tcboc_overlap::hardware::{MockDelayLine, MockSampleCount, MockWaveformChannel};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Digitizer snapshot capacity, samples.
const CAPACITY: usize = 256;

/// Useful leading samples in each snapshot.
const USEFUL_LENGTH: usize = 200;

#[derive(Parser, Debug)]
#[command(name = "tcboc_overlap", about = "Simulated TCBOC automatic overlap")]
struct Args {
    /// Path to a TOML settings file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the measured error curve to this CSV file instead of the
    /// configured storage directory.
    #[arg(long)]
    curve_csv: Option<PathBuf>,

    /// Simulated delay line starting position, in seconds.
    #[arg(long, default_value_t = 0.0)]
    start: f64,

    /// Simulated true overlap delay, in seconds.
    #[arg(long, default_value_t = 0.5e-12)]
    crossing: f64,

    /// Peak-to-peak noise added to simulated waveforms, in counts.
    #[arg(long, default_value_t = 50.0)]
    noise: f64,

    /// Skip the fixed refresh waits (simulation only).
    #[arg(long)]
    fast: bool,
}

/// Monitor trace: a pulse whose peak follows a slow envelope over delay.
fn monitor_trace(delay: f64) -> Vec<f64> {
    let envelope = (-(delay / 6.0e-12).powi(2)).exp();
    let amplitude = 60000.0 * envelope;
    (0..CAPACITY)
        .map(|i| {
            let x = (i as f64 - 64.0) / 10.0;
            200.0 + amplitude * (-x * x).exp()
        })
        .collect()
}

/// Error trace: flat baseline, then a plateau proportional to the distance
/// from the true crossing, so the integrated signal is linear in delay.
fn error_trace(delay: f64, crossing: f64, nbaseline: usize) -> Vec<f64> {
    let baseline = 1000.0;
    let amplitude = 2.0e15 * (delay - crossing);
    (0..CAPACITY)
        .map(|i| {
            if i < nbaseline {
                baseline
            } else {
                baseline + amplitude
            }
        })
        .collect()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut settings = Settings::new(args.config.as_deref())?;
    if args.fast {
        settings.acquisition.refresh = std::time::Duration::ZERO;
    }
    let nbaseline = settings.scan.nbaseline;
    let crossing = args.crossing;

    info!(
        "simulating overlap: start {:e} s, crossing {:e} s, noise {} counts",
        args.start, crossing, args.noise
    );

    let delay_line = Arc::new(MockDelayLine::new(args.start));
    let position = delay_line.shared_position();

    let monitor_a = Arc::new(
        MockWaveformChannel::new("mon1", position.clone(), monitor_trace)
            .with_noise(args.noise),
    );
    let monitor_b = Arc::new(
        MockWaveformChannel::new("mon2", position.clone(), monitor_trace)
            .with_noise(args.noise),
    );
    let error_signal = Arc::new(
        MockWaveformChannel::new("err", position, move |delay| {
            error_trace(delay, crossing, nbaseline)
        })
        .with_noise(args.noise),
    );
    let buffer = Arc::new(MockSampleCount::new(USEFUL_LENGTH));

    let overlap = AutoOverlap::new(
        delay_line.clone(),
        monitor_a,
        monitor_b,
        error_signal,
        buffer,
        settings.clone(),
    );
    let run_id = overlap.run_id();

    let outcome = overlap.run().await?;
    println!(
        "overlap complete: commanded delay {:e} s ({} attempts, {} curve samples)",
        outcome.commanded_delay,
        outcome.attempts,
        outcome.curve.len()
    );

    let curve_path = match args.curve_csv {
        Some(path) => path,
        None => {
            let dir = &settings.storage.default_path;
            if !dir.exists() {
                std::fs::create_dir_all(dir).with_context(|| {
                    format!("failed to create storage directory at {dir:?}")
                })?;
            }
            dir.join(format!(
                "curve_{}_{}.csv",
                chrono::Utc::now().format("%Y%m%d_%H%M%S"),
                run_id.simple()
            ))
        }
    };
    write_curve_csv(&curve_path, &outcome.curve)?;

    Ok(())
}
