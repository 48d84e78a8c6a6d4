use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use log::info;

use rigdaq::acquisition::{
    AcquisitionLoop, FrameHandle, ReplaySource, SampleSource, SerialSource, StopReason,
    SyntheticSource,
};
use rigdaq::config::RunOptions;

#[derive(Parser, Debug)]
#[command(
    name = "rigdaq",
    about = "Real-time load/deflection acquisition, display buffering, and CSV logging"
)]
struct Cli {
    /// Total run length in seconds.
    #[arg(long)]
    duration: Option<u64>,

    /// Tick cadence in milliseconds.
    #[arg(long, conflicts_with = "rate")]
    interval_ms: Option<u64>,

    /// Sampling rate in samples per second (alternative spelling of the cadence).
    #[arg(long)]
    rate: Option<u32>,

    /// Number of recent samples retained for display.
    #[arg(long)]
    window: Option<usize>,

    /// Output CSV path.
    #[arg(long)]
    out: Option<PathBuf>,

    /// JSON run-options file; explicit flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serial port to read, one line per sample (repeat once per channel).
    #[arg(long = "port", conflicts_with = "replay")]
    ports: Vec<String>,

    /// Baud rate for every serial port.
    #[arg(long, default_value_t = 9600)]
    baud: u32,

    /// Per-read serial timeout in milliseconds.
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    /// Pre-generated columnar signal file consumed one row per tick.
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Seed for the synthetic source, for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();
    let cli = Cli::parse();

    let mut options = RunOptions::default();
    if let Some(path) = &cli.config {
        let text = fs::read_to_string(path)
            .with_context(|| format!("could not read options file {}", path.display()))?;
        options = serde_json::from_str(&text)
            .with_context(|| format!("invalid options file {}", path.display()))?;
    }
    options = options.overlay(RunOptions {
        duration_seconds: cli.duration,
        tick_interval_ms: cli.interval_ms,
        sampling_rate_hz: cli.rate,
        window_capacity: cli.window,
        log_path: cli.out.clone(),
        channel_labels: None,
    });

    let (source, source_labels) = open_source(&cli)?;
    if options.channel_labels.is_none() {
        options.channel_labels = source_labels;
    }
    let config = options.into_config()?;
    let labels = config.channel_labels.clone();

    let mut runner = AcquisitionLoop::new(config, source)?;

    // Stand-in for the plotting surface: an independent consumer reading the
    // shared frame on its own cadence.
    let stop = Arc::new(AtomicBool::new(false));
    let status = spawn_status_reader(runner.frame_handle(), labels, stop.clone());

    let summary = runner.run();

    stop.store(true, Ordering::Relaxed);
    let _ = status.join();

    info!(
        "run finished: {} samples accepted, {} ticks skipped, {} records dropped",
        summary.accepted, summary.skipped, summary.dropped_records
    );
    if summary.stop == StopReason::SourceLost {
        bail!("acquisition ended early: sample source lost");
    }
    Ok(())
}

/// Pick the producer: live serial ports, a replay file, or the synthetic rig
/// model. Also returns the channel labels implied by the source, used when
/// the run options name none.
fn open_source(cli: &Cli) -> Result<(Box<dyn SampleSource>, Option<Vec<String>>)> {
    if !cli.ports.is_empty() {
        let timeout = Duration::from_millis(cli.timeout_ms);
        let source =
            SerialSource::open(&cli.ports, cli.baud, timeout).map_err(|e| anyhow!("{e}"))?;
        let labels = if cli.ports.len() == 2 {
            None // the default load/deflection column labels apply
        } else {
            Some(
                (1..=cli.ports.len())
                    .map(|i| format!("Channel {i}"))
                    .collect(),
            )
        };
        return Ok((Box::new(source), labels));
    }
    if let Some(path) = &cli.replay {
        let source = ReplaySource::open(path).map_err(|e| anyhow!("{e}"))?;
        let labels = source.headers().to_vec();
        return Ok((Box::new(source), Some(labels)));
    }
    info!("no transport configured, using the synthetic load/deflection source");
    Ok((Box::new(SyntheticSource::load_deflection(cli.seed)), None))
}

fn spawn_status_reader(
    frame: FrameHandle,
    labels: Vec<String>,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            thread::sleep(Duration::from_secs(1));
            let snapshot = frame.read_snapshot();
            if let Some((t, values)) = snapshot.latest() {
                let readout = labels
                    .iter()
                    .zip(&values)
                    .map(|(label, value)| format!("{label}={value:.3}"))
                    .collect::<Vec<_>>()
                    .join("  ");
                info!("t={t:7.3} s  {readout}  ({} in window)", snapshot.len());
            }
        }
    })
}
