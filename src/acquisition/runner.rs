use std::thread;
use std::time::Instant;

use log::{error, info, warn};

use crate::acquisition::error::SourceError;
use crate::acquisition::recorder::CsvRecorder;
use crate::acquisition::source::{Sample, SampleSource};
use crate::acquisition::window::{BoundedWindow, FrameHandle, WindowFrame};
use crate::config::{ConfigError, RunConfig};

const PROGRESS_EVERY: u64 = 5000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    DurationReached,
    SourceLost,
}

/// Outcome of a single tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    Accepted,
    Skipped,
    Finished,
}

#[derive(Clone, Copy, Debug)]
pub struct RunSummary {
    pub accepted: u64,
    pub skipped: u64,
    pub dropped_records: u64,
    pub stop: StopReason,
}

/// Duration-bounded acquisition pipeline: pull, validate, window, persist.
///
/// Owns every piece of per-run state; nothing survives the instance, so two
/// runs never share buffers or counters.
pub struct AcquisitionLoop<S: SampleSource> {
    config: RunConfig,
    source: S,
    window: BoundedWindow,
    recorder: CsvRecorder,
    frame: FrameHandle,
    state: RunState,
    accepted: u64,
    skipped: u64,
    dropped_records: u64,
    stop: Option<StopReason>,
    last_timestamp: f64,
}

impl<S: SampleSource> AcquisitionLoop<S> {
    pub fn new(config: RunConfig, source: S) -> Result<Self, ConfigError> {
        config.validate()?;
        if source.channel_count() != config.channel_count() {
            return Err(ConfigError::ChannelMismatch {
                expected: config.channel_count(),
                actual: source.channel_count(),
            });
        }
        let window = BoundedWindow::new(config.channel_count(), config.window_capacity)?;
        let recorder = CsvRecorder::new(&config.log_path, config.channel_labels.clone());
        Ok(Self {
            config,
            source,
            window,
            recorder,
            frame: FrameHandle::new(),
            state: RunState::Idle,
            accepted: 0,
            skipped: 0,
            dropped_records: 0,
            stop: None,
            last_timestamp: 0.0,
        })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn dropped_records(&self) -> u64 {
        self.dropped_records
    }

    /// Read path for the rendering consumer; cheap to clone, safe to hold
    /// across threads.
    pub fn frame_handle(&self) -> FrameHandle {
        self.frame.clone()
    }

    pub fn snapshot(&self) -> WindowFrame {
        self.window.snapshot()
    }

    /// Drive ticks on the configured cadence until the run completes.
    /// Blocking; the rendering consumer reads through `frame_handle` from its
    /// own thread.
    pub fn run(&mut self) -> RunSummary {
        // Elapsed time is measured from here, not from construction, so the
        // first tick lands at ~0 regardless of setup cost.
        let started = Instant::now();
        loop {
            let elapsed = started.elapsed().as_secs_f64();
            if self.tick_at(elapsed) == Tick::Finished {
                break;
            }
            thread::sleep(self.config.tick_interval);
        }
        self.summary()
    }

    /// One tick at the given elapsed time. Exposed so tests and external
    /// schedulers can drive the loop deterministically.
    pub fn tick_at(&mut self, elapsed_secs: f64) -> Tick {
        match self.state {
            RunState::Completed => return Tick::Finished,
            RunState::Idle => {
                self.state = RunState::Running;
                info!(
                    "data logging initiated ({} s run, {} channels)",
                    self.config.duration_seconds,
                    self.config.channel_count()
                );
            }
            RunState::Running => {}
        }

        let reading = match self.source.next_reading(elapsed_secs) {
            Ok(values) => values,
            Err(SourceError::Empty) => {
                warn!("empty reading received, tick skipped");
                return self.skip(elapsed_secs);
            }
            Err(SourceError::Malformed(text)) => {
                warn!("received non-numeric data {text:?}, tick skipped");
                return self.skip(elapsed_secs);
            }
            Err(err @ SourceError::Unavailable(_)) => {
                error!("{err}; ending run early");
                self.complete(StopReason::SourceLost);
                return Tick::Finished;
            }
        };

        // Accepted timestamps never run backwards.
        let timestamp = elapsed_secs.max(self.last_timestamp);
        let sample = Sample::new(timestamp, reading);
        if sample.values.len() != self.window.channel_count() {
            warn!(
                "reading carried {} values, expected {}; tick skipped",
                sample.values.len(),
                self.window.channel_count()
            );
            return self.skip(elapsed_secs);
        }
        if !sample.is_finite() {
            warn!("non-finite reading, tick skipped");
            return self.skip(elapsed_secs);
        }

        self.last_timestamp = timestamp;
        self.window.push(&sample);
        self.frame.publish(self.window.snapshot());

        if self.accepted == 0 {
            info!("logging data to {}", self.recorder.path().display());
        }
        if let Err(e) = self.recorder.append(&sample) {
            // Best-effort durability: the record is dropped, the run is not.
            warn!(
                "could not write record to {}: {e}",
                self.recorder.path().display()
            );
            self.dropped_records += 1;
        }
        self.accepted += 1;
        if self.accepted % PROGRESS_EVERY == 0 {
            info!("logged {} samples", self.accepted);
        }

        if timestamp >= self.config.duration_seconds as f64 {
            self.complete(StopReason::DurationReached);
            return Tick::Finished;
        }
        Tick::Accepted
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            accepted: self.accepted,
            skipped: self.skipped,
            dropped_records: self.dropped_records,
            stop: self.stop.unwrap_or(StopReason::DurationReached),
        }
    }

    fn skip(&mut self, elapsed_secs: f64) -> Tick {
        self.skipped += 1;
        // A transport that only ever yields empty/garbage lines must not
        // stall the duration-based stop condition.
        if elapsed_secs >= self.config.duration_seconds as f64 {
            self.complete(StopReason::DurationReached);
            return Tick::Finished;
        }
        Tick::Skipped
    }

    fn complete(&mut self, reason: StopReason) {
        self.state = RunState::Completed;
        self.stop = Some(reason);
        if reason == StopReason::DurationReached {
            info!(
                "data logging completed: {} samples accepted, {} ticks skipped",
                self.accepted, self.skipped
            );
        }
    }
}
