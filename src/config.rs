use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_LOG_PATH: &str = "vibration_data_log.csv";
pub const DEFAULT_DURATION_SECONDS: u64 = 30;
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;
pub const DEFAULT_WINDOW_CAPACITY: usize = 800;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("duration must be at least one second")]
    ZeroDuration,
    #[error("tick interval must be greater than zero")]
    ZeroInterval,
    #[error("window capacity must be greater than zero")]
    ZeroWindowCapacity,
    #[error("at least one channel must be configured")]
    NoChannels,
    #[error("channel count mismatch: configured {expected}, source provides {actual}")]
    ChannelMismatch { expected: usize, actual: usize },
    #[error("tick_interval_ms and sampling_rate_hz are two spellings of the same setting; give one")]
    ConflictingCadence,
}

/// Immutable parameters for one run. Set once before the acquisition loop
/// starts; never mutated mid-run.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub duration_seconds: u64,
    pub tick_interval: Duration,
    pub window_capacity: usize,
    pub log_path: PathBuf,
    pub channel_labels: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            duration_seconds: DEFAULT_DURATION_SECONDS,
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            channel_labels: vec!["Load (Newton)".to_string(), "Deflection (mm)".to_string()],
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.duration_seconds == 0 {
            return Err(ConfigError::ZeroDuration);
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.window_capacity == 0 {
            return Err(ConfigError::ZeroWindowCapacity);
        }
        if self.channel_labels.is_empty() {
            return Err(ConfigError::NoChannels);
        }
        Ok(())
    }

    pub fn channel_count(&self) -> usize {
        self.channel_labels.len()
    }
}

/// Partial run parameters, from a JSON options file or the command line.
/// Layers overlay: a field set in a later layer wins.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunOptions {
    pub duration_seconds: Option<u64>,
    pub tick_interval_ms: Option<u64>,
    pub sampling_rate_hz: Option<u32>,
    pub window_capacity: Option<usize>,
    pub log_path: Option<PathBuf>,
    pub channel_labels: Option<Vec<String>>,
}

impl RunOptions {
    /// Overlay `over` on top of `self`; set fields in `over` take precedence.
    /// The two cadence spellings count as one setting, so a later layer's
    /// rate replaces an earlier layer's interval rather than clashing with it.
    pub fn overlay(self, over: RunOptions) -> RunOptions {
        let (tick_interval_ms, sampling_rate_hz) =
            if over.tick_interval_ms.is_some() || over.sampling_rate_hz.is_some() {
                (over.tick_interval_ms, over.sampling_rate_hz)
            } else {
                (self.tick_interval_ms, self.sampling_rate_hz)
            };
        RunOptions {
            duration_seconds: over.duration_seconds.or(self.duration_seconds),
            tick_interval_ms,
            sampling_rate_hz,
            window_capacity: over.window_capacity.or(self.window_capacity),
            log_path: over.log_path.or(self.log_path),
            channel_labels: over.channel_labels.or(self.channel_labels),
        }
    }

    pub fn into_config(self) -> Result<RunConfig, ConfigError> {
        let defaults = RunConfig::default();
        let tick_interval = match (self.tick_interval_ms, self.sampling_rate_hz) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingCadence),
            (Some(0), None) => return Err(ConfigError::ZeroInterval),
            (Some(ms), None) => Duration::from_millis(ms),
            (None, Some(0)) => return Err(ConfigError::ZeroInterval),
            (None, Some(hz)) => Duration::from_secs_f64(1.0 / f64::from(hz)),
            (None, None) => defaults.tick_interval,
        };
        let config = RunConfig {
            duration_seconds: self.duration_seconds.unwrap_or(defaults.duration_seconds),
            tick_interval,
            window_capacity: self.window_capacity.unwrap_or(defaults.window_capacity),
            log_path: self.log_path.unwrap_or(defaults.log_path),
            channel_labels: self.channel_labels.unwrap_or(defaults.channel_labels),
        };
        config.validate()?;
        Ok(config)
    }
}
