use std::time::Duration;

use crate::error::{AppError, AppResult, ConfigError};

use super::types::{DurationValue, LoadConfig, RunFile};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(10);
const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Resolved load directives handed to the tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadProfile {
    pub concurrency: Option<u64>,
    pub ramp_up: Option<Duration>,
    pub duration: Option<Duration>,
    pub iterations: Option<u64>,
}

impl LoadProfile {
    /// Resolves textual durations from the run file.
    ///
    /// # Errors
    ///
    /// Returns an error when a duration cannot be parsed.
    pub fn from_config(config: &LoadConfig) -> AppResult<Self> {
        Ok(Self {
            concurrency: config.concurrency.filter(|value| *value > 0),
            ramp_up: resolve_ramp_up(config.ramp_up.as_ref())?,
            duration: resolve_duration(config.duration.as_ref(), "load.duration")?,
            iterations: config.iterations,
        })
    }

    /// Delay between starting consecutive worker processes, in milliseconds.
    #[must_use]
    pub fn ramp_interval_ms(&self) -> Option<u128> {
        let concurrency = self.concurrency.filter(|value| *value > 0)?;
        let ramp_up = self.ramp_up?;
        ramp_up.as_millis().checked_div(u128::from(concurrency))
    }
}

/// Timers used by the lifecycle host and the installer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub poll_interval: Duration,
    pub stop_grace: Duration,
    pub download_timeout: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            stop_grace: DEFAULT_STOP_GRACE,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
        }
    }
}

impl Timings {
    /// Resolves timers from the run file; `poll_override` comes from the CLI
    /// and wins over the file.
    ///
    /// # Errors
    ///
    /// Returns an error when a duration cannot be parsed.
    pub fn from_run_file(run: &RunFile, poll_override: Option<Duration>) -> AppResult<Self> {
        let poll_interval = match poll_override {
            Some(value) => Some(value),
            None => resolve_duration(run.poll_interval.as_ref(), "poll-interval")?,
        };
        Ok(Self {
            poll_interval: poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL),
            stop_grace: resolve_duration(run.executor.stop_grace.as_ref(), "executor.stop-grace")?
                .unwrap_or(DEFAULT_STOP_GRACE),
            download_timeout: resolve_duration(
                run.executor.download_timeout.as_ref(),
                "executor.download-timeout",
            )?
            .unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT),
        })
    }
}

/// A zero ramp-up means all workers start at once and is treated as unset.
fn resolve_ramp_up(value: Option<&DurationValue>) -> AppResult<Option<Duration>> {
    value
        .map(|value| {
            value.to_duration_or_zero().map_err(|err| {
                AppError::config(ConfigError::InvalidDuration {
                    field: "load.ramp-up",
                    message: err.to_string(),
                })
            })
        })
        .transpose()
        .map(|ramp_up| ramp_up.filter(|ramp_up| !ramp_up.is_zero()))
}

fn resolve_duration(
    value: Option<&DurationValue>,
    field: &'static str,
) -> AppResult<Option<Duration>> {
    value
        .map(|value| {
            value.to_duration().map_err(|err| {
                AppError::config(ConfigError::InvalidDuration {
                    field,
                    message: err.to_string(),
                })
            })
        })
        .transpose()
}
