use bon::bon;

use crate::{ForegroundError, ForegroundResult};
use std::time::Duration;

pub const DEFAULT_START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn validate_poll_interval(interval: Duration) -> ForegroundResult<Duration> {
    if interval.is_zero() {
        return Err(ForegroundError::InvalidConfig {
            reason: "poll interval cannot be zero".into(),
        });
    }
    if interval > Duration::from_secs(10) {
        return Err(ForegroundError::InvalidConfig {
            reason: "poll interval cannot be greater than 10 seconds".into(),
        });
    }
    Ok(interval)
}

fn validate_start_time_format(format: String) -> ForegroundResult<String> {
    if format.trim().is_empty() {
        return Err(ForegroundError::InvalidConfig {
            reason: "start time format cannot be empty".into(),
        });
    }
    Ok(format)
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Idle sleep of polling notification sources (X11) between empty polls.
    pub poll_interval: Duration,
    /// Let the bootstrap refresh report the tracker's own window.
    pub observe_self_on_start: bool,
    /// Fetch the command line of new snapshots on the blocking pool.
    pub enrich_command_line: bool,
    /// chrono format used to render process start times.
    pub start_time_format: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            observe_self_on_start: true,
            enrich_command_line: true,
            start_time_format: DEFAULT_START_TIME_FORMAT.to_owned(),
        }
    }
}

#[bon]
impl TrackerConfig {
    /// Creates a new tracker configuration using the builder pattern.
    ///
    /// # Example
    ///
    /// ```
    /// use foreground_tracker_core::TrackerConfig;
    /// use std::time::Duration;
    ///
    /// let config = TrackerConfig::builder()
    ///     .poll_interval(Duration::from_millis(50))
    ///     .unwrap()
    ///     .enrich_command_line(false)
    ///     .build();
    /// ```
    #[builder]
    pub fn new(
        #[builder(
            default = Duration::from_millis(100),
            with = |interval: Duration| -> Result<_, ForegroundError> {
                validate_poll_interval(interval)
            },
        )]
        poll_interval: Duration,
        #[builder(default = true)] observe_self_on_start: bool,
        #[builder(default = true)] enrich_command_line: bool,
        #[builder(
            default = DEFAULT_START_TIME_FORMAT.to_owned(),
            with = |format: String| -> Result<_, ForegroundError> {
                validate_start_time_format(format)
            },
        )]
        start_time_format: String,
    ) -> Self {
        Self {
            poll_interval,
            observe_self_on_start,
            enrich_command_line,
            start_time_format,
        }
    }
}
