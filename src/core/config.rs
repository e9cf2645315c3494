/*!
 * Watch Configuration
 *
 * Values consumed by the capture pipeline, plus the agent option-string parser
 * (`file=<path>,maxdelay=<ms>,buffer=<n>,verbose,daemons`).
 */

use super::errors::{Result, WatchError};
use super::limits::{DEFAULT_MAX_SAMPLING_DELAY, DEFAULT_RING_CAPACITY, MIN_RING_CAPACITY};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment override for the output path
pub const ENV_OUTPUT: &str = "THREADWATCH_OUTPUT";

/// Environment override for the maximum sampling delay in milliseconds
pub const ENV_MAX_DELAY_MS: &str = "THREADWATCH_MAX_DELAY_MS";

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Trace file written by the drain thread
    pub output_file: PathBuf,
    /// Hard ceiling on the delay between sampling passes
    pub max_delay: Duration,
    /// Emit diagnostic logging
    pub verbose: bool,
    /// Ring buffer slots (one is always kept free)
    pub buffer_capacity: usize,
    /// Track daemon threads as well
    pub include_daemon_threads: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            output_file: PathBuf::from("threadwatch.trace"),
            max_delay: DEFAULT_MAX_SAMPLING_DELAY,
            verbose: false,
            buffer_capacity: DEFAULT_RING_CAPACITY,
            include_daemon_threads: false,
        }
    }
}

impl WatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = path.into();
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn with_daemon_threads(mut self, include: bool) -> Self {
        self.include_daemon_threads = include;
        self
    }

    /// Parse an agent option string on top of the defaults
    ///
    /// An empty string yields the defaults. Unknown keys are rejected.
    pub fn from_options(options: &str) -> Result<Self> {
        let mut config = Self::default();

        for option in options.split(',').map(str::trim).filter(|o| !o.is_empty()) {
            let (key, value) = match option.split_once('=') {
                Some((key, value)) => (key.trim(), Some(value.trim())),
                None => (option, None),
            };

            match (key.to_ascii_lowercase().as_str(), value) {
                ("file", Some(path)) if !path.is_empty() => {
                    config.output_file = PathBuf::from(path);
                }
                ("maxdelay", Some(ms)) => {
                    config.max_delay = Duration::from_millis(parse_number(key, ms)?);
                }
                ("buffer", Some(slots)) => {
                    config.buffer_capacity = parse_number(key, slots)? as usize;
                }
                ("verbose", None) => config.verbose = true,
                ("verbose", Some(flag)) => config.verbose = parse_flag(key, flag)?,
                ("daemons", None) => config.include_daemon_threads = true,
                ("daemons", Some(flag)) => config.include_daemon_threads = parse_flag(key, flag)?,
                _ => {
                    return Err(WatchError::Configuration(
                        format!("unrecognized option '{}'", option).into(),
                    ))
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply `THREADWATCH_OUTPUT` / `THREADWATCH_MAX_DELAY_MS` overrides
    pub fn apply_env(mut self) -> Result<Self> {
        if let Ok(path) = std::env::var(ENV_OUTPUT) {
            if !path.is_empty() {
                self.output_file = PathBuf::from(path);
            }
        }

        if let Ok(ms) = std::env::var(ENV_MAX_DELAY_MS) {
            self.max_delay = Duration::from_millis(parse_number(ENV_MAX_DELAY_MS, &ms)?);
        }

        self.validate()?;
        Ok(self)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_delay.is_zero() {
            return Err(WatchError::Configuration(
                "maximum sampling delay must be greater than zero".into(),
            ));
        }

        if self.buffer_capacity < MIN_RING_CAPACITY {
            return Err(WatchError::InvalidCapacity {
                capacity: self.buffer_capacity,
                minimum: MIN_RING_CAPACITY,
            });
        }

        if self.output_file.as_os_str().is_empty() {
            return Err(WatchError::Configuration("output file must not be empty".into()));
        }

        Ok(())
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value.parse::<u64>().map_err(|e| {
        WatchError::Configuration(format!("invalid value '{}' for {}: {}", value, key, e).into())
    })
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(WatchError::Configuration(
            format!("invalid flag '{}' for {}", value, key).into(),
        )),
    }
}
