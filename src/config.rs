//! Run configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

/// How selected items reach the table
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Transform each item, then the engine writes the page back to the table
    #[default]
    Stream,
    /// Hand the whole page to a batch handler that does its own writing
    Batch,
}

/// Options for one migration run
///
/// Loadable from any `serde` format; every field except `table_name` has a default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Table to scan (and, in stream mode, to write back to)
    pub table_name: String,

    /// Execution mode (default: stream)
    #[serde(default)]
    pub mode: Mode,

    /// Pause before each page read, in milliseconds (default: 0)
    #[serde(default)]
    pub scan_delay_ms: u64,

    /// Pause before each batch write, in milliseconds (default: 0)
    #[serde(default)]
    pub write_delay_ms: u64,

    /// Extra counters initialized to zero for callbacks to increment
    #[serde(default)]
    pub custom_counters: Vec<String>,

    /// Write dead-letter entries to a report file at the end of the run (default: true)
    #[serde(default = "default_true")]
    pub persist_dead_letters: bool,

    /// Directory the dead-letter report is written to (default: working directory)
    #[serde(default = "default_dead_letter_dir")]
    pub dead_letter_dir: PathBuf,

    /// Suppress progress and summary logging (default: false)
    #[serde(default)]
    pub silent: bool,

    /// Run even when the table is not on on-demand capacity (default: false)
    #[serde(default)]
    pub force: bool,

    /// Maximum transforms in flight within one page (default: 10)
    #[serde(default = "default_transform_concurrency")]
    pub transform_concurrency: usize,

    /// Backoff applied to each write batch
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Backoff applied to page reads; `None` leaves retries to the store client
    #[serde(default)]
    pub scan_retry: Option<RetryPolicy>,
}

fn default_true() -> bool {
    true
}

fn default_dead_letter_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_transform_concurrency() -> usize {
    10
}

impl MigrationConfig {
    /// Stream-mode configuration for `table_name` with every default
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            mode: Mode::default(),
            scan_delay_ms: 0,
            write_delay_ms: 0,
            custom_counters: Vec::new(),
            persist_dead_letters: default_true(),
            dead_letter_dir: default_dead_letter_dir(),
            silent: false,
            force: false,
            transform_concurrency: default_transform_concurrency(),
            retry: RetryPolicy::default(),
            scan_retry: None,
        }
    }

    /// Set the execution mode
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the pause before each page read
    pub fn with_scan_delay(mut self, delay: Duration) -> Self {
        self.scan_delay_ms = millis(delay);
        self
    }

    /// Set the pause before each batch write
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay_ms = millis(delay);
        self
    }

    /// Declare custom counters
    pub fn with_custom_counters<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_counters = names.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable the dead-letter report file
    pub fn with_dead_letter_persistence(mut self, persist: bool) -> Self {
        self.persist_dead_letters = persist;
        self
    }

    /// Set the directory the dead-letter report is written to
    pub fn with_dead_letter_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dead_letter_dir = dir.into();
        self
    }

    /// Suppress progress and summary logging
    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Bypass the capacity-mode guard
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Set the number of transforms in flight within one page
    pub fn with_transform_concurrency(mut self, concurrency: usize) -> Self {
        self.transform_concurrency = concurrency;
        self
    }

    /// Set the write batch retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Retry page reads with `retry`
    pub fn with_scan_retry(mut self, retry: RetryPolicy) -> Self {
        self.scan_retry = Some(retry);
        self
    }

    /// Pause before each page read
    pub fn scan_delay(&self) -> Duration {
        Duration::from_millis(self.scan_delay_ms)
    }

    /// Pause before each batch write
    pub fn write_delay(&self) -> Duration {
        Duration::from_millis(self.write_delay_ms)
    }

    /// Check values that cannot be expressed in the types
    pub fn validate(&self) -> Result<()> {
        if self.table_name.trim().is_empty() {
            return Err(Error::config("table_name is required"));
        }

        if self.transform_concurrency == 0 {
            return Err(Error::config("transform_concurrency must be at least 1"));
        }

        check_factor("retry", &self.retry)?;
        if let Some(policy) = &self.scan_retry {
            check_factor("scan_retry", policy)?;
        }

        Ok(())
    }
}

fn check_factor(name: &str, policy: &RetryPolicy) -> Result<()> {
    if !policy.factor.is_finite() || policy.factor < 1.0 {
        return Err(Error::config(format!("{name}.factor must be a finite value >= 1")));
    }

    Ok(())
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
