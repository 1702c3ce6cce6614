use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::error::Result;

/// Bounded exponential-backoff retry
///
/// The delay before retry `n` (0-based) is `initial_delay_ms * factor^n`, capped at
/// `max_delay_ms`. With the defaults an operation gets 8 attempts in total.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry (in milliseconds)
    pub initial_delay_ms: u64,
    /// Multiplier applied to the delay after each retry
    pub factor: f64,
    /// Maximum delay between attempts (in milliseconds)
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 7,
            initial_delay_ms: 100,
            factor: 2.0,
            max_delay_ms: 20_000,
        }
    }
}

impl RetryPolicy {
    /// Policy that makes a single attempt
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Total number of attempts, first one included
    ///
    /// Saturates at `u32::MAX`.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Calculate retry delay with exponential backoff
    ///
    /// # Arguments
    /// * `retry` - The retry number (0-based)
    pub fn retry_delay(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let delay_ms = self.initial_delay_ms as f64 * self.factor.powi(exponent);
        let capped_delay = delay_ms.min(self.max_delay_ms as f64);
        Duration::from_millis(capped_delay as u64)
    }

    /// Run `operation` until it succeeds or the attempts are exhausted
    ///
    /// `operation` receives the attempt number, starting at 1. Every error is retried; once
    /// the last attempt fails its error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 1;

        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) if attempt >= max_attempts => return Err(error),
                Err(error) => {
                    let delay = self.retry_delay(attempt - 1);
                    debug!(attempt, ?delay, %error, "attempt failed, backing off");
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
