use std::time::Duration;
use tokio::time::sleep;

/// Fixed pause between consecutive store operations
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RateGate {
    delay: Duration,
}

impl RateGate {
    /// Gate that waits `delay` before each operation
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Gate built from a millisecond setting
    pub fn from_millis(delay_ms: u64) -> Self {
        Self::new(Duration::from_millis(delay_ms))
    }

    /// Configured delay
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Suspend for the configured delay. A zero delay does not yield.
    pub async fn wait(&self) {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_wait_sleeps_for_delay() {
        let gate = RateGate::from_millis(250);
        let start = Instant::now();
        gate.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_is_immediate() {
        let gate = RateGate::default();
        let start = Instant::now();
        gate.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
