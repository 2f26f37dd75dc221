//! Retry policy shared by components that re-issue failed host requests.

use std::time::Duration;

use crate::error::{Error, Result};

/// Bounds and pacing for re-issuing a failed request.
///
/// `max_attempts` counts consecutive attempts, the first one included; `None`
/// retries forever. Delays grow exponentially from `base_delay_ms` and are
/// capped at `max_delay_ms`. The default retries forever with no delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: Option<u32>,
    base_delay_ms: u64,
    max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts: None,
            base_delay_ms,
            max_delay_ms,
        }
    }

    /// Retry forever, immediately
    pub fn immediate() -> Self {
        Self::new(0, 0)
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    pub fn base_delay_ms(&self) -> u64 {
        self.base_delay_ms
    }

    pub fn max_delay_ms(&self) -> u64 {
        self.max_delay_ms
    }

    /// Whether another attempt is allowed after `attempts` consecutive failures
    pub fn allows_retry(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max)
    }

    /// Delay before the retry that follows `failures` consecutive failures
    pub fn delay_for_attempt(&self, failures: u32) -> Duration {
        let shift = failures.saturating_sub(1).min(20);
        let multiplier = 1_u64 << shift;
        let bounded = self
            .base_delay_ms
            .saturating_mul(multiplier)
            .min(self.max_delay_ms);
        Duration::from_millis(bounded)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == Some(0) {
            return Err(Error::Config(
                "Retry policy max_attempts must be at least 1".to_string(),
            ));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(Error::Config(format!(
                "Retry policy max delay ({}ms) is below its base delay ({}ms)",
                self.max_delay_ms, self.base_delay_ms
            )));
        }
        Ok(())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::immediate()
    }
}
