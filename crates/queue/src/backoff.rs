//! Delay between failed attempts of the same job.

use std::time::Duration;

/// Exponential backoff: `base * 2^retried`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBackoff {
    pub base: Duration,
    pub max: Duration,
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max: Duration::from_secs(300),
        }
    }
}

impl RetryBackoff {
    /// No delay between attempts.
    pub const IMMEDIATE: Self = Self {
        base: Duration::ZERO,
        max: Duration::ZERO,
    };

    /// Delay before the next attempt of a job that has failed `retried`
    /// times before the attempt that just failed.
    pub fn delay(&self, retried: u32) -> Duration {
        let factor = 2u32.saturating_pow(retried);
        self.base.saturating_mul(factor).min(self.max)
    }
}
