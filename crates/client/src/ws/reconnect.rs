//! Exponential backoff for reconnect attempts.

use std::time::Duration;

use rand::Rng;

use crate::config::ReconnectConfig;

/// What to do after a connection was lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Reconnect after `delay`; `attempt` is the new attempt count.
    Retry { attempt: u32, delay: Duration },
    /// Attempts are used up.
    GiveUp,
}

#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
}

impl ReconnectPolicy {
    pub fn new(config: ReconnectConfig) -> Self {
        Self { config }
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// `min(initial * 2^(attempt-1), max)`. Attempt 0 is treated as 1.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.config
            .initial_delay
            .saturating_mul(factor)
            .min(self.config.max_delay)
    }

    /// Base delay with the configured jitter applied, still capped.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if self.config.jitter <= 0.0 {
            return base;
        }
        let spread = self.config.jitter.min(1.0);
        let factor = rand::thread_rng().gen_range((1.0 - spread)..=(1.0 + spread));
        base.mul_f64(factor).min(self.config.max_delay)
    }

    /// Decide the next step given how many attempts were already made.
    pub fn next(&self, attempts_so_far: u32) -> RetryDecision {
        if attempts_so_far >= self.config.max_attempts {
            return RetryDecision::GiveUp;
        }
        let attempt = attempts_so_far + 1;
        RetryDecision::Retry {
            attempt,
            delay: self.delay(attempt),
        }
    }
}
