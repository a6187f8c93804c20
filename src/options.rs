use std::time::Duration;

use crate::{RefineError, Result};

/// Largest accepted `max_retries`.
pub const MAX_RETRIES_LIMIT: usize = u32::MAX as usize;

/// Configures retry count and exponential backoff.
///
/// Immutable once built; construct through [`RetryPolicy::new`] so the
/// bounds below always hold.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    max_retries: usize,
    initial_delay: Duration,
    backoff_multiplier: f64,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1_000),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_millis(10_000),
        }
    }
}

impl RetryPolicy {
    /// Builds a policy, rejecting more than [`MAX_RETRIES_LIMIT`] retries, a
    /// zero initial delay, a multiplier below `1.0` and a cap smaller than
    /// the initial delay.
    pub fn new(
        max_retries: usize,
        initial_delay: Duration,
        backoff_multiplier: f64,
        max_delay: Duration,
    ) -> Result<Self> {
        if max_retries > MAX_RETRIES_LIMIT {
            return Err(RefineError::Config(format!(
                "max retries must not exceed {MAX_RETRIES_LIMIT}, got {max_retries}"
            )));
        }
        if initial_delay.is_zero() {
            return Err(RefineError::Config(
                "initial retry delay must be greater than zero".to_owned(),
            ));
        }
        if !backoff_multiplier.is_finite() || backoff_multiplier < 1.0 {
            return Err(RefineError::Config(format!(
                "backoff multiplier must be a finite value >= 1.0, got {backoff_multiplier}"
            )));
        }
        if max_delay < initial_delay {
            return Err(RefineError::Config(format!(
                "max retry delay ({max_delay:?}) must not be below initial delay ({initial_delay:?})"
            )));
        }
        Ok(Self {
            max_retries,
            initial_delay,
            backoff_multiplier,
            max_delay,
        })
    }

    /// Maximum number of retries after the initial attempt.
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Delay to wait before retry number `attempt` (1-based).
    ///
    /// `initial_delay * backoff_multiplier^(attempt - 1)`, kept within
    /// `[initial_delay, max_delay]`. No jitter.
    pub fn calculate_delay(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as usize) as i32;
        if exponent == 0 {
            return self.initial_delay;
        }

        let scaled = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        // f64 round-trips can land a nanosecond outside the bounds.
        Duration::from_secs_f64(scaled)
            .max(self.initial_delay)
            .min(self.max_delay)
    }
}
