//! Retry policy with exponential backoff.
//!
//! The delay before retry `n` (0-based) is `min(initial_delay * multiplier^n, max_delay)`,
//! plus a uniform jitter in `[0, 500ms]` when enabled. A server-supplied
//! retry hint replaces the computed delay for that attempt.

use rand::Rng;
use std::time::Duration;

use crate::errors::GenaiError;

/// Upper bound of the random offset added to each computed delay.
pub const MAX_JITTER: Duration = Duration::from_millis(500);

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Growth factor per retry. Values below 1 are treated as 1.
    pub multiplier: f64,
    /// Cap on the computed delay.
    pub max_delay: Duration,
    /// Add up to [`MAX_JITTER`] of random delay.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            multiplier: 2.0,
            max_delay: Duration::from_millis(10_000),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Creates a configuration with no retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Backoff for retry `attempt` (0-based) before jitter.
    #[must_use]
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let factor = self.multiplier.max(1.0).powi(exponent);
        let seconds = (self.initial_delay.as_secs_f64() * factor).min(self.max_delay.as_secs_f64());
        Duration::try_from_secs_f64(seconds).unwrap_or(self.max_delay)
    }

    /// Delay actually slept before retry `attempt`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(hint) = retry_after {
            return hint;
        }
        let base = self.base_delay(attempt);
        if self.jitter {
            let jitter_ms = rand::rng().random_range(0..=MAX_JITTER.as_millis() as u64);
            base + Duration::from_millis(jitter_ms)
        } else {
            base
        }
    }
}

/// Retry bookkeeping for one logical call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    attempt: u32,
    delay: Duration,
}

impl RetryState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Retries performed so far.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// The most recently computed delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Decides whether to retry after `error`, returning the delay to wait.
    ///
    /// Returns `None` when the error is not retryable, the retry budget is
    /// spent, or `output_delivered` is set (a stream already handed text to
    /// the caller).
    pub fn next_delay(
        &mut self,
        config: &RetryConfig,
        error: &GenaiError,
        output_delivered: bool,
    ) -> Option<Duration> {
        if output_delivered || !error.is_retryable() || self.attempt >= config.max_retries {
            return None;
        }
        self.delay = config.delay_for(self.attempt, error.retry_after());
        self.attempt += 1;
        Some(self.delay)
    }
}
