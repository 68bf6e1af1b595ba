//! Resubmission delays for tasks that failed transiently.
//!
//! The n-th resubmission of a task waits `initial_delay × multiplier^n`,
//! capped at `max_delay`, plus up to 25% random jitter so that tasks lost
//! together do not come back together.

use rand::Rng;
use std::time::Duration;

/// How often and how late a transiently failed task is resubmitted.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Resubmissions allowed after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound of any delay (before jitter).
    pub max_delay: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
    /// Add jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of retries.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the first delay.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the delay cap.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enables or disables jitter.
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }
}

/// Resubmission state of one task.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    config: RetryConfig,
    attempt: u32,
}

impl ExponentialBackoff {
    /// State of a task not yet resubmitted.
    pub fn new(config: RetryConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Delay before the next resubmission, or `None` once the task has
    /// used all of them.
    ///
    /// ```
    /// use hazard_engine::scheduler::retry::{ExponentialBackoff, RetryConfig};
    /// use std::time::Duration;
    ///
    /// let config = RetryConfig::new()
    ///     .max_retries(2)
    ///     .initial_delay(Duration::from_millis(10))
    ///     .jitter(false);
    /// let mut backoff = ExponentialBackoff::new(config);
    /// assert_eq!(backoff.next_delay(), Some(Duration::from_millis(10)));
    /// assert_eq!(backoff.next_delay(), Some(Duration::from_millis(20)));
    /// assert_eq!(backoff.next_delay(), None);
    /// ```
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.config.max_retries {
            return None;
        }
        let delay = self.calculate_delay();
        self.attempt += 1;
        Some(delay)
    }

    fn calculate_delay(&self) -> Duration {
        let base = self.config.initial_delay.as_secs_f64();
        let multiplied = base * self.config.multiplier.powi(self.attempt as i32);
        let capped = multiplied.min(self.config.max_delay.as_secs_f64());
        let secs = if self.config.jitter {
            capped + capped * 0.25 * rand::thread_rng().gen::<f64>()
        } else {
            capped
        };
        Duration::from_secs_f64(secs)
    }
}
