//! Retry Policy for Block Writes
//!
//! Exponential backoff bounded two ways: a cap on the number of attempts
//! and a budget on total elapsed time across a task's retries. Workers
//! consult the policy between attempts; permanent errors are never
//! retried.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum total attempts per task (first try included).
    pub max_attempts: u32,

    /// Backoff before the first retry.
    pub initial_backoff: Duration,

    /// Cap on any single backoff sleep.
    pub max_backoff: Duration,

    /// Exponential growth factor.
    pub multiplier: f64,

    /// Budget on total elapsed time across a task's attempts; once spent,
    /// the task is failed as exhausted even if attempts remain.
    pub backoff_limit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
            backoff_limit: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `retry` (0-indexed):
    /// `initial * multiplier^retry`, capped at `max_backoff`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let millis = self.initial_backoff.as_millis() as f64 * self.multiplier.powi(retry as i32);
        Duration::from_millis(millis as u64).min(self.max_backoff)
    }
}
