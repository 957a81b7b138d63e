//! Job-level retry policy applied by the worker pool

use std::time::Duration;

/// Re-enqueue policy for failed jobs.
///
/// Separate from the store client's per-request retries: a job that still
/// fails after those is run again from scratch, up to `max_attempts` runs in
/// total, `delay` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// `attempt` is the 1-based number of the attempt that just failed
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_millis(5000))
    }
}
