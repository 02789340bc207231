//! Bounded retry with exponential backoff
//!
//! One primitive shared by the page fetcher and the listing crawl, so every
//! network call obeys the same attempt budget.

use crate::config::FetchConfig;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// How many times to try an operation and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub attempts: u32,

    /// Delay before the first retry
    pub base_delay: Duration,

    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Builds the policy from the `[fetch]` section
    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(
            config.attempt_budget,
            Duration::from_millis(config.backoff_base_ms),
            Duration::from_millis(config.backoff_max_ms),
        )
    }

    /// A policy that retries immediately; used by tests
    pub fn immediate(attempts: u32) -> Self {
        Self::new(attempts, Duration::ZERO, Duration::ZERO)
    }

    /// Delay before retry number `retry` (0-based), doubling each time
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent
///
/// `op` receives the 1-based attempt number. The last error is returned when
/// the budget runs out.
///
/// # Example
///
/// ```
/// use gamevault::crawler::{retry_with_backoff, RetryPolicy};
///
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// let result: Result<u32, String> = rt.block_on(retry_with_backoff(
///     &RetryPolicy::immediate(3),
///     |_err: &String| true,
///     |attempt| async move {
///         if attempt < 3 { Err(format!("attempt {} failed", attempt)) } else { Ok(attempt) }
///     },
/// ));
/// assert_eq!(result, Ok(3));
/// ```
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    is_retryable: R,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: Display,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts && is_retryable(&e) => {
                let delay = policy.delay_for(attempt - 1);
                debug!(attempt, ?delay, error = %e, "Transient failure, retrying");
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
