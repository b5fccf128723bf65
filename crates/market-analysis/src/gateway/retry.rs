//! Bounded retry with fixed backoff, longer when throttled.

use std::future::Future;
use std::time::Duration;

use crate::error::{AdvisorError, Result};

/// Retry schedule shared by every provider call that tolerates transient failures
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Pause between attempts for ordinary failures
    pub retry_delay: Duration,

    /// First pause after an HTTP 429
    pub throttle_delay: Duration,

    /// Upper bound for pauses after an HTTP 429
    pub max_throttle_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay: Duration::ZERO,
            throttle_delay: Duration::from_secs(5),
            max_throttle_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Default::default()
        }
    }

    /// Pause before the attempt that follows failed attempt number `attempt` (1-based)
    pub fn delay_for(&self, error: &AdvisorError, attempt: u32) -> Duration {
        if error.is_rate_limited() {
            let grown = self.throttle_delay + Duration::from_secs(u64::from(attempt.saturating_sub(1)));
            grown.min(self.max_throttle_delay)
        } else {
            self.retry_delay
        }
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the policy runs out
///
/// Exhaustion surfaces as [`AdvisorError::RetriesExhausted`] wrapping the last failure.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) if attempt >= max_attempts => {
                tracing::error!(operation, attempts = attempt, error = %e, "Giving up after retries");
                return Err(AdvisorError::RetriesExhausted {
                    operation: operation.to_string(),
                    attempts: attempt,
                    last: Box::new(e),
                });
            }
            Err(e) => {
                let delay = policy.delay_for(&e, attempt);
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts,
                    error = %e,
                    delay_secs = delay.as_secs(),
                    "Request failed, retrying"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
