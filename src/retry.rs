//! Retry with exponential backoff for throttled EMR calls
//!
//! The EMR API enforces per-account request-rate quotas, so every remote call
//! the cost engine makes goes through a backoff policy. Only errors tagged
//! retryable (throttling) are retried; data and configuration defects
//! propagate immediately.

use crate::error::{EmrCostError, IsRetryable, Result};
use std::time::Duration;
use tracing::{info, warn};

/// Retry policy trait
pub trait RetryPolicy: Send + Sync {
    /// Execute a fallible async operation under this policy.
    async fn execute_with_retry<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: std::future::Future<Output = Result<T>> + Send;
}

/// Exponential backoff: initial delay doubling per attempt, capped.
pub struct ExponentialBackoffPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    jitter_factor: f64,
}

impl ExponentialBackoffPolicy {
    /// Policy tuned for the EMR listing API: 1s initial wait doubling up to a
    /// 7s cap, bounded at 10 attempts so sustained throttling still
    /// terminates.
    pub fn for_emr_api() -> Self {
        Self::with_delays(10, Duration::from_secs(1), Duration::from_secs(7))
    }

    pub fn with_delays(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
            jitter_factor: 0.1,
        }
    }

    /// Backoff delay for the given attempt number, never above the cap.
    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let exponential = self.initial_delay.as_millis() as f64 * 2f64.powi(attempt as i32);
        let delay_ms = exponential.min(self.max_delay.as_millis() as f64);

        // Jitter to avoid thundering-herd retries against the shared quota
        let jitter = delay_ms * self.jitter_factor * fastrand::f64();
        let total_ms = (delay_ms + jitter).min(self.max_delay.as_millis() as f64);
        Duration::from_millis(total_ms as u64)
    }
}

impl RetryPolicy for ExponentialBackoffPolicy {
    async fn execute_with_retry<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: std::future::Future<Output = Result<T>> + Send,
    {
        for attempt in 0..self.max_attempts {
            match f().await {
                Ok(result) => {
                    if attempt > 0 {
                        info!("Operation succeeded after {} retries", attempt);
                    }
                    return Ok(result);
                }
                Err(e) => {
                    if !e.is_retryable() {
                        return Err(e);
                    }
                    if attempt == self.max_attempts - 1 {
                        warn!("Max retries ({}) reached", self.max_attempts);
                        return Err(EmrCostError::RetriesExhausted {
                            attempts: self.max_attempts,
                            source: Box::new(e),
                        });
                    }
                    let backoff = self.calculate_backoff(attempt);
                    warn!(
                        "Throttled (attempt {}/{}), retrying in {:?}: {}",
                        attempt + 1,
                        self.max_attempts,
                        backoff,
                        e
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        // Unreachable with max_attempts >= 1; treat 0 as exhausted
        Err(EmrCostError::RetriesExhausted {
            attempts: self.max_attempts,
            source: Box::new(EmrCostError::Throttling("no attempts made".to_string())),
        })
    }
}

/// Passthrough policy for operations that must not be retried.
pub struct NoRetryPolicy;

impl RetryPolicy for NoRetryPolicy {
    async fn execute_with_retry<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: std::future::Future<Output = Result<T>> + Send,
    {
        f().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_respects_the_cap() {
        let policy =
            ExponentialBackoffPolicy::with_delays(10, Duration::from_secs(1), Duration::from_secs(7));
        assert!(policy.calculate_backoff(0) >= Duration::from_secs(1));
        assert!(policy.calculate_backoff(1) >= Duration::from_secs(2));
        for attempt in 0..12 {
            assert!(policy.calculate_backoff(attempt) <= Duration::from_secs(7));
        }
    }
}
