//! Bounded exponential-backoff retry for remote calls.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::domain::errors::RemoteStoreError;
use crate::domain::models::config::RetryConfig;

/// Retry policy with exponential backoff.
///
/// The delay before retry `n` is `base_delay_ms * 2^(n-1)`, capped at
/// `max_delay_ms`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound on the backoff delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 5000,
        }
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        assert!(max_attempts >= 1, "max_attempts must be at least 1");
        Self {
            max_attempts,
            base_delay_ms,
            max_delay_ms,
        }
    }

    /// Delay before the retry following failed attempt `attempt` (1-based).
    fn backoff(&self, attempt: u32) -> Duration {
        let delay_ms = self
            .base_delay_ms
            .saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1)))
            .min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Runs remote operations under a [`RetryPolicy`].
///
/// Retry is applied uniformly to reads and writes; the layer does not
/// distinguish idempotent from non-idempotent operations.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Attempt the operation up to `max_attempts` times.
    ///
    /// Each transient failure short of the last attempt logs a warning and
    /// backs off; the final failure logs an error and propagates. Permission
    /// denials and other permanent failures are returned immediately.
    pub async fn execute<F, Fut, T>(
        &self,
        operation: &str,
        mut attempt_fn: F,
    ) -> Result<T, RemoteStoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteStoreError>>,
    {
        let mut attempt: u32 = 1;
        loop {
            match attempt_fn().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_transient() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.backoff(attempt);
                    warn!(
                        operation,
                        attempt,
                        delay = ?delay,
                        error = %err,
                        "transient failure, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_transient() {
                        error!(operation, attempt, error = %err, "giving up after final attempt");
                    } else {
                        debug!(operation, error = %err, "permanent failure, not retrying");
                    }
                    return Err(err);
                }
            }
        }
    }
}
