//! Bounded retries with exponential backoff for calls to the anchoring
//! medium.
//!
//! ```text
//! delay(attempt) = min(initial * 2^(attempt-1), max)
//! ```
//!
//! Every attempt runs under its own timeout.  Errors that are not
//! retryable stop the loop at once; the rest are retried until
//! `max_attempts` is reached.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use vcp_contracts::error::{VcpError, VcpResult};
use vcp_core::config::AnchorConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first; at least 1.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &AnchorConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.backoff_initial_ms),
            max_delay: Duration::from_millis(config.backoff_max_ms),
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-indexed).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

/// A successful call and how many attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are used up.  The last error is returned on failure,
/// along with the number of attempts made.
pub async fn retry_with_backoff<F, Fut, T>(
    policy: &RetryPolicy,
    operation: &str,
    attempt_timeout: Duration,
    mut op: F,
) -> Result<Attempted<T>, (VcpError, u32)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = VcpResult<T>>,
{
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let error = match tokio::time::timeout(attempt_timeout, op()).await {
            Ok(Ok(value)) => return Ok(Attempted { value, attempts }),
            Ok(Err(e)) => e,
            Err(_) => VcpError::Timeout {
                operation: operation.to_string(),
                after_ms: attempt_timeout.as_millis() as u64,
            },
        };

        if !error.is_retryable() || attempts >= policy.max_attempts {
            return Err((error, attempts));
        }

        let delay = policy.delay_after(attempts);
        warn!(
            operation,
            attempt = attempts,
            max_attempts = policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "retrying after failure"
        );
        tokio::time::sleep(delay).await;
    }
}
