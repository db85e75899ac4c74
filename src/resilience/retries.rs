//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether a failed call is worth repeating
//! - Execute retries with exponential backoff + jitter
//!
//! # Design Decisions
//! - Only data-collection calls are retried; recovery actions never are
//! - Timeouts, transport errors and 5xx are retryable; auth, rate-limit and
//!   not-found are not (repeating cannot change the answer)

use std::future::Future;

use crate::resilience::backoff::BackoffPolicy;

/// Errors that know whether a retry could help.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Run `op` until it succeeds, returns a non-retryable error, or the policy's
/// attempts are exhausted. The last error is returned.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &BackoffPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_attempts && e.is_retryable() => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    operation,
                    attempt,
                    delay = ?delay,
                    error = %e,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
