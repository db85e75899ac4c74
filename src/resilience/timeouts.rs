//! Timeout enforcement.
//!
//! Every call to an external collaborator goes through [`with_deadline`] so a
//! hung backend costs at most its deadline, never the whole invocation.

use std::future::Future;
use std::time::Duration;

/// A collaborator call that did not finish in time.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{operation} timed out after {after:?}")]
pub struct DeadlineExceeded {
    pub operation: String,
    pub after: Duration,
}

/// Await `fut`, giving up after `after`.
pub async fn with_deadline<T, F>(
    operation: &str,
    after: Duration,
    fut: F,
) -> Result<T, DeadlineExceeded>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(after, fut).await.map_err(|_| {
        tracing::warn!(operation, after = ?after, "Collaborator call timed out");
        DeadlineExceeded {
            operation: operation.to_string(),
            after,
        }
    })
}
