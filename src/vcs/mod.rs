//! Failure history from the version-control host.
//!
//! # Data Flow
//! ```text
//! RecoveryExecutor
//!     → circuit breaker check ("github")
//!     → FailureHistoryProvider::recent_failures(since)
//!         → github.rs list_runs(status=failure, created>since, page N)
//!         → each page retried with backoff on transient errors
//!     → Vec<FailureRecord> for the classifier
//! ```
//!
//! # Design Decisions
//! - Records are read-only snapshots; nothing here is cached
//! - HTTP status codes map onto distinct error variants so callers can tell
//!   a bad credential from a rate limit

pub mod github;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::resilience::Retryable;

pub use github::{GithubClient, RunPage};

/// One failed pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub timestamp: DateTime<Utc>,
    pub conclusion: String,
    pub commit_message: String,
}

/// Errors from the version-control hosting API.
#[derive(Debug, Clone, thiserror::Error)]
pub enum VcsError {
    #[error("credential rejected (401)")]
    Unauthorized,

    #[error("rate limited ({0})")]
    RateLimited(u16),

    #[error("repository not found (404)")]
    NotFound,

    #[error("request timed out")]
    Timeout,

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("circuit open for {0}")]
    CircuitOpen(String),
}

impl VcsError {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => VcsError::Unauthorized,
            403 | 429 => VcsError::RateLimited(status),
            404 => VcsError::NotFound,
            other => VcsError::Status(other),
        }
    }
}

impl From<reqwest::Error> for VcsError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            VcsError::Timeout
        } else if e.is_decode() {
            VcsError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            VcsError::from_status(status.as_u16())
        } else {
            VcsError::Transport(e.to_string())
        }
    }
}

impl Retryable for VcsError {
    fn is_retryable(&self) -> bool {
        match self {
            VcsError::Timeout | VcsError::Transport(_) => true,
            VcsError::Status(code) => *code >= 500,
            _ => false,
        }
    }
}

/// Source of recent failure records for the monitored pipeline.
#[async_trait]
pub trait FailureHistoryProvider: Send + Sync {
    async fn recent_failures(&self, since: DateTime<Utc>) -> Result<Vec<FailureRecord>, VcsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(VcsError::from_status(401), VcsError::Unauthorized));
        assert!(matches!(VcsError::from_status(403), VcsError::RateLimited(403)));
        assert!(matches!(VcsError::from_status(404), VcsError::NotFound));
        assert!(matches!(VcsError::from_status(502), VcsError::Status(502)));
    }

    #[test]
    fn test_retryable_classes() {
        assert!(VcsError::Timeout.is_retryable());
        assert!(VcsError::Status(503).is_retryable());
        assert!(!VcsError::Status(422).is_retryable());
        assert!(!VcsError::Unauthorized.is_retryable());
        assert!(!VcsError::RateLimited(403).is_retryable());
    }
}
