//! Invocation-level errors.
//!
//! Only these stop an invocation. Collaborator errors that the subsystem can
//! absorb never reach this type.

use crate::vcs::VcsError;

#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    /// Required setting or credential missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Failure history was required but the hosting API could not supply it.
    #[error("dependency API error: {0}")]
    DependencyApi(#[from] VcsError),

    /// Orchestration failed irrecoverably.
    #[error("recovery failed: {0}")]
    Recovery(String),

    #[error("invalid invocation event: {0}")]
    InvalidEvent(String),
}

impl RecoveryError {
    pub fn status_code(&self) -> u16 {
        match self {
            RecoveryError::Configuration(_) | RecoveryError::Recovery(_) => 500,
            RecoveryError::DependencyApi(_) => 502,
            RecoveryError::InvalidEvent(_) => 400,
        }
    }

    /// Short label used in response bodies.
    pub fn summary(&self) -> &'static str {
        match self {
            RecoveryError::Configuration(_) => "Recovery system misconfigured",
            RecoveryError::DependencyApi(_) => "Failure history unavailable",
            RecoveryError::Recovery(_) => "Automated recovery failed",
            RecoveryError::InvalidEvent(_) => "Invalid invocation event",
        }
    }
}
