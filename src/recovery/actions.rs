//! Recovery action vocabulary.
//!
//! A [`RecoveryAction`] is what the planner decides; an [`ActionRecord`] is
//! what the executor reports after carrying it out. Human-readable prose is
//! produced only through `Display`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Broad category of a remediation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Restart,
    Scale,
    ClearCache,
    Notify,
    Rollback,
    BypassStep,
    /// Pipeline or runner settings change.
    Configure,
    /// Read-only check of an environment or dependency.
    Probe,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Restart => "restart",
            ActionKind::Scale => "scale",
            ActionKind::ClearCache => "clear_cache",
            ActionKind::Notify => "notify",
            ActionKind::Rollback => "rollback",
            ActionKind::BypassStep => "bypass_step",
            ActionKind::Configure => "configure",
            ActionKind::Probe => "probe",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheScope {
    Temporary,
    Dependency,
    Metrics,
    Build,
}

/// One planned remediation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RecoveryAction {
    RestartWorkflow,
    ClearCache { scope: CacheScope },
    ValidateEnvironment,
    IncreaseWorkflowTimeout,
    OptimizeSlowTests,
    ParallelizeTests,
    RefreshLockFiles,
    PinDependencyVersions,
    ScaleRunnerResources,
    ParallelizeBuild,
    OptimizeResourceAllocation,
    /// Multiply the memory of the pipeline's functions by `factor`.
    ScaleFunctions { factor: f64 },
    RecalculateBaseline,
    RaiseConcurrency,
    /// Delete stored objects at least `older_than_days` old.
    CleanupStorage { older_than_days: i64 },
    RaiseStorageCapacity,
    /// Probe `service` and feed the result to its circuit breaker.
    ProbeDependency { service: String },
    SwitchRunnerImage { from: String, to: String },
    AnalyzeDependencyConflicts,
    UnrecognizedFailureType { name: String },
}

impl RecoveryAction {
    pub fn kind(&self) -> ActionKind {
        use RecoveryAction::*;
        match self {
            RestartWorkflow => ActionKind::Restart,
            ScaleRunnerResources
            | OptimizeResourceAllocation
            | ScaleFunctions { .. }
            | RaiseConcurrency
            | RaiseStorageCapacity => ActionKind::Scale,
            ClearCache { .. } | RefreshLockFiles | CleanupStorage { .. } => ActionKind::ClearCache,
            IncreaseWorkflowTimeout
            | OptimizeSlowTests
            | ParallelizeTests
            | ParallelizeBuild
            | PinDependencyVersions
            | SwitchRunnerImage { .. }
            | RecalculateBaseline => ActionKind::Configure,
            ValidateEnvironment | ProbeDependency { .. } | AnalyzeDependencyConflicts => {
                ActionKind::Probe
            }
            UnrecognizedFailureType { .. } => ActionKind::Notify,
        }
    }
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use RecoveryAction::*;
        match self {
            RestartWorkflow => f.write_str("Restarting failed workflow"),
            ClearCache { scope } => match scope {
                CacheScope::Temporary => f.write_str("Clearing temporary caches"),
                CacheScope::Dependency => f.write_str("Clearing dependency cache"),
                CacheScope::Metrics => f.write_str("Clearing metrics cache"),
                CacheScope::Build => {
                    f.write_str("Clearing build cache to resolve potential cache corruption")
                }
            },
            ValidateEnvironment => f.write_str("Validating runner environment"),
            IncreaseWorkflowTimeout => f.write_str("Increasing workflow timeout limits"),
            OptimizeSlowTests => f.write_str("Optimizing slow test suites"),
            ParallelizeTests => f.write_str("Implementing test parallelization"),
            RefreshLockFiles => f.write_str("Updating package lock files"),
            PinDependencyVersions => f.write_str("Testing with pinned dependency versions"),
            ScaleRunnerResources => f.write_str("Scaling up runner resources"),
            ParallelizeBuild => f.write_str("Implementing build parallelization"),
            OptimizeResourceAllocation => f.write_str("Optimizing resource allocation"),
            ScaleFunctions { factor } => write!(
                f,
                "Scaling up function memory by {}x for performance-critical functions",
                factor
            ),
            RecalculateBaseline => f.write_str("Triggering performance baseline recalculation"),
            RaiseConcurrency => f.write_str("Increasing function provisioned concurrency"),
            CleanupStorage { older_than_days } => write!(
                f,
                "Cleaning up monitoring data older than {} days",
                older_than_days
            ),
            RaiseStorageCapacity => f.write_str("Temporarily increasing state store capacity"),
            ProbeDependency { service } => write!(f, "Probing availability of {}", service),
            SwitchRunnerImage { from, to } => {
                write!(f, "Retrying build with {} runner instead of {}", to, from)
            }
            AnalyzeDependencyConflicts => f.write_str("Analyzing dependency conflicts"),
            UnrecognizedFailureType { name } => write!(f, "Unknown failure type: {}", name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Succeeded,
    Failed,
}

/// Outcome of one executed step. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub kind: ActionKind,
    pub description: String,
    pub status: ActionStatus,
    pub timestamp: DateTime<Utc>,
}

impl ActionRecord {
    pub fn succeeded(kind: ActionKind, description: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            kind,
            description: description.into(),
            status: ActionStatus::Succeeded,
            timestamp: at,
        }
    }

    pub fn failed(kind: ActionKind, description: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            kind,
            description: description.into(),
            status: ActionStatus::Failed,
            timestamp: at,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Succeeded
    }
}

/// True when at least one action ran and none failed.
pub fn overall_success(records: &[ActionRecord]) -> bool {
    !records.is_empty() && records.iter().all(ActionRecord::is_success)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_kinds() {
        assert_eq!(RecoveryAction::RestartWorkflow.kind(), ActionKind::Restart);
        assert_eq!(
            RecoveryAction::ScaleFunctions { factor: 1.5 }.kind(),
            ActionKind::Scale
        );
        assert_eq!(
            RecoveryAction::SwitchRunnerImage {
                from: "a".into(),
                to: "b".into()
            }
            .kind(),
            ActionKind::Configure
        );
        assert_eq!(RecoveryAction::IncreaseWorkflowTimeout.kind(), ActionKind::Configure);
        assert_eq!(RecoveryAction::PinDependencyVersions.kind(), ActionKind::Configure);
        assert_eq!(
            RecoveryAction::ProbeDependency {
                service: "github".into()
            }
            .kind(),
            ActionKind::Probe
        );
        assert_eq!(ActionKind::Probe.as_str(), "probe");
    }

    #[test]
    fn test_display() {
        assert_eq!(
            RecoveryAction::UnrecognizedFailureType {
                name: "mystery".into()
            }
            .to_string(),
            "Unknown failure type: mystery"
        );
        assert_eq!(
            RecoveryAction::ClearCache {
                scope: CacheScope::Temporary
            }
            .to_string(),
            "Clearing temporary caches"
        );
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(RecoveryAction::CleanupStorage {
            older_than_days: 30,
        })
        .unwrap();
        assert_eq!(json["action"], "cleanup_storage");
        assert_eq!(json["older_than_days"], 30);
    }

    #[test]
    fn test_overall_success() {
        let now = Utc::now();
        assert!(!overall_success(&[]));
        assert!(overall_success(&[ActionRecord::succeeded(
            ActionKind::Restart,
            "ok",
            now
        )]));
        assert!(!overall_success(&[
            ActionRecord::succeeded(ActionKind::Restart, "ok", now),
            ActionRecord::failed(ActionKind::ClearCache, "storage cleanup failed", now),
        ]));
    }
}
