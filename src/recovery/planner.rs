//! Recovery planning.
//!
//! Maps a failure type, its detected patterns and recent failure volume onto
//! an ordered list of [`RecoveryAction`]s. Planning is pure; nothing here
//! touches a collaborator.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::config::PlannerConfig;
use crate::recovery::actions::{CacheScope, RecoveryAction};
use crate::recovery::classifier::FailurePattern;

/// Failure classification of an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailureType {
    PipelineFailure,
    PerformanceRegression,
    ResourceExhaustion,
    ExternalDependencyFailure,
    BuildFailure,
    ManualRecovery,
    Unknown(String),
}

impl FailureType {
    pub fn parse(value: &str) -> Self {
        match value {
            "pipeline_failure" => FailureType::PipelineFailure,
            "performance_regression" => FailureType::PerformanceRegression,
            "resource_exhaustion" => FailureType::ResourceExhaustion,
            "external_dependency_failure" => FailureType::ExternalDependencyFailure,
            "build_failure" => FailureType::BuildFailure,
            "manual_recovery" => FailureType::ManualRecovery,
            other => FailureType::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FailureType::PipelineFailure => "pipeline_failure",
            FailureType::PerformanceRegression => "performance_regression",
            FailureType::ResourceExhaustion => "resource_exhaustion",
            FailureType::ExternalDependencyFailure => "external_dependency_failure",
            FailureType::BuildFailure => "build_failure",
            FailureType::ManualRecovery => "manual_recovery",
            FailureType::Unknown(name) => name,
        }
    }
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FailureType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Invocation context, read from the caller's free-form JSON object.
///
/// The raw value is kept for the audit log.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryContext {
    raw: Value,
    pub failing_services: Vec<String>,
    pub runner_type: Option<String>,
    pub concurrency_throttled: bool,
    pub storage_full: bool,
    pub state_store_throttled: bool,
    /// Fail the invocation when failure history cannot be fetched.
    pub require_failure_history: bool,
}

impl RecoveryContext {
    /// Parse `value`; services default to `[default_service]`.
    ///
    /// A flag is set when its key is present with any value other than
    /// `false` or `null`.
    pub fn from_value(value: Value, default_service: &str) -> Self {
        let flag = |keys: &[&str]| {
            keys.iter().any(|k| {
                value
                    .get(*k)
                    .map_or(false, |v| !v.is_null() && v.as_bool() != Some(false))
            })
        };

        let failing_services = match value.get("failing_services") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(service)) => vec![service.clone()],
            _ => vec![default_service.to_string()],
        };

        Self {
            failing_services,
            runner_type: value
                .get("runner_type")
                .and_then(Value::as_str)
                .map(str::to_string),
            concurrency_throttled: flag(&["lambda_throttling", "concurrency_throttled"]),
            storage_full: flag(&["storage_full"]),
            state_store_throttled: flag(&["dynamodb_throttling", "state_store_throttled"]),
            require_failure_history: value
                .get("require_failure_history")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            raw: value,
        }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// Ordered steps for one invocation.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RecoveryPlan {
    pub steps: Vec<RecoveryAction>,
}

impl RecoveryPlan {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RecoveryPlanner {
    config: PlannerConfig,
    cleanup_age_days: i64,
}

impl RecoveryPlanner {
    pub fn new(config: PlannerConfig, cleanup_age_days: i64) -> Self {
        Self {
            config,
            cleanup_age_days,
        }
    }

    pub fn plan(
        &self,
        failure_type: &FailureType,
        patterns: &BTreeSet<FailurePattern>,
        recent_failure_count: usize,
        context: &RecoveryContext,
    ) -> RecoveryPlan {
        let steps = match failure_type {
            FailureType::PipelineFailure => self.pipeline_failure(patterns, recent_failure_count),
            FailureType::PerformanceRegression => vec![
                RecoveryAction::ScaleFunctions {
                    factor: self.config.scale_factor,
                },
                RecoveryAction::ClearCache {
                    scope: CacheScope::Metrics,
                },
                RecoveryAction::RecalculateBaseline,
            ],
            FailureType::ResourceExhaustion => self.resource_exhaustion(context),
            FailureType::ExternalDependencyFailure => context
                .failing_services
                .iter()
                .map(|service| RecoveryAction::ProbeDependency {
                    service: service.clone(),
                })
                .collect(),
            FailureType::BuildFailure => self.build_failure(context),
            FailureType::ManualRecovery | FailureType::Unknown(_) => {
                vec![RecoveryAction::UnrecognizedFailureType {
                    name: failure_type.as_str().to_string(),
                }]
            }
        };

        tracing::debug!(
            failure_type = %failure_type,
            steps = steps.len(),
            "Built recovery plan"
        );
        RecoveryPlan { steps }
    }

    fn pipeline_failure(
        &self,
        patterns: &BTreeSet<FailurePattern>,
        recent_failure_count: usize,
    ) -> Vec<RecoveryAction> {
        let mut steps = basic_pipeline_recovery();

        if recent_failure_count < self.config.comprehensive_threshold {
            tracing::info!(recent_failure_count, "Isolated failure, attempting basic recovery");
            return steps;
        }

        tracing::info!(
            recent_failure_count,
            patterns = ?patterns,
            "Multiple recent failures, initiating comprehensive recovery"
        );
        for pattern in patterns {
            match pattern {
                FailurePattern::Timeout => steps.extend([
                    RecoveryAction::IncreaseWorkflowTimeout,
                    RecoveryAction::OptimizeSlowTests,
                    RecoveryAction::ParallelizeTests,
                ]),
                FailurePattern::Dependency => steps.extend([
                    RecoveryAction::ClearCache {
                        scope: CacheScope::Dependency,
                    },
                    RecoveryAction::RefreshLockFiles,
                    RecoveryAction::PinDependencyVersions,
                ]),
                FailurePattern::Resource => steps.extend([
                    RecoveryAction::ScaleRunnerResources,
                    RecoveryAction::ParallelizeBuild,
                    RecoveryAction::OptimizeResourceAllocation,
                ]),
            }
        }
        steps
    }

    fn resource_exhaustion(&self, context: &RecoveryContext) -> Vec<RecoveryAction> {
        let mut steps = Vec::new();
        if context.concurrency_throttled {
            steps.push(RecoveryAction::RaiseConcurrency);
        }
        if context.storage_full {
            steps.push(RecoveryAction::CleanupStorage {
                older_than_days: self.cleanup_age_days,
            });
        }
        if context.state_store_throttled {
            steps.push(RecoveryAction::RaiseStorageCapacity);
        }
        steps
    }

    fn build_failure(&self, context: &RecoveryContext) -> Vec<RecoveryAction> {
        let mut steps = vec![RecoveryAction::ClearCache {
            scope: CacheScope::Build,
        }];
        if context.runner_type.as_deref() == Some(self.config.problematic_runner_image.as_str()) {
            steps.push(RecoveryAction::SwitchRunnerImage {
                from: self.config.problematic_runner_image.clone(),
                to: self.config.fallback_runner_image.clone(),
            });
        }
        steps.push(RecoveryAction::AnalyzeDependencyConflicts);
        steps
    }
}

fn basic_pipeline_recovery() -> Vec<RecoveryAction> {
    vec![
        RecoveryAction::RestartWorkflow,
        RecoveryAction::ClearCache {
            scope: CacheScope::Temporary,
        },
        RecoveryAction::ValidateEnvironment,
    ]
}
