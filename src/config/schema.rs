//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the recovery
//! service. All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the recovery service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RecoveryConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,

    /// Circuit breaker thresholds and state persistence.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Version-control hosting API (failure history source).
    pub github: GithubConfig,

    /// Retry policy for data-collection calls.
    pub retries: RetryConfig,

    /// Failure pattern detection thresholds.
    pub classifier: ClassifierConfig,

    /// Recovery planning knobs.
    pub planner: PlannerConfig,

    /// Compute resource scaling.
    pub compute: ComputeConfig,

    /// Object storage (audit log and cleanup target).
    pub storage: StorageConfig,

    /// Outcome notifications.
    pub notifications: NotificationConfig,

    /// Dependency availability probes.
    pub probes: ProbeConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Upper bound for a single invocation, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 300,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// When false every request is allowed.
    pub enabled: bool,

    /// Failures before the circuit opens.
    pub failure_threshold: u32,

    /// Seconds an open circuit waits before permitting a probe.
    pub timeout_secs: u64,

    /// Record expiry hint handed to the state store, in days.
    pub state_ttl_days: i64,

    /// Persist circuit state to this JSON file instead of memory.
    pub state_file: Option<String>,

    /// Deadline for each state store read or write, in milliseconds.
    pub store_timeout_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 5,
            timeout_secs: 60,
            state_ttl_days: 30,
            state_file: None,
            store_timeout_ms: 5_000,
        }
    }
}

/// Version-control hosting API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GithubConfig {
    /// API base URL.
    pub api_url: String,

    /// Repository owner.
    pub owner: String,

    /// Repository name.
    pub repo: String,

    /// Dependency name used for the circuit breaker.
    pub service_name: String,

    /// Secret id holding the bearer credential.
    pub token_secret_id: String,

    /// Runs per page.
    pub per_page: u32,

    /// Pages fetched per lookup.
    pub max_pages: u32,

    /// Failure history window.
    pub lookback_hours: i64,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl GithubConfig {
    /// `owner/repo`, as shown in notifications.
    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            owner: String::new(),
            repo: String::new(),
            service_name: "github".to_string(),
            token_secret_id: "github-token".to_string(),
            per_page: 20,
            max_pages: 1,
            lookback_hours: 24,
            request_timeout_secs: 30,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 8000,
        }
    }
}

/// Failure pattern thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Records with "timeout" in the conclusion needed for `timeout`.
    pub timeout_threshold: usize,

    /// Records with a dependency keyword needed for `dependency`.
    pub dependency_threshold: usize,

    /// Total records needed for `resource`.
    pub resource_threshold: usize,

    /// Keywords matched (case-insensitive) against commit messages.
    pub dependency_keywords: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            timeout_threshold: 2,
            dependency_threshold: 2,
            resource_threshold: 3,
            dependency_keywords: ["dependency", "package", "npm", "pip"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Recovery planner configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Recent failures at which pipeline recovery becomes comprehensive.
    pub comprehensive_threshold: usize,

    /// Memory multiplier applied on performance regressions.
    pub scale_factor: f64,

    /// Runner image known to cause build breakage.
    pub problematic_runner_image: String,

    /// Image to switch to when the problematic one is in use.
    pub fallback_runner_image: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            comprehensive_threshold: 3,
            scale_factor: 1.5,
            problematic_runner_image: "ubuntu-latest".to_string(),
            fallback_runner_image: "ubuntu-20.04".to_string(),
        }
    }
}

/// Compute scaling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ComputeConfig {
    /// Function suffixes; full names are `<owner>-<repo>-<suffix>`.
    pub function_suffixes: Vec<String>,

    /// Platform memory ceiling in MB.
    pub max_memory_mb: u32,

    /// Initial memory allocation per full function name (in-memory backend).
    pub functions: BTreeMap<String, u32>,

    /// Deadline for each configuration read or write, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            function_suffixes: vec![
                "pipeline-metrics-collector".to_string(),
                "performance-monitor".to_string(),
            ],
            max_memory_mb: 3008,
            functions: BTreeMap::new(),
            timeout_ms: 10_000,
        }
    }
}

/// Object storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory used as the bucket. Memory-backed when unset.
    pub root_dir: Option<String>,

    /// Key prefix for audit entries.
    pub audit_prefix: String,

    /// Key prefix scanned by cleanup ("" = whole bucket).
    pub cleanup_prefix: String,

    /// Objects at least this old are removed by cleanup.
    pub cleanup_age_days: i64,

    /// Keys per delete call (collaborator limit is 1000).
    pub delete_batch_size: usize,

    /// Deadline for each list, delete or put call, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: None,
            audit_prefix: "recovery-logs".to_string(),
            cleanup_prefix: String::new(),
            cleanup_age_days: 30,
            delete_batch_size: 1000,
            timeout_ms: 30_000,
        }
    }
}

/// Notification configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Topic the outcome is published to.
    pub topic: String,

    /// Webhook endpoint. Notifications are only logged when unset.
    pub webhook_url: Option<String>,

    /// Publish timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            topic: "ci-critical-alerts".to_string(),
            webhook_url: None,
            timeout_secs: 10,
        }
    }
}

/// Availability probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Health endpoint per dependency name.
    pub endpoints: BTreeMap<String, String>,

    /// Probe timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        let mut endpoints = BTreeMap::new();
        endpoints.insert(
            "github".to_string(),
            "https://api.github.com/rate_limit".to_string(),
        );
        Self {
            endpoints,
            timeout_secs: 10,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
