//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds > 0, batch sizes within limits)
//! - Check that URLs and socket addresses parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RecoveryConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::RecoveryConfig;
use crate::storage::MAX_DELETE_BATCH;

/// Ten years.
pub const MAX_STATE_TTL_DAYS: i64 = 3650;
/// One year.
pub const MAX_LOOKBACK_HOURS: i64 = 8760;
/// One hundred years.
pub const MAX_CLEANUP_AGE_DAYS: i64 = 36_500;
pub const MAX_BREAKER_TIMEOUT_SECS: u64 = i32::MAX as u64;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &RecoveryConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be > 0"));
    }

    let cb = &config.circuit_breaker;
    if cb.failure_threshold == 0 {
        errors.push(ValidationError::new("circuit_breaker.failure_threshold", "must be > 0"));
    }
    if cb.state_ttl_days <= 0 || cb.state_ttl_days > MAX_STATE_TTL_DAYS {
        errors.push(ValidationError::new(
            "circuit_breaker.state_ttl_days",
            format!("must be within 1..={}", MAX_STATE_TTL_DAYS),
        ));
    }
    if cb.timeout_secs > MAX_BREAKER_TIMEOUT_SECS {
        errors.push(ValidationError::new(
            "circuit_breaker.timeout_secs",
            format!("must be <= {}", MAX_BREAKER_TIMEOUT_SECS),
        ));
    }
    if cb.store_timeout_ms == 0 {
        errors.push(ValidationError::new("circuit_breaker.store_timeout_ms", "must be > 0"));
    }

    let gh = &config.github;
    if url::Url::parse(&gh.api_url).is_err() {
        errors.push(ValidationError::new(
            "github.api_url",
            format!("'{}' is not a URL", gh.api_url),
        ));
    }
    if gh.service_name.is_empty() {
        errors.push(ValidationError::new("github.service_name", "must not be empty"));
    }
    if gh.per_page == 0 || gh.per_page > 100 {
        errors.push(ValidationError::new("github.per_page", "must be within 1..=100"));
    }
    if gh.max_pages == 0 {
        errors.push(ValidationError::new("github.max_pages", "must be > 0"));
    }
    if gh.lookback_hours <= 0 || gh.lookback_hours > MAX_LOOKBACK_HOURS {
        errors.push(ValidationError::new(
            "github.lookback_hours",
            format!("must be within 1..={}", MAX_LOOKBACK_HOURS),
        ));
    }
    if gh.request_timeout_secs == 0 {
        errors.push(ValidationError::new("github.request_timeout_secs", "must be > 0"));
    }

    let retries = &config.retries;
    if retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be > 0"));
    }
    if retries.max_delay_ms < retries.base_delay_ms {
        errors.push(ValidationError::new(
            "retries.max_delay_ms",
            "must be >= retries.base_delay_ms",
        ));
    }

    let classifier = &config.classifier;
    if classifier.timeout_threshold == 0
        || classifier.dependency_threshold == 0
        || classifier.resource_threshold == 0
    {
        errors.push(ValidationError::new("classifier", "thresholds must be > 0"));
    }

    let planner = &config.planner;
    if !(planner.scale_factor > 1.0) || !planner.scale_factor.is_finite() {
        errors.push(ValidationError::new("planner.scale_factor", "must be a finite value > 1.0"));
    }
    if planner.comprehensive_threshold == 0 {
        errors.push(ValidationError::new("planner.comprehensive_threshold", "must be > 0"));
    }

    if config.compute.max_memory_mb == 0 {
        errors.push(ValidationError::new("compute.max_memory_mb", "must be > 0"));
    }
    if config.compute.timeout_ms == 0 {
        errors.push(ValidationError::new("compute.timeout_ms", "must be > 0"));
    }

    let storage = &config.storage;
    if storage.delete_batch_size == 0 || storage.delete_batch_size > MAX_DELETE_BATCH {
        errors.push(ValidationError::new(
            "storage.delete_batch_size",
            format!("must be within 1..={}", MAX_DELETE_BATCH),
        ));
    }
    if storage.cleanup_age_days <= 0 || storage.cleanup_age_days > MAX_CLEANUP_AGE_DAYS {
        errors.push(ValidationError::new(
            "storage.cleanup_age_days",
            format!("must be within 1..={}", MAX_CLEANUP_AGE_DAYS),
        ));
    }
    if storage.timeout_ms == 0 {
        errors.push(ValidationError::new("storage.timeout_ms", "must be > 0"));
    }
    if storage.audit_prefix.is_empty() {
        errors.push(ValidationError::new("storage.audit_prefix", "must not be empty"));
    }

    if let Some(webhook) = &config.notifications.webhook_url {
        if url::Url::parse(webhook).is_err() {
            errors.push(ValidationError::new(
                "notifications.webhook_url",
                format!("'{}' is not a URL", webhook),
            ));
        }
    }

    if config.notifications.timeout_secs == 0 {
        errors.push(ValidationError::new("notifications.timeout_secs", "must be > 0"));
    }
    if config.probes.timeout_secs == 0 {
        errors.push(ValidationError::new("probes.timeout_secs", "must be > 0"));
    }

    for (service, endpoint) in &config.probes.endpoints {
        if url::Url::parse(endpoint).is_err() {
            errors.push(ValidationError::new(
                "probes.endpoints",
                format!("endpoint for '{}' is not a URL", service),
            ));
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a socket address when metrics are enabled",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
