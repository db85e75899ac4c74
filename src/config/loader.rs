//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::RecoveryConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
///
/// Environment overrides are applied between parsing and validation.
pub fn load_config(path: &Path) -> Result<RecoveryConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: RecoveryConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Defaults plus environment overrides, validated. Used when no file is given.
pub fn load_from_env() -> Result<RecoveryConfig, ConfigError> {
    let mut config = RecoveryConfig::default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay the deployment environment variables onto `config`.
///
/// Unparseable numeric values are ignored with a warning.
pub fn apply_env_overrides<F>(config: &mut RecoveryConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("CIRCUIT_BREAKER_ENABLED") {
        config.circuit_breaker.enabled = v.eq_ignore_ascii_case("true");
    }
    if let Some(v) = lookup("CIRCUIT_BREAKER_FAILURE_THRESHOLD") {
        match v.parse() {
            Ok(n) => config.circuit_breaker.failure_threshold = n,
            Err(_) => tracing::warn!(value = %v, "Ignoring invalid CIRCUIT_BREAKER_FAILURE_THRESHOLD"),
        }
    }
    if let Some(v) = lookup("CIRCUIT_BREAKER_TIMEOUT") {
        match v.parse() {
            Ok(n) => config.circuit_breaker.timeout_secs = n,
            Err(_) => tracing::warn!(value = %v, "Ignoring invalid CIRCUIT_BREAKER_TIMEOUT"),
        }
    }
    if let Some(v) = lookup("GITHUB_OWNER") {
        config.github.owner = v;
    }
    if let Some(v) = lookup("GITHUB_REPO") {
        config.github.repo = v;
    }
    if let Some(v) = lookup("LOG_LEVEL") {
        config.observability.log_level = v.to_lowercase();
    }
}
