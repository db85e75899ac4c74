//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → RecoveryConfig (validated, immutable)
//!     → shared via ArcSwap with every invocation
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<RecoveryConfig>
//!     → the next invocation observes the new config
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CircuitBreakerConfig, ClassifierConfig, ComputeConfig, GithubConfig, LogFormat,
    NotificationConfig, ObservabilityConfig, PlannerConfig, ProbeConfig, RecoveryConfig,
    RetryConfig, ServerConfig, StorageConfig,
};
