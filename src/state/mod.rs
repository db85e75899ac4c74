//! Persisted circuit state.
//!
//! # Data Flow
//! ```text
//! CircuitBreakerManager
//!     → get(service_name)   (None = never seen)
//!     → put(service_name, CircuitState)   (blind overwrite)
//! ```
//!
//! # Design Decisions
//! - One record per dependency name
//! - No conditional writes: concurrent read-modify-write cycles resolve
//!   last-writer-wins
//! - `expiry` is a garbage-collection hint for the backend only

pub mod file;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use file::FileCircuitStore;
pub use memory::MemoryCircuitStore;

/// Circuit position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerState::Closed => "CLOSED",
            BreakerState::Open => "OPEN",
            BreakerState::HalfOpen => "HALF_OPEN",
        }
    }
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored record for one dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitState {
    pub service_name: String,
    pub state: BreakerState,
    pub failure_count: u32,
    pub last_failure: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub expiry: DateTime<Utc>,
}

impl CircuitState {
    /// A fresh CLOSED record.
    pub fn closed(service_name: &str, now: DateTime<Utc>, expiry: DateTime<Utc>) -> Self {
        Self {
            service_name: service_name.to_string(),
            state: BreakerState::Closed,
            failure_count: 0,
            last_failure: None,
            last_success: Some(now),
            expiry,
        }
    }
}

/// Errors raised by a circuit state backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("state store unavailable: {0}")]
    Unavailable(String),

    #[error("state store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt state record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Key-value store holding one [`CircuitState`] per dependency.
#[async_trait]
pub trait CircuitStateStore: Send + Sync {
    async fn get(&self, service_name: &str) -> Result<Option<CircuitState>, StoreError>;

    async fn put(&self, service_name: &str, state: CircuitState) -> Result<(), StoreError>;

    /// Every stored record, ordered by service name.
    async fn list(&self) -> Result<Vec<CircuitState>, StoreError>;
}
