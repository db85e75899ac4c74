//! Fault-tolerant recovery for a CI/CD pipeline.
//!
//! Circuit breakers guard the failure-history API, a classifier tags recent
//! failures with patterns, a planner turns them into remediation steps and an
//! executor carries those out and writes an audit trail.

// Core recovery
pub mod error;
pub mod invocation;
pub mod recovery;

// Collaborators
pub mod compute;
pub mod notify;
pub mod secrets;
pub mod state;
pub mod storage;
pub mod vcs;

// Cross-cutting concerns
pub mod clock;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::RecoveryConfig;
pub use error::RecoveryError;
pub use http::HttpServer;
pub use invocation::{InvocationHandler, InvocationResponse};
pub use lifecycle::Shutdown;
pub use recovery::{Collaborators, RecoveryExecutor};
pub use resilience::CircuitBreakerManager;
