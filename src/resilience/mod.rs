//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to an external dependency:
//!     → circuit_breaker.rs (may the call proceed at all?)
//!     → timeouts.rs (enforce a deadline on the call)
//!     → On failure: retries.rs (retryable? retry with backoff.rs delays)
//!     → circuit_breaker.rs (record success / failure)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retries only on the data-collection path, never for recovery actions
//! - The breaker guard is explicit at each call site, not a wrapper

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use backoff::BackoffPolicy;
pub use circuit_breaker::{CircuitBreakerManager, CircuitHealth, CircuitOverview};
pub use retries::{retry_with_backoff, Retryable};
pub use timeouts::{with_deadline, DeadlineExceeded};
