//! Automated recovery.
//!
//! # Data Flow
//! ```text
//! FailureType + RecoveryContext
//!     → executor.rs
//!         → breaker-gated FailureHistoryProvider (pipeline failures)
//!         → classifier.rs (timeout / dependency / resource patterns)
//!         → planner.rs (ordered RecoveryAction list)
//!         → side effects: compute scaling, storage cleanup, probes
//!         → audit.rs (one JSON entry per invocation)
//!     → RecoveryReport (ActionRecords + overall success)
//! ```
//!
//! # Design Decisions
//! - Planning is pure; all I/O lives in the executor
//! - A failed step is recorded and the remaining steps still run
//! - Overall success is derived from per-action status, never from prose

pub mod actions;
pub mod audit;
pub mod classifier;
pub mod executor;
pub mod planner;
pub mod prober;

use std::sync::Arc;

use crate::clock::Clock;
use crate::compute::ResourceConfigService;
use crate::notify::NotificationSink;
use crate::secrets::SecretStore;
use crate::state::CircuitStateStore;
use crate::storage::ObjectStore;

pub use actions::{ActionKind, ActionRecord, ActionStatus, RecoveryAction};
pub use audit::AuditEntry;
pub use classifier::{classify, FailurePattern};
pub use executor::{RecoveryExecutor, RecoveryReport};
pub use planner::{FailureType, RecoveryContext, RecoveryPlan, RecoveryPlanner};
pub use prober::{AvailabilityProber, HttpProber, StaticProber};

/// External systems a recovery run talks to. Cheap to clone.
#[derive(Clone)]
pub struct Collaborators {
    pub circuit_store: Arc<dyn CircuitStateStore>,
    pub storage: Arc<dyn ObjectStore>,
    pub compute: Arc<dyn ResourceConfigService>,
    pub prober: Arc<dyn AvailabilityProber>,
    pub notifier: Arc<dyn NotificationSink>,
    pub secrets: Arc<dyn SecretStore>,
    pub clock: Arc<dyn Clock>,
}
