//! Circuit breaker for external dependencies.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: dependency assumed down, requests fail fast
//! - Half-Open: probing whether the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= threshold
//! Open → Half-Open: more than `timeout` since the last failure (on the next check)
//! Half-Open → Closed: a success is recorded
//! Half-Open → Open: a failure is recorded (count is already >= threshold)
//! ```
//!
//! # Design Decisions
//! - One breaker per dependency name, persisted through [`CircuitStateStore`]
//! - Every check while Half-Open permits a probe (continuous probing)
//! - Store errors never reach the caller: reads fall back to a CLOSED record,
//!   failed writes are logged and dropped
//! - Read-modify-write against the store is unguarded; last writer wins

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::clock::Clock;
use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;
use crate::resilience::timeouts::with_deadline;
use crate::state::{BreakerState, CircuitState, CircuitStateStore, StoreError};

/// Decides whether calls to a dependency may proceed and records outcomes.
#[derive(Clone)]
pub struct CircuitBreakerManager {
    store: Arc<dyn CircuitStateStore>,
    clock: Arc<dyn Clock>,
    config: CircuitBreakerConfig,
}

impl CircuitBreakerManager {
    pub fn new(
        store: Arc<dyn CircuitStateStore>,
        clock: Arc<dyn Clock>,
        config: CircuitBreakerConfig,
    ) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn failure_threshold(&self) -> u32 {
        self.config.failure_threshold
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Expiry hint for a record written at `now`. Saturates instead of
    /// overflowing.
    fn expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        Duration::try_days(self.config.state_ttl_days)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whether an open circuit last failed long enough ago to probe.
    fn timeout_elapsed(&self, last_failure: DateTime<Utc>) -> bool {
        let Some(timeout) = i64::try_from(self.config.timeout_secs)
            .ok()
            .and_then(Duration::try_seconds)
        else {
            return false;
        };
        self.clock.now().signed_duration_since(last_failure) > timeout
    }

    fn store_deadline(&self) -> StdDuration {
        StdDuration::from_millis(self.config.store_timeout_ms)
    }

    async fn load(&self, service_name: &str) -> Result<Option<CircuitState>, StoreError> {
        with_deadline("circuit_state_get", self.store_deadline(), self.store.get(service_name))
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
    }

    async fn save(&self, service_name: &str, state: CircuitState) -> Result<(), StoreError> {
        with_deadline(
            "circuit_state_put",
            self.store_deadline(),
            self.store.put(service_name, state),
        )
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?
    }

    fn default_state(&self, service_name: &str) -> CircuitState {
        let now = self.clock.now();
        CircuitState::closed(service_name, now, self.expiry(now))
    }

    /// Current record for `service_name`, or a default CLOSED record.
    pub async fn get_state(&self, service_name: &str) -> CircuitState {
        match self.load(service_name).await {
            Ok(Some(state)) => state,
            Ok(None) => self.default_state(service_name),
            Err(e) => {
                tracing::error!(service = %service_name, error = %e, "Error getting circuit state");
                self.default_state(service_name)
            }
        }
    }

    /// Close the circuit and clear the failure count.
    pub async fn record_success(&self, service_name: &str) {
        let current = self.get_state(service_name).await;
        let now = self.clock.now();

        let updated = CircuitState {
            state: BreakerState::Closed,
            failure_count: 0,
            last_success: Some(now),
            expiry: self.expiry(now),
            ..current.clone()
        };

        if let Err(e) = self.save(service_name, updated).await {
            tracing::error!(service = %service_name, error = %e, "Error recording success");
            return;
        }

        if current.state != BreakerState::Closed {
            tracing::info!(
                service = %service_name,
                previous = %current.state,
                "Circuit breaker reset to CLOSED after success"
            );
            metrics::record_circuit_transition(service_name, BreakerState::Closed);
        }
    }

    /// Count a failure, opening the circuit once the threshold is reached.
    ///
    /// Returns the state that was written. A failed write reports CLOSED.
    pub async fn record_failure(&self, service_name: &str) -> BreakerState {
        let current = self.get_state(service_name).await;
        let now = self.clock.now();
        let failure_count = current.failure_count.saturating_add(1);

        let new_state = if failure_count >= self.config.failure_threshold {
            BreakerState::Open
        } else {
            BreakerState::Closed
        };

        let updated = CircuitState {
            state: new_state,
            failure_count,
            last_failure: Some(now),
            expiry: self.expiry(now),
            ..current.clone()
        };

        if let Err(e) = self.save(service_name, updated).await {
            tracing::error!(service = %service_name, error = %e, "Error recording failure");
            return BreakerState::Closed;
        }

        if new_state == BreakerState::Open {
            tracing::warn!(
                service = %service_name,
                failure_count,
                "Circuit breaker opened after {} failures",
                failure_count
            );
            if current.state != BreakerState::Open {
                metrics::record_circuit_transition(service_name, BreakerState::Open);
            }
        }

        new_state
    }

    /// Whether a call to `service_name` may proceed right now.
    ///
    /// An OPEN circuit whose timeout has elapsed is moved to HALF_OPEN as a
    /// side effect and the call is allowed.
    pub async fn should_allow_request(&self, service_name: &str) -> bool {
        if !self.config.enabled {
            return true;
        }

        let current = self.get_state(service_name).await;

        match current.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => match current.last_failure {
                Some(last_failure) if self.timeout_elapsed(last_failure) => {
                    self.transition_to_half_open(service_name).await;
                    true
                }
                _ => false,
            },
        }
    }

    async fn transition_to_half_open(&self, service_name: &str) {
        let current = self.get_state(service_name).await;
        let now = self.clock.now();
        let updated = CircuitState {
            state: BreakerState::HalfOpen,
            expiry: self.expiry(now),
            ..current
        };

        match self.save(service_name, updated).await {
            Ok(()) => {
                tracing::info!(service = %service_name, "Circuit breaker transitioned to HALF_OPEN");
                metrics::record_circuit_transition(service_name, BreakerState::HalfOpen);
            }
            Err(e) => {
                tracing::error!(service = %service_name, error = %e, "Error transitioning to half-open");
            }
        }
    }

    /// Summary of every stored breaker.
    pub async fn overview(&self) -> Result<CircuitOverview, StoreError> {
        if !self.config.enabled {
            return Ok(CircuitOverview {
                status: CircuitHealth::Disabled,
                total: 0,
                open: 0,
                circuits: Vec::new(),
            });
        }

        let circuits = with_deadline("circuit_state_list", self.store_deadline(), self.store.list())
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))??;
        let open = circuits
            .iter()
            .filter(|c| c.state == BreakerState::Open)
            .count();
        let total = circuits.len();

        let status = if open == 0 {
            CircuitHealth::Healthy
        } else if open <= total / 2 {
            CircuitHealth::Warning
        } else {
            CircuitHealth::Unhealthy
        };

        Ok(CircuitOverview {
            status,
            total,
            open,
            circuits,
        })
    }
}

/// Aggregate health of all breakers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CircuitHealth {
    Healthy,
    Warning,
    Unhealthy,
    Disabled,
}

#[derive(Debug, Clone, Serialize)]
pub struct CircuitOverview {
    pub status: CircuitHealth,
    pub total: usize,
    pub open: usize,
    pub circuits: Vec<CircuitState>,
}
