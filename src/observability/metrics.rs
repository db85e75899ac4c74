//! Metrics collection and exposition.
//!
//! # Metrics
//! - `recovery_invocations_total` (counter): by failure type and outcome
//! - `recovery_duration_seconds` (histogram): end-to-end invocation latency
//! - `recovery_actions_total` (counter): by action kind and status
//! - `circuit_transitions_total` (counter): by service and target state
//! - `failure_history_fetches_total` (counter): by result
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::state::BreakerState;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_invocation(failure_type: &str, success: bool, start: Instant) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!(
        "recovery_invocations_total",
        "failure_type" => failure_type.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("recovery_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_action(kind: &'static str, succeeded: bool) {
    let status = if succeeded { "succeeded" } else { "failed" };
    metrics::counter!("recovery_actions_total", "kind" => kind, "status" => status).increment(1);
}

pub fn record_circuit_transition(service: &str, to: BreakerState) {
    metrics::counter!(
        "circuit_transitions_total",
        "service" => service.to_string(),
        "to" => to.as_str()
    )
    .increment(1);
}

pub fn record_history_fetch(result: &'static str) {
    metrics::counter!("failure_history_fetches_total", "result" => result).increment(1);
}
