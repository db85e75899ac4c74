//! Invocation handling.
//!
//! # Data Flow
//! ```text
//! event JSON
//!     → event.rs parse_event
//!     → secret store (VCS credential)
//!     → CircuitBreakerManager + GithubClient + RecoveryExecutor
//!     → executor runs on its own task
//!     → outcome notification
//!     → InvocationResponse {status_code, body}
//! ```
//!
//! Every failure path sends a `recovery_system_failure` notification.
//! Notification errors are logged and dropped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::{json, Value};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::RecoveryConfig;
use crate::error::RecoveryError;
use crate::invocation::event::{parse_event, InvocationRequest};
use crate::observability::metrics;
use crate::recovery::{Collaborators, RecoveryContext, RecoveryExecutor, RecoveryReport};
use crate::resilience::{with_deadline, CircuitBreakerManager};
use crate::vcs::GithubClient;

const SYSTEM_FAILURE: &str = "recovery_system_failure";

/// Entry-point result: an HTTP-style status and a JSON body.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationResponse {
    pub status_code: u16,
    pub body: Value,
}

#[derive(Clone)]
pub struct InvocationHandler {
    deps: Collaborators,
}

impl InvocationHandler {
    pub fn new(deps: Collaborators) -> Self {
        Self { deps }
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.deps
    }

    /// Handle one event under `config`.
    pub async fn handle(&self, config: Arc<RecoveryConfig>, event: &Value) -> InvocationResponse {
        let invocation_id = Uuid::new_v4();
        let span = tracing::info_span!("invocation", id = %invocation_id);

        async move {
            let started = Instant::now();
            tracing::info!("Starting automated recovery process");

            let request = match parse_event(event, self.deps.clock.now()) {
                Ok(request) => request,
                Err(e) => return self.fail(&config, invocation_id, e).await,
            };
            let failure_type = request.failure_type.to_string();

            match self.run(Arc::clone(&config), request).await {
                Ok(report) => {
                    metrics::record_invocation(&report.failure_type, report.success, started);
                    self.respond(&config, invocation_id, report).await
                }
                Err(e) => {
                    metrics::record_invocation(&failure_type, false, started);
                    self.fail(&config, invocation_id, e).await
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        config: Arc<RecoveryConfig>,
        request: InvocationRequest,
    ) -> Result<RecoveryReport, RecoveryError> {
        let github = &config.github;
        if github.owner.is_empty() || github.repo.is_empty() {
            return Err(RecoveryError::Configuration(
                "github owner and repo must be set".to_string(),
            ));
        }

        let token = self
            .deps
            .secrets
            .get_secret(&github.token_secret_id)
            .await
            .map_err(|e| RecoveryError::Configuration(e.to_string()))?;

        let history = GithubClient::new(github, &token, &config.retries)
            .map_err(|e| RecoveryError::Configuration(format!("github client: {}", e)))?;

        let breaker = CircuitBreakerManager::new(
            Arc::clone(&self.deps.circuit_store),
            Arc::clone(&self.deps.clock),
            config.circuit_breaker.clone(),
        );
        let context = RecoveryContext::from_value(request.context, &github.service_name);
        let failure_type = request.failure_type;
        let executor = RecoveryExecutor::new(Arc::clone(&config), breaker, Arc::new(history), &self.deps);

        tokio::spawn(async move { executor.execute_recovery_plan(&failure_type, context).await })
            .await
            .map_err(|e| RecoveryError::Recovery(format!("recovery task aborted: {}", e)))?
    }

    async fn respond(
        &self,
        config: &RecoveryConfig,
        invocation_id: Uuid,
        report: RecoveryReport,
    ) -> InvocationResponse {
        let descriptions = report.descriptions();
        self.notify(config, &report.failure_type, &descriptions, report.success)
            .await;

        InvocationResponse {
            status_code: 200,
            body: json!({
                "message": "Automated recovery completed",
                "invocation_id": invocation_id,
                "failure_type": report.failure_type,
                "recovery_actions": descriptions,
                "actions": report.actions,
                "success": report.success,
                "audit_key": report.audit_key,
            }),
        }
    }

    async fn fail(
        &self,
        config: &RecoveryConfig,
        invocation_id: Uuid,
        error: RecoveryError,
    ) -> InvocationResponse {
        tracing::error!(error = %error, "Automated recovery failed");
        self.notify(
            config,
            SYSTEM_FAILURE,
            &[format!("Recovery system error: {}", error)],
            false,
        )
        .await;

        InvocationResponse {
            status_code: error.status_code(),
            body: json!({
                "error": error.summary(),
                "details": error.to_string(),
                "invocation_id": invocation_id,
            }),
        }
    }

    async fn notify(&self, config: &RecoveryConfig, failure_type: &str, actions: &[String], success: bool) {
        let message = json!({
            "alert_type": "automated_recovery",
            "severity": if success { "INFO" } else { "ERROR" },
            "timestamp": self.deps.clock.now().to_rfc3339(),
            "repository": config.github.repository(),
            "failure_type": failure_type,
            "recovery_actions": actions,
            "recovery_success": success,
            "message": format!(
                "Automated recovery {} for {}",
                if success { "completed" } else { "failed" },
                failure_type
            ),
        });
        let subject = format!("CI/CD Automated Recovery: {}", failure_type);
        let topic = config.notifications.topic.as_str();

        let body = message.to_string();
        let publish = self.deps.notifier.publish(topic, &subject, &body);
        match with_deadline(
            "notification",
            Duration::from_secs(config.notifications.timeout_secs),
            publish,
        )
        .await
        {
            Ok(Ok(())) => tracing::info!(failure_type = %failure_type, "Sent recovery notification"),
            Ok(Err(e)) => tracing::error!(error = %e, "Error sending recovery notification"),
            Err(e) => tracing::error!(error = %e, "Error sending recovery notification"),
        }
    }
}
