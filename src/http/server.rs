//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (tracing, request timeout)
//! - Swap in reloaded configuration between requests
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::watcher::restart_only_changes;
use crate::config::RecoveryConfig;
use crate::invocation::InvocationHandler;
use crate::lifecycle::ShutdownSignal;
use crate::resilience::CircuitBreakerManager;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ArcSwap<RecoveryConfig>>,
    pub handler: InvocationHandler,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: RecoveryConfig, handler: InvocationHandler) -> Self {
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            handler,
            started_at: Instant::now(),
        }
    }

    fn breaker(&self, config: &RecoveryConfig) -> CircuitBreakerManager {
        let deps = self.handler.collaborators();
        CircuitBreakerManager::new(
            Arc::clone(&deps.circuit_store),
            Arc::clone(&deps.clock),
            config.circuit_breaker.clone(),
        )
    }
}

/// HTTP front end for the recovery service.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        let timeout = Duration::from_secs(state.config.load().server.request_timeout_secs);
        let router = build_router(state.clone(), timeout);
        Self { router, state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Apply validated configs from `updates` until shutdown.
    pub fn spawn_config_updates(
        &self,
        mut updates: mpsc::UnboundedReceiver<RecoveryConfig>,
        mut shutdown: ShutdownSignal,
    ) -> tokio::task::JoinHandle<()> {
        let config = Arc::clone(&self.state.config);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = updates.recv() => match update {
                        Some(new_config) => {
                            let pending = restart_only_changes(&config.load(), &new_config);
                            if !pending.is_empty() {
                                tracing::warn!(
                                    fields = ?pending,
                                    "Reloaded settings only take effect after a restart"
                                );
                            }
                            config.store(Arc::new(new_config));
                            tracing::info!("Configuration reloaded");
                        }
                        None => break,
                    },
                    _ = shutdown.wait() => break,
                }
            }
        })
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/invoke", post(invoke_handler))
        .route("/health", get(health_handler))
        .route("/circuits", get(circuits_handler))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}

async fn invoke_handler(State(state): State<AppState>, Json(event): Json<Value>) -> Response {
    let config = state.config.load_full();
    let response = state.handler.handle(config, &event).await;
    let status = StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response.body)).into_response()
}

async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let config = state.config.load();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "repository": config.github.repository(),
        "circuit_breaker_enabled": config.circuit_breaker.enabled,
    }))
}

async fn circuits_handler(State(state): State<AppState>) -> Response {
    let config = state.config.load_full();
    match state.breaker(&config).overview().await {
        Ok(overview) => Json(overview).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list circuit states");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"error": "circuit state unavailable", "details": e.to_string()})),
            )
                .into_response()
        }
    }
}
