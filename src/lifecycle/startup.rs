//! Startup orchestration.
//!
//! # Responsibilities
//! - Build every collaborator the configuration asks for
//! - Fall back to in-process implementations when nothing is configured
//!
//! # Design Decisions
//! - Fail fast: an unreadable state file or bad URL is fatal
//! - Secrets always come from the environment in a deployed process

use std::sync::Arc;
use std::time::Duration;

use crate::clock::SystemClock;
use crate::compute::MemoryResourceConfig;
use crate::config::RecoveryConfig;
use crate::notify::{LogNotifier, NotificationSink, NotifyError, WebhookNotifier};
use crate::recovery::{Collaborators, HttpProber};
use crate::secrets::EnvSecretStore;
use crate::state::{CircuitStateStore, FileCircuitStore, MemoryCircuitStore, StoreError};
use crate::storage::{FsObjectStore, MemoryObjectStore, ObjectStore};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("circuit state store: {0}")]
    State(#[from] StoreError),

    #[error("notification sink: {0}")]
    Notify(#[from] NotifyError),

    #[error("invalid URL '{url}': {source}")]
    Url {
        url: String,
        source: url::ParseError,
    },

    #[error("availability prober: {0}")]
    Prober(#[from] reqwest::Error),
}

/// Build collaborators for a long-running process.
pub async fn build_collaborators(config: &RecoveryConfig) -> Result<Collaborators, StartupError> {
    let circuit_store: Arc<dyn CircuitStateStore> = match &config.circuit_breaker.state_file {
        Some(path) => {
            tracing::info!(path = %path, "Using file-backed circuit state");
            Arc::new(FileCircuitStore::open(path).await?)
        }
        None => Arc::new(MemoryCircuitStore::new()),
    };

    let storage: Arc<dyn ObjectStore> = match &config.storage.root_dir {
        Some(root) => {
            tracing::info!(root = %root, "Using directory-backed object storage");
            Arc::new(FsObjectStore::new(root))
        }
        None => {
            tracing::warn!("No storage root configured, audit entries are kept in memory");
            Arc::new(MemoryObjectStore::new())
        }
    };

    let notifier: Arc<dyn NotificationSink> = match &config.notifications.webhook_url {
        Some(raw) => {
            let url = url::Url::parse(raw).map_err(|source| StartupError::Url {
                url: raw.clone(),
                source,
            })?;
            Arc::new(WebhookNotifier::new(
                url,
                Duration::from_secs(config.notifications.timeout_secs),
            )?)
        }
        None => Arc::new(LogNotifier),
    };

    Ok(Collaborators {
        circuit_store,
        storage,
        compute: Arc::new(MemoryResourceConfig::from_map(&config.compute.functions)),
        prober: Arc::new(HttpProber::new(&config.probes)?),
        notifier,
        secrets: Arc::new(EnvSecretStore),
        clock: Arc::new(SystemClock),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_defaults_build_in_memory_collaborators() {
        let deps = build_collaborators(&RecoveryConfig::default()).await.unwrap();
        assert!(deps.circuit_store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bad_webhook_url() {
        let mut config = RecoveryConfig::default();
        config.notifications.webhook_url = Some("not a url".to_string());
        assert!(matches!(
            build_collaborators(&config).await,
            Err(StartupError::Url { .. })
        ));
    }
}
