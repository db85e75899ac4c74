//! Dependency availability probes.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ProbeConfig;

#[async_trait]
pub trait AvailabilityProber: Send + Sync {
    /// True when `service` answered its health endpoint.
    async fn is_available(&self, service: &str) -> bool;
}

/// GETs a per-service endpoint; only HTTP 200 counts as reachable.
///
/// Services with no configured endpoint are assumed reachable.
#[derive(Debug, Clone)]
pub struct HttpProber {
    http: reqwest::Client,
    endpoints: BTreeMap<String, String>,
}

impl HttpProber {
    pub fn new(config: &ProbeConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("pipeline-recovery")
            .build()?;
        Ok(Self {
            http,
            endpoints: config.endpoints.clone(),
        })
    }
}

#[async_trait]
impl AvailabilityProber for HttpProber {
    async fn is_available(&self, service: &str) -> bool {
        let Some(endpoint) = self.endpoints.get(service) else {
            tracing::debug!(service = %service, "No probe endpoint configured, assuming available");
            return true;
        };

        match self.http.get(endpoint).send().await {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(e) => {
                tracing::error!(service = %service, error = %e, "Service availability test failed");
                false
            }
        }
    }
}

/// Fixed answers per service, for tests. Unlisted services are available.
#[derive(Debug, Clone, Default)]
pub struct StaticProber {
    answers: BTreeMap<String, bool>,
}

impl StaticProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, service: &str, available: bool) -> Self {
        self.answers.insert(service.to_string(), available);
        self
    }
}

#[async_trait]
impl AvailabilityProber for StaticProber {
    async fn is_available(&self, service: &str) -> bool {
        self.answers.get(service).copied().unwrap_or(true)
    }
}
