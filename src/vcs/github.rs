//! GitHub Actions client.
//!
//! # Responsibilities
//! - Authenticate with a bearer credential
//! - List workflow runs by status and creation window, page by page
//! - Map HTTP failures onto [`VcsError`]

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use url::Url;

use crate::config::{GithubConfig, RetryConfig};
use crate::resilience::{retry_with_backoff, BackoffPolicy};
use crate::vcs::{FailureHistoryProvider, FailureRecord, VcsError};

/// One page of workflow runs.
#[derive(Debug, Clone)]
pub struct RunPage {
    pub total_count: u64,
    pub runs: Vec<FailureRecord>,
}

#[derive(Debug, Deserialize)]
struct RunsResponse {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Deserialize)]
struct WorkflowRun {
    created_at: DateTime<Utc>,
    conclusion: Option<String>,
    head_commit: Option<HeadCommit>,
}

#[derive(Debug, Deserialize)]
struct HeadCommit {
    #[serde(default)]
    message: String,
}

impl From<WorkflowRun> for FailureRecord {
    fn from(run: WorkflowRun) -> Self {
        FailureRecord {
            timestamp: run.created_at,
            conclusion: run.conclusion.unwrap_or_default(),
            commit_message: run.head_commit.map(|c| c.message).unwrap_or_default(),
        }
    }
}

/// Workflow-runs client for one repository.
#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    runs_url: Url,
    per_page: u32,
    max_pages: u32,
    backoff: BackoffPolicy,
}

impl GithubClient {
    /// Build a client for `config.owner/config.repo` using `token`.
    pub fn new(config: &GithubConfig, token: &str, retries: &RetryConfig) -> Result<Self, VcsError> {
        let runs_url = Url::parse(&format!(
            "{}/repos/{}/{}/actions/runs",
            config.api_url.trim_end_matches('/'),
            config.owner,
            config.repo
        ))
        .map_err(|e| VcsError::Transport(format!("invalid API URL: {}", e)))?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| VcsError::Unauthorized)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("pipeline-recovery"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            runs_url,
            per_page: config.per_page,
            max_pages: config.max_pages,
            backoff: BackoffPolicy::from_config(retries),
        })
    }

    /// Fetch one page of runs with `status`, created after `since`.
    pub async fn list_runs(
        &self,
        status: &str,
        since: DateTime<Utc>,
        page: u32,
    ) -> Result<RunPage, VcsError> {
        let created = format!(">{}", since.format("%Y-%m-%dT%H:%M:%SZ"));
        let response = self
            .http
            .get(self.runs_url.clone())
            .query(&[
                ("status", status.to_string()),
                ("per_page", self.per_page.to_string()),
                ("page", page.to_string()),
                ("created", created),
            ])
            .send()
            .await?;

        let status_code = response.status();
        if !status_code.is_success() {
            tracing::error!(status = %status_code, page, "GitHub API returned error status");
            return Err(VcsError::from_status(status_code.as_u16()));
        }

        let body: RunsResponse = response.json().await?;
        Ok(RunPage {
            total_count: body.total_count,
            runs: body.workflow_runs.into_iter().map(FailureRecord::from).collect(),
        })
    }
}

#[async_trait]
impl FailureHistoryProvider for GithubClient {
    async fn recent_failures(&self, since: DateTime<Utc>) -> Result<Vec<FailureRecord>, VcsError> {
        let mut records = Vec::new();

        for page in 1..=self.max_pages {
            let batch = retry_with_backoff(&self.backoff, "list_runs", || {
                self.list_runs("failure", since, page)
            })
            .await?;

            let fetched = batch.runs.len();
            records.extend(batch.runs);
            if fetched < self.per_page as usize {
                break;
            }
        }

        tracing::debug!(count = records.len(), since = %since, "Fetched recent workflow failures");
        Ok(records)
    }
}

impl std::fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubClient")
            .field("runs_url", &self.runs_url.as_str())
            .field("per_page", &self.per_page)
            .field("max_pages", &self.max_pages)
            .finish()
    }
}
