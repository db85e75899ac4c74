//! Outcome notifications.
//!
//! # Responsibilities
//! - Publish a subject and JSON message to a named topic
//!
//! # Design Decisions
//! - Callers treat publishing as best effort; errors are logged by the caller
//! - Messages are pre-serialized strings so sinks stay payload-agnostic

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification endpoint returned {0}")]
    Status(u16),

    #[error("notification transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        NotifyError::Transport(e.to_string())
    }
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn publish(&self, topic: &str, subject: &str, message: &str) -> Result<(), NotifyError>;
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    topic: &'a str,
    subject: &'a str,
    message: &'a str,
}

/// Posts `{topic, subject, message}` as JSON to a fixed URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: url::Url,
}

impl WebhookNotifier {
    pub fn new(url: url::Url, timeout: Duration) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, url })
    }
}

#[async_trait]
impl NotificationSink for WebhookNotifier {
    async fn publish(&self, topic: &str, subject: &str, message: &str) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(self.url.clone())
            .json(&WebhookPayload {
                topic,
                subject,
                message,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        tracing::debug!(topic = %topic, subject = %subject, "Notification delivered");
        Ok(())
    }
}

/// Writes notifications to the log. Used when no webhook is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn publish(&self, topic: &str, subject: &str, message: &str) -> Result<(), NotifyError> {
        tracing::info!(topic = %topic, subject = %subject, message = %message, "Notification");
        Ok(())
    }
}

/// A captured notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub topic: String,
    pub subject: String,
    pub message: String,
}

impl Notification {
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.message).ok()
    }
}

/// Records every publish. Can be switched to fail.
#[derive(Debug, Clone, Default)]
pub struct MemoryNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl NotificationSink for MemoryNotifier {
    async fn publish(&self, topic: &str, subject: &str, message: &str) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Transport("sink disabled".to_string()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(Notification {
                topic: topic.to_string(),
                subject: subject.to_string(),
                message: message.to_string(),
            });
        }
        Ok(())
    }
}
