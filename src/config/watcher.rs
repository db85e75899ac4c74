//! Hot reload of the recovery configuration file.
//!
//! A reloaded config reaches the next invocation. GitHub, retry, circuit
//! breaker thresholds, classifier, planner, scaling and cleanup settings
//! apply without a restart. Settings consumed while the process starts stay
//! fixed until it restarts: the listener and its request timeout, the
//! collaborator backends and their HTTP clients, and observability. See
//! [`restart_only_changes`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::RecoveryConfig;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Watches one TOML file and publishes every config that loads and validates.
pub struct ConfigWatcher {
    path: PathBuf,
    updates: mpsc::UnboundedSender<RecoveryConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end of its update channel.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<RecoveryConfig>) {
        let (updates, rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            updates,
        };
        (watcher, rx)
    }

    /// Start watching. Reloads stop when the returned handle is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();
        let updates = self.updates;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(error = %e, "Config watch error");
                        return;
                    }
                };
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    return;
                }
                reload(&path, &updates);
            },
            Config::default().with_poll_interval(POLL_INTERVAL),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;
        tracing::info!(path = %self.path.display(), "Config watcher started");
        Ok(watcher)
    }
}

/// Fields that differ between `current` and `next` but only take effect
/// after a restart.
pub fn restart_only_changes(current: &RecoveryConfig, next: &RecoveryConfig) -> Vec<&'static str> {
    let mut changed = Vec::new();
    let mut check = |field: &'static str, differs: bool| {
        if differs {
            changed.push(field);
        }
    };

    check("server.bind_address", current.server.bind_address != next.server.bind_address);
    check(
        "server.request_timeout_secs",
        current.server.request_timeout_secs != next.server.request_timeout_secs,
    );
    check(
        "circuit_breaker.state_file",
        current.circuit_breaker.state_file != next.circuit_breaker.state_file,
    );
    check("compute.functions", current.compute.functions != next.compute.functions);
    check("storage.root_dir", current.storage.root_dir != next.storage.root_dir);
    check(
        "notifications.webhook_url",
        current.notifications.webhook_url != next.notifications.webhook_url,
    );
    check(
        "notifications.timeout_secs",
        current.notifications.timeout_secs != next.notifications.timeout_secs,
    );
    check("probes.endpoints", current.probes.endpoints != next.probes.endpoints);
    check("probes.timeout_secs", current.probes.timeout_secs != next.probes.timeout_secs);

    let (a, b) = (&current.observability, &next.observability);
    check("observability.log_level", a.log_level != b.log_level);
    check("observability.log_format", a.log_format != b.log_format);
    check("observability.metrics_enabled", a.metrics_enabled != b.metrics_enabled);
    check("observability.metrics_address", a.metrics_address != b.metrics_address);

    changed
}

fn reload(path: &Path, updates: &mpsc::UnboundedSender<RecoveryConfig>) {
    match load_config(path) {
        Ok(config) => {
            tracing::info!(
                path = %path.display(),
                repository = %config.github.repository(),
                "Config file changed, publishing reload"
            );
            if updates.send(config).is_err() {
                tracing::debug!("Config update receiver gone, dropping reload");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Rejected config reload, keeping current configuration");
        }
    }
}
