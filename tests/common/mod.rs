//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use pipeline_recovery::clock::ManualClock;
use pipeline_recovery::compute::MemoryResourceConfig;
use pipeline_recovery::config::RecoveryConfig;
use pipeline_recovery::notify::MemoryNotifier;
use pipeline_recovery::recovery::{Collaborators, StaticProber};
use pipeline_recovery::secrets::StaticSecretStore;
use pipeline_recovery::state::MemoryCircuitStore;
use pipeline_recovery::storage::MemoryObjectStore;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// A running mock backend.
pub struct MockBackend {
    pub addr: SocketAddr,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Request lines seen so far, e.g. `GET /repos/a/b/actions/runs?... HTTP/1.1`.
    pub fn request_lines(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` receives the zero-based call number and returns `(status, json body)`.
pub async fn start_programmable_backend<F, Fut>(f: F) -> MockBackend
where
    F: Fn(usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let (c, r) = (calls.clone(), requests.clone());
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let (f, c, r) = (f.clone(), c.clone(), r.clone());
            tokio::spawn(async move {
                let head = read_request_head(&mut socket).await;
                if let Some(line) = head.lines().next() {
                    r.lock().unwrap().push(line.to_string());
                }
                let n = c.fetch_add(1, Ordering::SeqCst);
                let (status, body) = f(n).await;
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason(status),
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            });
        }
    });

    MockBackend {
        addr,
        calls,
        requests,
    }
}

/// Start a mock backend that always answers with `status` and `body`.
pub async fn start_mock_backend(status: u16, body: &'static str) -> MockBackend {
    start_programmable_backend(move |_| async move { (status, body.to_string()) }).await
}

async fn read_request_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// GitHub workflow-runs body with one run per `(conclusion, commit message)`.
pub fn runs_body(runs: &[(&str, &str)]) -> String {
    let runs: Vec<_> = runs
        .iter()
        .map(|(conclusion, message)| {
            serde_json::json!({
                "created_at": Utc::now().to_rfc3339(),
                "conclusion": conclusion,
                "head_commit": {"message": message},
            })
        })
        .collect();
    serde_json::json!({"total_count": runs.len(), "workflow_runs": runs}).to_string()
}

/// In-memory collaborators plus handles for inspecting them.
pub struct TestEnv {
    pub deps: Collaborators,
    pub circuits: MemoryCircuitStore,
    pub storage: MemoryObjectStore,
    pub compute: MemoryResourceConfig,
    pub notifier: MemoryNotifier,
    pub clock: Arc<ManualClock>,
}

pub fn test_env(secrets: StaticSecretStore, prober: StaticProber) -> TestEnv {
    let circuits = MemoryCircuitStore::new();
    let storage = MemoryObjectStore::new();
    let compute = MemoryResourceConfig::new();
    let notifier = MemoryNotifier::new();
    let clock = Arc::new(ManualClock::new(Utc::now()));

    let deps = Collaborators {
        circuit_store: Arc::new(circuits.clone()),
        storage: Arc::new(storage.clone()),
        compute: Arc::new(compute.clone()),
        prober: Arc::new(prober),
        notifier: Arc::new(notifier.clone()),
        secrets: Arc::new(secrets),
        clock: clock.clone(),
    };

    TestEnv {
        deps,
        circuits,
        storage,
        compute,
        notifier,
        clock,
    }
}

/// Config pointing the GitHub client at `api_url` with fast retries.
pub fn test_config(api_url: &str) -> RecoveryConfig {
    let mut config = RecoveryConfig::default();
    config.github.api_url = api_url.to_string();
    config.github.owner = "acme".to_string();
    config.github.repo = "widgets".to_string();
    config.github.request_timeout_secs = 5;
    config.retries.base_delay_ms = 10;
    config.retries.max_delay_ms = 50;
    config
}
