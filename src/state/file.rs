//! JSON-file circuit state store.
//!
//! The whole map is rewritten on every put (write to a sibling temp file,
//! then rename). Reads are served from the in-memory copy loaded at open.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{CircuitState, CircuitStateStore, StoreError};

pub struct FileCircuitStore {
    path: PathBuf,
    states: Mutex<BTreeMap<String, CircuitState>>,
}

impl FileCircuitStore {
    /// Open the store, loading existing records if the file exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let states = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::info!(path = %path.display(), records = states.len(), "Loaded circuit state file");

        Ok(Self {
            path,
            states: Mutex::new(states),
        })
    }

    async fn persist(&self, states: &BTreeMap<String, CircuitState>) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(states)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl CircuitStateStore for FileCircuitStore {
    async fn get(&self, service_name: &str) -> Result<Option<CircuitState>, StoreError> {
        Ok(self.states.lock().await.get(service_name).cloned())
    }

    async fn put(&self, service_name: &str, state: CircuitState) -> Result<(), StoreError> {
        let mut states = self.states.lock().await;
        let mut next = states.clone();
        next.insert(service_name.to_string(), state);
        // Memory only moves once the file does.
        self.persist(&next).await?;
        *states = next;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<CircuitState>, StoreError> {
        Ok(self.states.lock().await.values().cloned().collect())
    }
}
