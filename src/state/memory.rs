//! In-process circuit state store.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use super::{CircuitState, CircuitStateStore, StoreError};

/// Concurrent map of service name → circuit record.
///
/// Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryCircuitStore {
    inner: Arc<DashMap<String, CircuitState>>,
}

impl MemoryCircuitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl CircuitStateStore for MemoryCircuitStore {
    async fn get(&self, service_name: &str) -> Result<Option<CircuitState>, StoreError> {
        Ok(self.inner.get(service_name).map(|r| r.value().clone()))
    }

    async fn put(&self, service_name: &str, state: CircuitState) -> Result<(), StoreError> {
        self.inner.insert(service_name.to_string(), state);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<CircuitState>, StoreError> {
        let mut states: Vec<_> = self.inner.iter().map(|r| r.value().clone()).collect();
        states.sort_by(|a, b| a.service_name.cmp(&b.service_name));
        Ok(states)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = MemoryCircuitStore::new();
        let now = Utc::now();
        assert!(store.get("github").await.unwrap().is_none());

        let mut state = CircuitState::closed("github", now, now);
        store.put("github", state.clone()).await.unwrap();
        state.failure_count = 3;
        store.put("github", state).await.unwrap();

        let stored = store.get("github").await.unwrap().unwrap();
        assert_eq!(stored.failure_count, 3);
        assert_eq!(store.len(), 1);
    }
}
