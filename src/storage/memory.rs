//! In-process object store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::{ObjectMeta, ObjectPage, ObjectStore, StorageError, MAX_DELETE_BATCH};

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
    pub last_modified: DateTime<Utc>,
}

/// Map-backed bucket. Clones share contents.
#[derive(Clone)]
pub struct MemoryObjectStore {
    objects: Arc<DashMap<String, StoredObject>>,
    page_size: usize,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::with_page_size(1000)
    }

    /// Small pages make pagination observable in tests.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            objects: Arc::new(DashMap::new()),
            page_size: page_size.max(1),
        }
    }

    /// Insert an object with an explicit modification time.
    pub fn insert_at(&self, key: &str, body: Vec<u8>, last_modified: DateTime<Utc>) {
        self.objects.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: "application/octet-stream".to_string(),
                last_modified,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.get(key).map(|r| r.value().clone())
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.objects.iter().map(|r| r.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list(&self, prefix: &str, token: Option<String>) -> Result<ObjectPage, StorageError> {
        let mut matching: Vec<ObjectMeta> = self
            .objects
            .iter()
            .filter(|r| r.key().starts_with(prefix))
            .filter(|r| token.as_ref().map_or(true, |t| r.key() > t))
            .map(|r| ObjectMeta {
                key: r.key().clone(),
                last_modified: r.value().last_modified,
                size: r.value().body.len() as u64,
            })
            .collect();
        matching.sort_by(|a, b| a.key.cmp(&b.key));

        let next_token = if matching.len() > self.page_size {
            matching.truncate(self.page_size);
            matching.last().map(|m| m.key.clone())
        } else {
            None
        };

        Ok(ObjectPage {
            objects: matching,
            next_token,
        })
    }

    async fn delete_batch(&self, keys: &[String]) -> Result<usize, StorageError> {
        if keys.len() > MAX_DELETE_BATCH {
            return Err(StorageError::BatchTooLarge(keys.len()));
        }
        Ok(keys
            .iter()
            .filter(|k| self.objects.remove(k.as_str()).is_some())
            .count())
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        self.objects.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pagination_walks_every_key() {
        let store = MemoryObjectStore::with_page_size(2);
        for i in 0..5 {
            store.put(&format!("logs/{}", i), vec![], "text/plain").await.unwrap();
        }
        store.put("other/x", vec![], "text/plain").await.unwrap();

        let mut seen = Vec::new();
        let mut token = None;
        loop {
            let page = store.list("logs/", token).await.unwrap();
            seen.extend(page.objects.into_iter().map(|o| o.key));
            token = page.next_token;
            if token.is_none() {
                break;
            }
        }
        assert_eq!(seen, vec!["logs/0", "logs/1", "logs/2", "logs/3", "logs/4"]);
    }

    #[tokio::test]
    async fn test_delete_batch_limit() {
        let store = MemoryObjectStore::new();
        let keys: Vec<String> = (0..1001).map(|i| i.to_string()).collect();
        assert!(matches!(
            store.delete_batch(&keys).await,
            Err(StorageError::BatchTooLarge(1001))
        ));
    }
}
