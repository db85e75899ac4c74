//! Directory-backed object store.
//!
//! Each key is a file path relative to the root. Modification times come from
//! file metadata.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{ObjectMeta, ObjectPage, ObjectStore, StorageError, MAX_DELETE_BATCH};

const PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
    page_size: usize,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_page_size(root, PAGE_SIZE)
    }

    pub fn with_page_size(root: impl Into<PathBuf>, page_size: usize) -> Self {
        Self {
            root: root.into(),
            page_size: page_size.max(1),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

/// One page of a listing, walked in key order and stopped once it is full.
struct PageWalk<'a> {
    prefix: &'a str,
    after: Option<&'a str>,
    limit: usize,
    out: Vec<ObjectMeta>,
}

impl PageWalk<'_> {
    /// Returns `true` once `limit` keys have been collected.
    fn visit(&mut self, dir: &Path, dir_key: &str) -> std::io::Result<bool> {
        let read = match std::fs::read_dir(dir) {
            Ok(read) => read,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };

        // Directories sort as "name/" so the walk yields keys in lexicographic order.
        let mut entries = Vec::new();
        for entry in read {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if file_type.is_dir() {
                entries.push((format!("{}{}/", dir_key, name), entry.path(), true));
            } else if file_type.is_file() {
                entries.push((format!("{}{}", dir_key, name), entry.path(), false));
            }
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        for (key, path, is_dir) in entries {
            if is_dir {
                if self.skips_subtree(&key) {
                    continue;
                }
                if self.visit(&path, &key)? {
                    return Ok(true);
                }
            } else if key.starts_with(self.prefix) && self.after.map_or(true, |t| key.as_str() > t) {
                let metadata = std::fs::metadata(&path)?;
                let last_modified: DateTime<Utc> = metadata.modified()?.into();
                self.out.push(ObjectMeta {
                    key,
                    last_modified,
                    size: metadata.len(),
                });
                if self.out.len() >= self.limit {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Every key under `dir_key` misses the prefix or sorts at or before the token.
    fn skips_subtree(&self, dir_key: &str) -> bool {
        let outside_prefix = !dir_key.starts_with(self.prefix) && !self.prefix.starts_with(dir_key);
        let already_listed = self
            .after
            .is_some_and(|t| dir_key <= t && !t.starts_with(dir_key));
        outside_prefix || already_listed
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn list(&self, prefix: &str, token: Option<String>) -> Result<ObjectPage, StorageError> {
        let root = self.root.clone();
        let prefix = prefix.to_string();
        let limit = self.page_size + 1;

        let mut objects = tokio::task::spawn_blocking(move || {
            let mut walk = PageWalk {
                prefix: &prefix,
                after: token.as_deref(),
                limit,
                out: Vec::new(),
            };
            walk.visit(&root, "").map(|_| walk.out)
        })
        .await
        .map_err(|e| StorageError::Unavailable(e.to_string()))??;

        let next_token = if objects.len() > self.page_size {
            objects.truncate(self.page_size);
            objects.last().map(|o| o.key.clone())
        } else {
            None
        };

        Ok(ObjectPage {
            objects,
            next_token,
        })
    }

    async fn delete_batch(&self, keys: &[String]) -> Result<usize, StorageError> {
        if keys.len() > MAX_DELETE_BATCH {
            return Err(StorageError::BatchTooLarge(keys.len()));
        }
        let mut deleted = 0;
        for key in keys {
            match tokio::fs::remove_file(self.path_for(key)?).await {
                Ok(()) => deleted += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(deleted)
    }

    async fn put(&self, key: &str, body: Vec<u8>, _content_type: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("recovery-bucket-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_put_list_delete() {
        let root = temp_root();
        let store = FsObjectStore::new(&root);

        store.put("recovery-logs/2026/01/02/a.json", b"{}".to_vec(), "application/json").await.unwrap();
        store.put("metrics/b.json", b"[]".to_vec(), "application/json").await.unwrap();

        let page = store.list("", None).await.unwrap();
        let keys: Vec<_> = page.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["metrics/b.json", "recovery-logs/2026/01/02/a.json"]);
        assert!(page.next_token.is_none());

        let deleted = store
            .delete_batch(&["metrics/b.json".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.list("metrics/", None).await.unwrap().objects.len(), 0);

        std::fs::remove_dir_all(&root).unwrap_or_default();
    }

    #[tokio::test]
    async fn test_pages_resume_after_token() {
        let root = temp_root();
        let store = FsObjectStore::with_page_size(&root, 2);
        for key in ["c/d/e", "b", "a/2", "c.json", "a/1"] {
            store.put(key, vec![], "text/plain").await.unwrap();
        }

        let mut pages = Vec::new();
        let mut token = None;
        loop {
            let page = store.list("", token).await.unwrap();
            pages.push(page.objects.iter().map(|o| o.key.clone()).collect::<Vec<_>>());
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        assert_eq!(
            pages,
            vec![
                vec!["a/1".to_string(), "a/2".to_string()],
                vec!["b".to_string(), "c.json".to_string()],
                vec!["c/d/e".to_string()],
            ]
        );

        let page = store.list("c", None).await.unwrap();
        let keys: Vec<_> = page.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["c.json", "c/d/e"]);

        let page = store.list("a/", Some("a/1".to_string())).await.unwrap();
        let keys: Vec<_> = page.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["a/2"]);
        assert!(page.next_token.is_none());

        std::fs::remove_dir_all(&root).unwrap_or_default();
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let store = FsObjectStore::new(temp_root());
        let result = store.put("../outside", vec![], "text/plain").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_missing_root_lists_empty() {
        let store = FsObjectStore::new(temp_root());
        assert!(store.list("", None).await.unwrap().objects.is_empty());
    }
}
