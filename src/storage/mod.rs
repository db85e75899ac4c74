//! Object storage.
//!
//! # Responsibilities
//! - Hold the recovery audit log
//! - Hold monitoring data that cleanup ages out
//!
//! # Design Decisions
//! - Listing is paginated; callers follow `next_token` until it is None
//! - Deletes are batched and a batch may not exceed [`MAX_DELETE_BATCH`] keys
//! - Keys are `/`-separated relative paths

pub mod fs;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use fs::FsObjectStore;
pub use memory::MemoryObjectStore;

/// Most keys a single delete call accepts.
pub const MAX_DELETE_BATCH: usize = 1000;

/// Listing metadata for one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub last_modified: DateTime<Utc>,
    pub size: u64,
}

/// One page of a listing.
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub objects: Vec<ObjectMeta>,
    pub next_token: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("delete batch of {0} keys exceeds the limit of {max}", max = MAX_DELETE_BATCH)]
    BatchTooLarge(usize),

    #[error("invalid object key '{0}'")]
    InvalidKey(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Bucket-like object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List keys under `prefix`, continuing from `token` when given.
    async fn list(&self, prefix: &str, token: Option<String>) -> Result<ObjectPage, StorageError>;

    /// Delete up to [`MAX_DELETE_BATCH`] keys. Returns how many were removed.
    async fn delete_batch(&self, keys: &[String]) -> Result<usize, StorageError>;

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StorageError>;
}
