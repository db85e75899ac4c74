//! Recovery audit trail.
//!
//! One JSON document per invocation, keyed by date so the store can be
//! browsed by day.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::recovery::actions::ActionRecord;
use crate::storage::{ObjectStore, StorageError};

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub failure_type: String,
    pub context: Value,
    pub actions: Vec<ActionRecord>,
    pub overall_success: bool,
    pub duration_ms: u64,
}

impl AuditEntry {
    /// `<prefix>/YYYY/MM/DD/recovery-<unix seconds>-<id>.json`
    pub fn object_key(&self, prefix: &str) -> String {
        format!(
            "{}/{}/recovery-{}-{}.json",
            prefix.trim_end_matches('/'),
            self.timestamp.format("%Y/%m/%d"),
            self.timestamp.timestamp(),
            self.id
        )
    }
}

/// Persist `entry` under `prefix`, returning the key written.
pub async fn write_entry(
    store: &dyn ObjectStore,
    prefix: &str,
    entry: &AuditEntry,
) -> Result<String, StorageError> {
    let key = entry.object_key(prefix);
    let body = serde_json::to_vec_pretty(entry)
        .map_err(|e| StorageError::Unavailable(format!("audit entry encoding: {}", e)))?;
    store.put(&key, body, "application/json").await?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryObjectStore;
    use chrono::TimeZone;
    use serde_json::json;

    fn entry() -> AuditEntry {
        AuditEntry {
            id: Uuid::nil(),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 7, 12, 0, 0).unwrap(),
            failure_type: "build_failure".to_string(),
            context: json!({"runner_type": "ubuntu-latest"}),
            actions: vec![],
            overall_success: false,
            duration_ms: 12,
        }
    }

    #[test]
    fn test_object_key_layout() {
        let key = entry().object_key("recovery-logs/");
        assert_eq!(
            key,
            format!(
                "recovery-logs/2026/03/07/recovery-{}-00000000-0000-0000-0000-000000000000.json",
                entry().timestamp.timestamp()
            )
        );
    }

    #[tokio::test]
    async fn test_write_entry() {
        let store = MemoryObjectStore::new();
        let key = write_entry(&store, "recovery-logs", &entry()).await.unwrap();

        let stored = store.get(&key).unwrap();
        assert_eq!(stored.content_type, "application/json");
        let body: Value = serde_json::from_slice(&stored.body).unwrap();
        assert_eq!(body["failure_type"], "build_failure");
        assert_eq!(body["context"]["runner_type"], "ubuntu-latest");
        assert_eq!(body["duration_ms"], 12);
    }
}
