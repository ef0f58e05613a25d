//! The append-only delivery log.
//!
//! One entry is written per delivery attempt. Entries are never mutated or
//! removed; the log grows without bound, pruning is left to whoever
//! administers the data directory.

use crate::core::{DeliveryLogEntry, LogStore, NewLogEntry};
use crate::persistence::{PersistenceError, SnapshotFile};
use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, error, info};
use uuid::Uuid;

pub const LOG_FILE_NAME: &str = "delivery_log.json";

/// In-memory delivery log, optionally mirrored to a JSON snapshot file.
pub struct DeliveryLog {
    entries: RwLock<Vec<DeliveryLogEntry>>,
    snapshot: Option<SnapshotFile>,
}

impl DeliveryLog {
    pub fn in_memory() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            snapshot: None,
        }
    }

    /// Opens the log persisted under `data_dir`, loading existing entries.
    pub async fn open(data_dir: &Path) -> Result<Self, PersistenceError> {
        let snapshot = SnapshotFile::new(data_dir.join(LOG_FILE_NAME));
        let entries: Vec<DeliveryLogEntry> = snapshot.load().await?;
        info!(
            path = %snapshot.path().display(),
            count = entries.len(),
            "Loaded delivery log"
        );

        Ok(Self {
            entries: RwLock::new(entries),
            snapshot: Some(snapshot),
        })
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn generate_log_id() -> String {
    format!("log_{}", Uuid::new_v4().simple())
}

#[async_trait]
impl LogStore for DeliveryLog {
    async fn append(&self, entry: NewLogEntry) -> DeliveryLogEntry {
        let mut entries = self.entries.write().await;

        let mut id = generate_log_id();
        while entries.iter().any(|existing| existing.id == id) {
            id = generate_log_id();
        }

        let stored = DeliveryLogEntry {
            id,
            timestamp: Utc::now(),
            form_id: entry.form_id,
            status_code: entry.status_code,
            payload_json: entry.payload_json,
        };
        entries.push(stored.clone());

        if let Some(snapshot) = &self.snapshot {
            // The in-memory entry stays authoritative even if the file write fails.
            if let Err(e) = snapshot.save(entries.as_slice()).await {
                error!(error = %e, log_id = %stored.id, "Failed to persist delivery log");
            }
        }

        metrics::counter!("delivery_log_entries_total").increment(1);
        debug!(log_id = %stored.id, form_id = %stored.form_id, status = %stored.status_code, "Appended delivery log entry");
        stored
    }

    async fn list(&self) -> Vec<DeliveryLogEntry> {
        self.entries.read().await.clone()
    }

    async fn get(&self, id: &str) -> Option<DeliveryLogEntry> {
        self.entries
            .read()
            .await
            .iter()
            .find(|entry| entry.id == id)
            .cloned()
    }
}
