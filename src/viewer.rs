//! Read side of the delivery log, shaped for an admin table and a payload
//! viewer.

use crate::core::{DeliveryLogEntry, DeliveryStatus, FormId, LogStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Timestamps are shown the way a SQL `DATETIME` column would render them.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row of the log table.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LogRow {
    pub id: String,
    pub timestamp: String,
    pub form_id: FormId,
    pub status_code: DeliveryStatus,
}

impl From<&DeliveryLogEntry> for LogRow {
    fn from(entry: &DeliveryLogEntry) -> Self {
        Self {
            id: entry.id.clone(),
            timestamp: entry.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            form_id: entry.form_id.clone(),
            status_code: entry.status_code,
        }
    }
}

/// A payload ready to be served as its own document.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadView {
    pub content_type: &'static str,
    pub body: String,
}

#[derive(Clone)]
pub struct LogViewer {
    log: Arc<dyn LogStore>,
}

impl LogViewer {
    pub fn new(log: Arc<dyn LogStore>) -> Self {
        Self { log }
    }

    /// Table rows, oldest first, optionally restricted to one form.
    pub async fn rows(&self, form_id: Option<&FormId>) -> Vec<LogRow> {
        self.log
            .list()
            .await
            .iter()
            .filter(|entry| form_id.map_or(true, |wanted| entry.form_id.matches(wanted)))
            .map(LogRow::from)
            .collect()
    }

    /// The stored payload of entry `id`, pretty-printed.
    ///
    /// Returns `None` for an unknown id.
    pub async fn payload(&self, id: &str) -> Option<PayloadView> {
        let entry = self.log.get(id).await?;
        Some(PayloadView {
            content_type: JSON_CONTENT_TYPE,
            body: pretty_json(&entry),
        })
    }
}

fn pretty_json(entry: &DeliveryLogEntry) -> String {
    serde_json::from_str::<serde_json::Value>(&entry.payload_json)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or_else(|e| {
            warn!(log_id = %entry.id, error = %e, "Stored payload is not valid JSON, returning it verbatim");
            entry.payload_json.clone()
        })
}
