//! The webhook registry: the configured form → URL mappings.
//!
//! The collection is only ever replaced as a whole, mirroring a settings
//! form where the entire table is resubmitted. The active collection sits
//! behind an `ArcSwap`, so readers always see either the previous or the
//! new collection in full.

use crate::core::{FormId, MappingStore, WebhookMapping};
use crate::persistence::{PersistenceError, SnapshotFile};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub const REGISTRY_FILE_NAME: &str = "webhooks.json";

/// The mapping field a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingField {
    FormId,
    WebhookUrl,
}

impl fmt::Display for MappingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingField::FormId => f.write_str("form_id"),
            MappingField::WebhookUrl => f.write_str("webhook_url"),
        }
    }
}

/// A rejected field of a submitted mapping, by position in the submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub index: usize,
    pub field: MappingField,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}].{}: {}", self.index, self.field, self.message)
    }
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("invalid webhook mappings: {}", format_field_errors(.0))]
    Validation(Vec<FieldError>),

    #[error("failed to persist webhook mappings: {0}")]
    Persistence(#[from] PersistenceError),
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Checks every mapping, collecting all failures rather than stopping at
/// the first one.
pub fn validate_mappings(mappings: &[WebhookMapping]) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    for (index, mapping) in mappings.iter().enumerate() {
        if let Err(message) = validate_form_id(&mapping.form_id) {
            errors.push(FieldError {
                index,
                field: MappingField::FormId,
                message,
            });
        }

        if let Err(message) = validate_url(&mapping.webhook_url) {
            errors.push(FieldError {
                index,
                field: MappingField::WebhookUrl,
                message,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Builds mappings from raw JSON entries, reporting missing, null and
/// mistyped fields as field errors alongside the usual validation.
pub fn decode_mappings(values: Vec<Value>) -> Result<Vec<WebhookMapping>, Vec<FieldError>> {
    let mut mappings = Vec::with_capacity(values.len());
    let mut errors = Vec::new();

    for (index, value) in values.into_iter().enumerate() {
        let mut fields = match value {
            Value::Object(fields) => fields,
            other => {
                errors.push(FieldError {
                    index,
                    field: MappingField::FormId,
                    message: format!("expected an object with form_id and webhook_url, got {other}"),
                });
                continue;
            }
        };

        let form_id = decode_form_id(fields.remove("form_id"))
            .and_then(|form_id| validate_form_id(&form_id).map(|()| form_id));
        let webhook_url = decode_url(fields.remove("webhook_url"))
            .and_then(|url| validate_url(&url).map(|()| url));

        match (form_id, webhook_url) {
            (Ok(form_id), Ok(webhook_url)) => mappings.push(WebhookMapping {
                form_id,
                webhook_url,
            }),
            (form_id, webhook_url) => {
                if let Err(message) = form_id {
                    errors.push(FieldError {
                        index,
                        field: MappingField::FormId,
                        message,
                    });
                }
                if let Err(message) = webhook_url {
                    errors.push(FieldError {
                        index,
                        field: MappingField::WebhookUrl,
                        message,
                    });
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(mappings)
    } else {
        Err(errors)
    }
}

// Absent and null both read as empty, so validation reports them.
fn decode_form_id(value: Option<Value>) -> Result<FormId, String> {
    match value {
        None | Some(Value::Null) => Ok(FormId::default()),
        Some(Value::String(id)) => Ok(FormId::from(id)),
        Some(Value::Number(id)) if id.is_i64() || id.is_u64() => Ok(FormId::new(id.to_string())),
        Some(other) => Err(format!("form_id must be a string or an integer, got {other}")),
    }
}

fn decode_url(value: Option<Value>) -> Result<String, String> {
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(url)) => Ok(url),
        Some(other) => Err(format!("webhook_url must be a string, got {other}")),
    }
}

fn validate_form_id(form_id: &FormId) -> Result<(), String> {
    if form_id.is_blank() {
        return Err("form_id must not be empty".to_string());
    }
    Ok(())
}

fn validate_url(raw: &str) -> Result<(), String> {
    if raw.trim().is_empty() {
        return Err("webhook_url must not be empty".to_string());
    }

    let url = Url::parse(raw.trim()).map_err(|e| format!("'{raw}' is not a valid URL: {e}"))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported URL scheme '{other}', expected http or https")),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(format!("'{raw}' has no host"));
    }
    Ok(())
}

/// The process-wide collection of webhook mappings.
pub struct WebhookRegistry {
    current: ArcSwap<Vec<WebhookMapping>>,
    snapshot: Option<SnapshotFile>,
    // Serializes writers so persisted and in-memory state cannot diverge.
    write_lock: Mutex<()>,
}

impl WebhookRegistry {
    /// Creates an empty registry that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            current: ArcSwap::from_pointee(Vec::new()),
            snapshot: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Creates an in-memory registry seeded with `mappings`.
    pub fn with_mappings(mappings: Vec<WebhookMapping>) -> Result<Self, RegistryError> {
        validate_mappings(&mappings).map_err(RegistryError::Validation)?;
        metrics::gauge!("webhook_mappings_configured").set(mappings.len() as f64);
        let registry = Self::in_memory();
        registry.current.store(Arc::new(mappings));
        Ok(registry)
    }

    /// Opens a registry persisted under `data_dir`, loading any existing
    /// mappings. Stored mappings that no longer validate are rejected.
    pub async fn open(data_dir: &Path) -> Result<Self, RegistryError> {
        let snapshot = SnapshotFile::new(data_dir.join(REGISTRY_FILE_NAME));
        let mappings: Vec<WebhookMapping> = snapshot.load().await?;
        validate_mappings(&mappings).map_err(RegistryError::Validation)?;

        info!(
            path = %snapshot.path().display(),
            count = mappings.len(),
            "Loaded webhook mappings"
        );
        metrics::gauge!("webhook_mappings_configured").set(mappings.len() as f64);

        Ok(Self {
            current: ArcSwap::from_pointee(mappings),
            snapshot: Some(snapshot),
            write_lock: Mutex::new(()),
        })
    }
}

#[async_trait]
impl MappingStore for WebhookRegistry {
    async fn list(&self) -> Vec<WebhookMapping> {
        self.current.load().as_ref().clone()
    }

    async fn replace(&self, mappings: Vec<WebhookMapping>) -> Result<(), RegistryError> {
        if let Err(errors) = validate_mappings(&mappings) {
            warn!(
                errors = errors.len(),
                "Rejected webhook mapping replacement"
            );
            return Err(RegistryError::Validation(errors));
        }

        let _guard = self.write_lock.lock().await;
        if let Some(snapshot) = &self.snapshot {
            snapshot.save(&mappings).await?;
        }

        let count = mappings.len();
        self.current.store(Arc::new(mappings));
        metrics::gauge!("webhook_mappings_configured").set(count as f64);
        info!(count, "Webhook mappings replaced");
        Ok(())
    }
}
