//! Core domain types and service traits for formhook
//!
//! This module defines the data that flows between the webhook registry,
//! the dispatcher and the delivery log, plus the trait contracts each of
//! those components is consumed through.

use crate::delivery::DeliveryError;
use crate::registry::RegistryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The submitted form fields, keyed by field name.
///
/// Field order is preserved so the serialized body matches the order the
/// host handed the fields over in.
pub type FormPayload = serde_json::Map<String, serde_json::Value>;

/// Identifier of a form.
///
/// Accepts either a JSON number or a string. Two ids are considered equal
/// when both parse as integers with the same value (`"7"`, `" 007"` and `7`
/// all match); otherwise their trimmed text is compared.
#[derive(Debug, Clone, Default, Eq)]
pub struct FormId(String);

impl FormId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the id has no non-whitespace content.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// The integer value of the id, if it has one.
    pub fn normalized(&self) -> Option<i64> {
        self.0.trim().parse::<i64>().ok()
    }

    /// Integer-normalized comparison used for dispatch and log filtering.
    pub fn matches(&self, other: &FormId) -> bool {
        match (self.normalized(), other.normalized()) {
            (Some(a), Some(b)) => a == b,
            _ => self.0.trim() == other.0.trim(),
        }
    }
}

impl PartialEq for FormId {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other)
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! form_id_from_integer {
    ($($int:ty),*) => {
        $(
            impl From<$int> for FormId {
                fn from(id: $int) -> Self {
                    Self(id.to_string())
                }
            }
        )*
    };
}

form_id_from_integer!(i32, i64, u32, u64);

impl From<&str> for FormId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for FormId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Serialize for FormId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFormId {
    Integer(i64),
    Text(String),
}

impl<'de> Deserialize<'de> for FormId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawFormId::deserialize(deserializer)? {
            RawFormId::Integer(id) => FormId::from(id),
            RawFormId::Text(id) => FormId(id),
        })
    }
}

/// A single form → webhook URL mapping.
///
/// Several mappings may share a `form_id`; each one receives its own POST.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookMapping {
    pub form_id: FormId,
    pub webhook_url: String,
}

impl WebhookMapping {
    pub fn new(form_id: impl Into<FormId>, webhook_url: impl Into<String>) -> Self {
        Self {
            form_id: form_id.into(),
            webhook_url: webhook_url.into(),
        }
    }
}

/// Outcome of a single delivery attempt as stored in the log.
///
/// Any HTTP response, 4xx and 5xx included, is recorded as `Http`. `Error`
/// means the request never produced a response (DNS failure, refused
/// connection, timeout). Serialized as the bare status number or the
/// string `"error"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Http(u16),
    Error,
}

impl DeliveryStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, DeliveryStatus::Error)
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryStatus::Http(code) => write!(f, "{code}"),
            DeliveryStatus::Error => f.write_str("error"),
        }
    }
}

impl Serialize for DeliveryStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DeliveryStatus::Http(code) => serializer.serialize_u16(*code),
            DeliveryStatus::Error => serializer.serialize_str("error"),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStatus {
    Code(u16),
    Text(String),
}

impl<'de> Deserialize<'de> for DeliveryStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawStatus::deserialize(deserializer)? {
            RawStatus::Code(code) => Ok(DeliveryStatus::Http(code)),
            RawStatus::Text(text) if text == "error" => Ok(DeliveryStatus::Error),
            RawStatus::Text(text) => Err(serde::de::Error::custom(format!(
                "invalid delivery status: {text}"
            ))),
        }
    }
}

/// A log entry before the log has assigned it an id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLogEntry {
    pub form_id: FormId,
    pub status_code: DeliveryStatus,
    pub payload_json: String,
}

/// A stored delivery attempt. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryLogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub form_id: FormId,
    pub status_code: DeliveryStatus,
    /// The exact JSON body that was sent.
    pub payload_json: String,
}

/// What the dispatcher reports back for each matching mapping.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DeliveryResult {
    pub url: String,
    pub status_code: DeliveryStatus,
    /// Transport failure reason, set only when `status_code` is `Error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub log_entry_id: String,
}

// =============================================================================
// Service Traits
// =============================================================================

/// Holds the configured webhook mappings.
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Returns the full, ordered collection of mappings.
    async fn list(&self) -> Vec<WebhookMapping>;

    /// Replaces the whole collection.
    ///
    /// Either every mapping is valid and the new collection becomes visible
    /// at once, or nothing changes and the offending entries are reported.
    async fn replace(&self, mappings: Vec<WebhookMapping>) -> Result<(), RegistryError>;
}

/// Append-only record of delivery attempts.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Assigns a fresh unique id and the current time, stores the entry and
    /// returns it.
    async fn append(&self, entry: NewLogEntry) -> DeliveryLogEntry;

    /// All entries, oldest first.
    async fn list(&self) -> Vec<DeliveryLogEntry>;

    async fn get(&self, id: &str) -> Option<DeliveryLogEntry>;
}

/// Sends a JSON body to a webhook URL.
#[async_trait]
pub trait WebhookClient: Send + Sync {
    /// POSTs `body` with `Content-Type: application/json`.
    ///
    /// # Returns
    /// * `Ok(status)` for any HTTP response, whatever its status code
    /// * `Err` only when no response was received
    async fn post_json(&self, url: &str, body: &str) -> Result<u16, DeliveryError>;
}
