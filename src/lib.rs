/// formhook - forwards form submissions to webhooks and logs every delivery
///
/// This library provides the webhook registry, the dispatcher, the
/// append-only delivery log and the read side used by an admin viewer.
pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod delivery;
pub mod delivery_log;
pub mod internal_metrics;
pub mod persistence;
pub mod registry;
pub mod server;
pub mod viewer;

// Re-export core types for convenience
pub use crate::core::*;
pub use delivery::{DeliveryError, DeliveryMode, Dispatcher, HttpWebhookClient};
pub use delivery_log::DeliveryLog;
pub use registry::{FieldError, MappingField, RegistryError, WebhookRegistry};
pub use viewer::{LogRow, LogViewer, PayloadView};
