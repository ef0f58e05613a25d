//! Delivery of form submissions to their webhook targets.
//!
//! The `Dispatcher` looks up every mapping for a form, hands the serialized
//! submission to a `WebhookClient` once per mapping and writes one log
//! entry per attempt. Transport failures are contained per target.
pub mod client;
pub mod dispatcher;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::HttpWebhookClient;
pub use dispatcher::Dispatcher;

/// How the matched targets of a single submission are worked through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// One target after another, in registry order.
    #[default]
    Sequential,
    /// All targets at once; no ordering between targets.
    Parallel,
}

impl DeliveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMode::Sequential => "sequential",
            DeliveryMode::Parallel => "parallel",
        }
    }
}

impl std::fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A delivery attempt that produced no HTTP response at all.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl DeliveryError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, DeliveryError::Timeout { .. })
    }
}
