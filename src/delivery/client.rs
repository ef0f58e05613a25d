//! A reqwest-backed client for POSTing JSON bodies to webhook URLs.

use crate::core::WebhookClient;
use crate::delivery::DeliveryError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, instrument};

/// Sends webhook requests over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpWebhookClient {
    client: reqwest::Client,
}

impl HttpWebhookClient {
    /// Creates a new `HttpWebhookClient`.
    ///
    /// # Arguments
    /// * `timeout` - Overall request timeout. `None` keeps reqwest's default
    ///   of no timeout.
    pub fn new(timeout: Option<Duration>) -> Result<Self, DeliveryError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(DeliveryError::ClientBuild)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookClient for HttpWebhookClient {
    #[instrument(skip(self, body), fields(bytes = body.len()))]
    async fn post_json(&self, url: &str, body: &str) -> Result<u16, DeliveryError> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_owned())
            .send()
            .await;

        match response {
            Ok(res) => {
                let status = res.status().as_u16();
                debug!(status, "Webhook responded");
                Ok(status)
            }
            Err(e) if e.is_timeout() => Err(DeliveryError::Timeout {
                url: url.to_string(),
            }),
            Err(source) => Err(DeliveryError::Transport {
                url: url.to_string(),
                source,
            }),
        }
    }
}
