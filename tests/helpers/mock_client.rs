//! Fake webhook clients for exercising the dispatcher without a network.

use async_trait::async_trait;
use formhook::{DeliveryError, WebhookClient};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a scripted URL should answer with.
#[derive(Clone, Debug)]
pub enum Reply {
    Status(u16),
    Timeout,
}

/// A client that answers from a per-URL script and records every request.
///
/// Unscripted URLs answer 200.
#[derive(Clone, Debug, Default)]
pub struct RecordingClient {
    replies: Arc<Mutex<HashMap<String, Reply>>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
    delay: Option<Duration>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, url: &str, reply: Reply) -> Self {
        self.replies.lock().unwrap().insert(url.to_string(), reply);
        self
    }

    /// Makes every request take `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// The `(url, body)` pairs received so far, in arrival order.
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebhookClient for RecordingClient {
    async fn post_json(&self, url: &str, body: &str) -> Result<u16, DeliveryError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), body.to_string()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self.replies.lock().unwrap().get(url).cloned();
        match reply {
            Some(Reply::Status(code)) => Ok(code),
            Some(Reply::Timeout) => Err(DeliveryError::Timeout {
                url: url.to_string(),
            }),
            None => Ok(200),
        }
    }
}
