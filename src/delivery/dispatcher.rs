//! The dispatcher fans a form submission out to every matching webhook.

use crate::core::{
    DeliveryResult, DeliveryStatus, FormId, FormPayload, LogStore, MappingStore, NewLogEntry,
    WebhookClient, WebhookMapping,
};
use crate::delivery::DeliveryMode;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument};

/// Stateless coordinator between the registry, the client and the log.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<dyn MappingStore>,
    log: Arc<dyn LogStore>,
    client: Arc<dyn WebhookClient>,
    mode: DeliveryMode,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<dyn MappingStore>,
        log: Arc<dyn LogStore>,
        client: Arc<dyn WebhookClient>,
    ) -> Self {
        Self {
            registry,
            log,
            client,
            mode: DeliveryMode::Sequential,
        }
    }

    pub fn with_mode(mut self, mode: DeliveryMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Delivers one form submission to every mapping registered for
    /// `form_id`.
    ///
    /// The payload is serialized once and the same bytes go to every target.
    /// Each attempt produces exactly one log entry, whatever its outcome, and
    /// a failing target never stops the remaining ones. Calling this twice
    /// performs two full, independent rounds.
    ///
    /// # Returns
    /// One `DeliveryResult` per matching mapping; empty when nothing matches.
    #[instrument(skip(self, form_id, payload), fields(form_id = %form_id, mode = %self.mode))]
    pub async fn dispatch(&self, form_id: &FormId, payload: &FormPayload) -> Vec<DeliveryResult> {
        let body = match serde_json::to_string(payload) {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "Failed to serialize form payload");
                return Vec::new();
            }
        };

        let targets: Vec<WebhookMapping> = self
            .registry
            .list()
            .await
            .into_iter()
            .filter(|mapping| mapping.form_id.matches(form_id))
            .collect();

        if targets.is_empty() {
            debug!("No webhooks configured for form");
            return Vec::new();
        }

        info!(targets = targets.len(), "Dispatching form submission");

        match self.mode {
            DeliveryMode::Sequential => {
                let mut results = Vec::with_capacity(targets.len());
                for target in &targets {
                    results.push(self.deliver(form_id, target, &body).await);
                }
                results
            }
            DeliveryMode::Parallel => {
                join_all(targets.iter().map(|target| self.deliver(form_id, target, &body))).await
            }
        }
    }

    /// Performs one attempt and records it.
    async fn deliver(&self, form_id: &FormId, target: &WebhookMapping, body: &str) -> DeliveryResult {
        let started = Instant::now();
        let url = target.webhook_url.as_str();

        let (status_code, error) = match self.client.post_json(url, body).await {
            Ok(code) => {
                info!(url, status = code, "Webhook delivered");
                (DeliveryStatus::Http(code), None)
            }
            Err(e) => {
                error!(url, error = %e, "Webhook delivery failed");
                (DeliveryStatus::Error, Some(e.to_string()))
            }
        };

        let outcome = if status_code.is_error() { "error" } else { "http" };
        metrics::counter!("webhook_deliveries_total", "outcome" => outcome).increment(1);
        metrics::histogram!("webhook_delivery_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        let entry = self
            .log
            .append(NewLogEntry {
                form_id: form_id.clone(),
                status_code,
                payload_json: body.to_string(),
            })
            .await;

        DeliveryResult {
            url: target.webhook_url.clone(),
            status_code,
            error,
            log_entry_id: entry.id,
        }
    }
}
