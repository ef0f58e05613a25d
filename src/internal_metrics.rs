//! # Internal Metrics Module
//!
//! Delivery metrics are emitted through the `metrics` facade at the call
//! sites (dispatcher, registry, delivery log). This module registers their
//! descriptions and, when enabled, installs the Prometheus recorder whose
//! handle the admin server renders at `/metrics`.

use anyhow::{Context, Result};
use metrics::Unit;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Registers descriptions for every metric formhook emits.
pub fn describe() {
    metrics::describe_counter!(
        "webhook_deliveries_total",
        Unit::Count,
        "Webhook delivery attempts, labeled by outcome (http or error)."
    );
    metrics::describe_histogram!(
        "webhook_delivery_duration_seconds",
        Unit::Seconds,
        "Time spent on a single webhook POST, failures included."
    );
    metrics::describe_counter!(
        "delivery_log_entries_total",
        Unit::Count,
        "Entries appended to the delivery log since startup."
    );
    metrics::describe_gauge!(
        "webhook_mappings_configured",
        Unit::Count,
        "Number of form to webhook mappings currently active."
    );
}

/// Installs the global Prometheus recorder.
///
/// Only one recorder can exist per process; a second call fails.
pub fn install_prometheus() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;
    describe();
    Ok(handle)
}
