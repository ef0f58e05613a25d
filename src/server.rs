//! # Admin Server
//!
//! An `axum` server exposing the registry, the delivery log and the
//! submission trigger as a JSON API:
//!
//! - `GET  /api/mappings` lists the mappings.
//! - `PUT  /api/mappings` replaces them (422 with field errors on rejection).
//! - `POST /api/forms/{form_id}/submissions` dispatches a submission.
//! - `GET  /api/logs` lists log rows, optionally `?form_id=`.
//! - `GET  /api/logs/{log_id}/payload` serves one payload as a JSON document.
//! - `GET  /metrics` when a Prometheus handle is configured.
//!
//! Access control is left to whatever sits in front of this server.

use crate::core::{FormId, FormPayload, MappingStore, WebhookMapping};
use crate::delivery::Dispatcher;
use crate::registry::{decode_mappings, RegistryError};
use crate::viewer::LogViewer;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, trace, warn};

#[derive(Clone)]
pub struct AdminState {
    pub registry: Arc<dyn MappingStore>,
    pub dispatcher: Dispatcher,
    pub viewer: LogViewer,
    pub prom_handle: Option<PrometheusHandle>,
}

/// Builds the API router over `state`.
pub fn router(state: AdminState) -> Router {
    let metrics_handle = state.prom_handle.clone();

    let mut app = Router::new()
        .route("/api/mappings", get(list_mappings).put(replace_mappings))
        .route("/api/forms/{form_id}/submissions", post(submit_form))
        .route("/api/logs", get(list_logs))
        .route("/api/logs/{log_id}/payload", get(view_payload))
        .with_state(state);

    if let Some(handle) = metrics_handle {
        app = app.route("/metrics", get(move || async move { handle.render() }));
    }
    app
}

async fn list_mappings(State(state): State<AdminState>) -> Json<Vec<WebhookMapping>> {
    Json(state.registry.list().await)
}

async fn replace_mappings(
    State(state): State<AdminState>,
    Json(values): Json<Vec<Value>>,
) -> Response {
    let result = match decode_mappings(values) {
        Ok(mappings) => state.registry.replace(mappings).await,
        Err(errors) => {
            warn!(errors = errors.len(), "Rejected malformed webhook mappings");
            Err(RegistryError::Validation(errors))
        }
    };
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(RegistryError::Validation(errors)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "errors": errors })),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to replace webhook mappings");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn submit_form(
    State(state): State<AdminState>,
    Path(form_id): Path<String>,
    Json(payload): Json<FormPayload>,
) -> Response {
    let results = state
        .dispatcher
        .dispatch(&FormId::from(form_id), &payload)
        .await;
    Json(results).into_response()
}

#[derive(Debug, Deserialize)]
struct LogQuery {
    form_id: Option<String>,
}

async fn list_logs(State(state): State<AdminState>, Query(query): Query<LogQuery>) -> Response {
    let form_id = query.form_id.map(FormId::from);
    Json(state.viewer.rows(form_id.as_ref()).await).into_response()
}

async fn view_payload(State(state): State<AdminState>, Path(log_id): Path<String>) -> Response {
    match state.viewer.payload(&log_id).await {
        Some(view) => ([(header::CONTENT_TYPE, view.content_type)], view.body).into_response(),
        None => {
            warn!(log_id = %log_id, "Requested payload for unknown log entry");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// The admin API bound to a listener, waiting to be run.
pub struct AdminServer {
    listener: TcpListener,
    state: AdminState,
    shutdown_rx: watch::Receiver<bool>,
}

impl AdminServer {
    /// Creates a new `AdminServer` but does not spawn it.
    ///
    /// # Arguments
    ///
    /// * `listener` - A `TcpListener` that has already been bound to an address.
    /// * `state` - The services the handlers operate on.
    /// * `shutdown_rx` - A watch channel receiver for graceful shutdown.
    pub fn new(listener: TcpListener, state: AdminState, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            listener,
            state,
            shutdown_rx,
        }
    }

    /// Returns a future that serves requests until a shutdown signal is
    /// received, then lets in-flight requests finish.
    pub fn run(self) -> impl Future<Output = ()> {
        let app = router(self.state);
        let listener = self.listener;
        let mut shutdown_rx = self.shutdown_rx;

        async move {
            if let Ok(addr) = listener.local_addr() {
                info!(%addr, "Admin server listening");
            }
            let shutdown = async move {
                // Sender dropped counts as shutdown too.
                let _ = shutdown_rx.changed().await;
                trace!("Admin server received shutdown signal.");
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("Admin server error: {}", e);
            }
            trace!("Admin server task finished.");
        }
    }
}
