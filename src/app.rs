//! The main application wiring, decoupled from the entry point.

use crate::{
    config::Config,
    core::{LogStore, MappingStore, WebhookClient},
    delivery::{Dispatcher, HttpWebhookClient},
    delivery_log::DeliveryLog,
    internal_metrics,
    registry::WebhookRegistry,
    server::{AdminServer, AdminState},
    viewer::LogViewer,
};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

/// A handle to the running application.
pub struct App {
    dispatcher: Dispatcher,
    local_addr: SocketAddr,
    shutdown_rx: watch::Receiver<bool>,
    server_handle: JoinHandle<()>,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// The address the admin server actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Waits for the shutdown signal and then for the server to drain.
    pub async fn run(self) -> Result<()> {
        let mut shutdown_rx = self.shutdown_rx;
        if !*shutdown_rx.borrow() {
            shutdown_rx.changed().await.ok();
        }
        info!("Shutdown signal received. Waiting for the admin server to finish...");

        if let Err(e) = self.server_handle.await {
            error!("Admin server task panicked: {:?}", e);
        }

        info!("formhook shut down.");
        Ok(())
    }
}

/// Builder for the main application.
///
/// Separates constructing the components from running them, and lets tests
/// swap out the webhook client.
pub struct AppBuilder {
    config: Config,
    client_override: Option<Arc<dyn WebhookClient>>,
}

impl AppBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            client_override: None,
        }
    }

    /// Overrides the webhook client for testing.
    pub fn client_override(mut self, client: Arc<dyn WebhookClient>) -> Self {
        self.client_override = Some(client);
        self
    }

    /// Builds all components, binds the listener and spawns the server.
    #[instrument(skip_all)]
    pub async fn build(self, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let config = self.config;

        // =========================================================================
        // 1. Metrics
        // =========================================================================
        let prom_handle = if config.metrics.enabled {
            Some(internal_metrics::install_prometheus()?)
        } else {
            None
        };

        // =========================================================================
        // 2. Stores
        // =========================================================================
        let (registry, delivery_log) = match &config.storage.data_dir {
            Some(dir) => {
                info!(data_dir = %dir.display(), "Using file-backed stores");
                let registry = WebhookRegistry::open(dir)
                    .await
                    .context("failed to load webhook mappings")?;
                let delivery_log = DeliveryLog::open(dir)
                    .await
                    .context("failed to load delivery log")?;
                (registry, delivery_log)
            }
            None => {
                info!("No data directory configured, stores are in-memory only");
                (WebhookRegistry::in_memory(), DeliveryLog::in_memory())
            }
        };

        // =========================================================================
        // 3. Delivery
        // =========================================================================
        let client: Arc<dyn WebhookClient> = match self.client_override {
            Some(client) => client,
            None => Arc::new(HttpWebhookClient::new(config.delivery.timeout())?),
        };
        let mapping_store: Arc<dyn MappingStore> = Arc::new(registry);
        let log_store: Arc<dyn LogStore> = Arc::new(delivery_log);
        let dispatcher = Dispatcher::new(mapping_store.clone(), log_store.clone(), client)
            .with_mode(config.delivery.mode);

        // =========================================================================
        // 4. Admin Server
        // =========================================================================
        let listener = TcpListener::bind(&config.server.listen_address)
            .await
            .with_context(|| format!("failed to bind {}", config.server.listen_address))?;
        let local_addr = listener.local_addr()?;

        let state = AdminState {
            registry: mapping_store,
            dispatcher: dispatcher.clone(),
            viewer: LogViewer::new(log_store),
            prom_handle,
        };
        let server = AdminServer::new(listener, state, shutdown_rx.clone());
        let server_handle = tokio::spawn(server.run());

        Ok(App {
            dispatcher,
            local_addr,
            shutdown_rx,
            server_handle,
        })
    }
}
