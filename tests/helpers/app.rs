//! A running formhook instance bound to an ephemeral port.

use anyhow::Result;
use formhook::app::App;
use formhook::config::Config;
use formhook::{DeliveryMode, WebhookClient};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub struct TestApp {
    pub base_url: String,
    pub http: reqwest::Client,
    pub delivery_mode: DeliveryMode,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<Result<()>>,
}

pub struct TestAppBuilder {
    config: Config,
    client: Option<Arc<dyn WebhookClient>>,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        let mut config = Config::default();
        config.server.listen_address = "127.0.0.1:0".to_string();
        Self {
            config,
            client: None,
        }
    }

    pub fn with_client(mut self, client: Arc<dyn WebhookClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_data_dir(mut self, dir: &Path) -> Self {
        self.config.storage.data_dir = Some(dir.to_path_buf());
        self
    }

    pub fn with_config_modifier(mut self, modify: impl FnOnce(&mut Config)) -> Self {
        modify(&mut self.config);
        self
    }

    pub async fn start(self) -> Result<TestApp> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut builder = App::builder(self.config);
        if let Some(client) = self.client {
            builder = builder.client_override(client);
        }
        let app = builder.build(shutdown_rx).await?;
        let base_url = format!("http://{}", app.local_addr());
        let delivery_mode = app.dispatcher().mode();
        let handle = tokio::spawn(app.run());

        Ok(TestApp {
            base_url,
            http: reqwest::Client::new(),
            delivery_mode,
            shutdown_tx,
            handle,
        })
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Signals shutdown and waits for the app to stop.
    pub async fn shutdown(self, timeout: Duration) -> Result<()> {
        let _ = self.shutdown_tx.send(true);
        tokio::time::timeout(timeout, self.handle).await???;
        Ok(())
    }
}
