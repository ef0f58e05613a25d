//! formhook - form submission webhook relay
//!
//! Hosts the webhook registry, dispatcher and delivery log behind a JSON
//! HTTP API until interrupted.

use anyhow::Result;
use clap::Parser;
use formhook::{app::App, cli::Cli, config::Config};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            tracing_subscriber::fmt().init();
            error!("Failed to load configuration: {}", err);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("formhook starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Listen Address: {}", config.server.listen_address);
    info!("Delivery Mode: {}", config.delivery.mode);
    match config.delivery.timeout_ms {
        Some(ms) => info!("Delivery Timeout: {}ms", ms),
        None => info!("Delivery Timeout: HTTP client default"),
    }
    match &config.storage.data_dir {
        Some(dir) => info!("Data Directory: {}", dir.display()),
        None => info!("Data Directory: none (in-memory)"),
    }
    info!(
        "Metrics: {}",
        if config.metrics.enabled { "Enabled" } else { "Disabled" }
    );
    info!("-------------------------------------------------------");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let app = App::builder(config).build(shutdown_rx).await?;
    info!("formhook ready on http://{}", app.local_addr());

    let app_handle = tokio::spawn(app.run());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Shutting down gracefully...");
    let _ = shutdown_tx.send(true);

    match app_handle.await {
        Ok(result) => result,
        Err(e) => {
            error!("Application task panicked: {:?}", e);
            Ok(())
        }
    }
}
