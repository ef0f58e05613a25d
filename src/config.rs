//! Configuration management for formhook
//!
//! This module defines the main `Config` struct and its sub-structs. It uses
//! the `figment` crate to layer built-in defaults, a `formhook.toml` file,
//! `FORMHOOK_`-prefixed environment variables and command-line arguments.

use crate::cli::Cli;
use crate::delivery::DeliveryMode;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "formhook.toml";

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level, used when `RUST_LOG` is not set.
    pub log_level: String,
    /// Admin / trigger HTTP server.
    pub server: ServerConfig,
    /// Webhook delivery behaviour.
    pub delivery: DeliveryConfig,
    /// Where mappings and the delivery log are kept.
    pub storage: StorageConfig,
    /// Prometheus exposition.
    pub metrics: MetricsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// Socket address the HTTP API binds to.
    pub listen_address: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct DeliveryConfig {
    /// Sequential or parallel fan-out across matched targets.
    #[serde(default)]
    pub mode: DeliveryMode,
    /// Per-request timeout. Unset means the HTTP client's default.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl DeliveryConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct StorageConfig {
    /// Directory holding `webhooks.json` and `delivery_log.json`. When unset
    /// both stores live in memory only.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct MetricsConfig {
    /// Serve Prometheus metrics at `/metrics`.
    #[serde(default)]
    pub enabled: bool,
}

impl Config {
    /// Loads the configuration by layering defaults, the TOML file, the
    /// environment and the command line, in that order.
    ///
    /// # Arguments
    /// * `cli` - Parsed command-line arguments; `cli.config` overrides the
    ///   default file location.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            // e.g. FORMHOOK_DELIVERY__MODE=parallel
            .merge(Env::prefixed("FORMHOOK_").split("__"))
            .merge(cli.clone())
            .extract()?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            server: ServerConfig {
                listen_address: "127.0.0.1:8080".to_string(),
            },
            delivery: DeliveryConfig::default(),
            storage: StorageConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}
