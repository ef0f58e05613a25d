//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using
//! the `clap` crate. `Cli` is also a figment `Provider`, so flags that were
//! given take precedence over the file and environment layers.

use crate::delivery::DeliveryMode;
use clap::Parser;
use figment::{
    value::{Dict, Map, Tag, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Forwards form submissions to configured webhooks and logs each delivery.
#[derive(Parser, Debug, Default, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address for the HTTP API, e.g. 0.0.0.0:8080.
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<String>,

    /// Directory for persisted mappings and delivery log.
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Deliver to matched webhooks one by one or all at once.
    #[arg(long, value_enum)]
    pub delivery_mode: Option<DeliveryMode>,

    /// Per-request webhook timeout in milliseconds.
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Logging level (trace, debug, info, warn, error).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Expose Prometheus metrics at /metrics.
    #[arg(long)]
    pub metrics: bool,
}

fn section(entries: Vec<(&str, Value)>) -> Option<Value> {
    if entries.is_empty() {
        return None;
    }
    let dict: Dict = entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect();
    Some(Value::Dict(Tag::Default, dict))
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        let mut server = Vec::new();
        if let Some(listen) = &self.listen {
            server.push(("listen_address", Value::from(listen.clone())));
        }

        let mut delivery = Vec::new();
        if let Some(mode) = self.delivery_mode {
            delivery.push(("mode", Value::from(mode.as_str())));
        }
        if let Some(timeout) = self.timeout_ms {
            delivery.push(("timeout_ms", Value::from(timeout)));
        }

        let mut storage = Vec::new();
        if let Some(dir) = &self.data_dir {
            storage.push(("data_dir", Value::from(dir.display().to_string())));
        }

        // A bare `--metrics` switches them on; its absence leaves lower layers alone.
        let mut metrics = Vec::new();
        if self.metrics {
            metrics.push(("enabled", Value::from(true)));
        }

        for (name, entries) in [
            ("server", server),
            ("delivery", delivery),
            ("storage", storage),
            ("metrics", metrics),
        ] {
            if let Some(value) = section(entries) {
                dict.insert(name.into(), value);
            }
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
