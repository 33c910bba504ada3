//! Process-wide configuration: a `*Config` struct per component with a
//! hand-written `Default`, loaded from an optional `--config <path>`
//! YAML overlay (`serde_yaml`) and then overridden by `clap` CLI flags
//! -- CLI wins over YAML wins over the built-in defaults.

use clap::Parser;
use scheduler_queue::QueueConfig;
use scheduler_store::StoreConfig;
use scheduler_worker::WorkerPoolConfig;
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_host: String,
    pub http_port: u16,
    pub store: StoreConfig,
    pub queue: QueueConfig,
    pub pool: WorkerPoolConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_host: "0.0.0.0".to_string(),
            http_port: 8080,
            store: StoreConfig::default(),
            queue: QueueConfig::default(),
            pool: WorkerPoolConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

/// Deserialized shape of an optional `--config <path.yaml>` overlay.
/// Every field is optional: a deployment only needs to name the
/// settings it wants to override.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigOverlay {
    pub http_host: Option<String>,
    pub http_port: Option<u16>,
    pub store_url: Option<String>,
    pub store_max_connections: Option<u32>,
    pub queue_db_path: Option<String>,
    pub task_timeout_secs: Option<i64>,
    pub reap_retry_delay_secs: Option<i64>,
    pub max_queue_size: Option<usize>,
}

impl ConfigOverlay {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    pub fn apply(self, config: &mut ServerConfig) {
        if let Some(v) = self.http_host {
            config.http_host = v;
        }
        if let Some(v) = self.http_port {
            config.http_port = v;
        }
        if let Some(v) = self.store_url {
            config.store.url = v;
        }
        if let Some(v) = self.store_max_connections {
            config.store.max_connections = v;
        }
        if let Some(v) = self.queue_db_path {
            config.queue.db_path = v;
        }
        if let Some(v) = self.task_timeout_secs {
            config.queue.task_timeout_secs = v;
        }
        if let Some(v) = self.reap_retry_delay_secs {
            config.queue.reap_retry_delay_secs = v;
        }
        if let Some(v) = self.max_queue_size {
            config.queue.max_queue_size = v;
        }
    }
}

/// CLI overrides, applied after the YAML overlay.
#[derive(Parser, Debug)]
#[command(name = "scheduler-server")]
#[command(about = "LLM task scheduling engine", long_about = None)]
pub struct Args {
    /// Optional YAML file overlaying the built-in defaults.
    #[arg(long)]
    pub config: Option<String>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long)]
    pub store_url: Option<String>,

    #[arg(long)]
    pub queue_db_path: Option<String>,
}

impl Args {
    pub fn apply(self, config: &mut ServerConfig) {
        if let Some(v) = self.host {
            config.http_host = v;
        }
        if let Some(v) = self.port {
            config.http_port = v;
        }
        if let Some(v) = self.store_url {
            config.store.url = v;
        }
        if let Some(v) = self.queue_db_path {
            config.queue.db_path = v;
        }
    }
}

/// Resolve the final config: defaults, overlaid by `--config` YAML (if
/// given), overlaid by any explicit CLI flags.
pub fn resolve(args: Args) -> anyhow::Result<ServerConfig> {
    let mut config = ServerConfig::default();

    if let Some(path) = &args.config {
        ConfigOverlay::load(path)?.apply(&mut config);
    }

    args.apply(&mut config);
    Ok(config)
}
