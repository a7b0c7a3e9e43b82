//! Configuration for the ledger

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// HTTP listen address
    pub http_listen_addr: String,

    /// Log output format
    pub log_format: LogFormat,

    /// Transaction log pipeline configuration
    pub pipeline: PipelineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "account-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            http_listen_addr: "0.0.0.0:8080".to_string(),
            log_format: LogFormat::Text,
            pipeline: PipelineConfig::default(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable
    Text,
    /// One JSON object per line
    Json,
}

impl LogFormat {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Some(LogFormat::Text),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

/// Largest accepted mailbox capacity
pub const MAX_QUEUE_CAPACITY: usize = 1_000_000;

/// Longest accepted flush interval (one day)
pub const MAX_FLUSH_INTERVAL_MS: u64 = 86_400_000;

/// Transaction log pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Mailbox capacity (entries)
    pub queue_capacity: usize,

    /// Flush once the batch holds this many entries
    pub max_batch_size: usize,

    /// Flush once this long has passed since the last flush (milliseconds)
    pub flush_interval_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            max_batch_size: 300,
            flush_interval_ms: 5_000,
        }
    }
}

impl PipelineConfig {
    /// Flush interval as a duration
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    ///
    /// Starts from `LEDGER_CONFIG` if set, defaults otherwise, then applies
    /// the individual overrides.
    pub fn from_env() -> crate::Result<Self> {
        let mut config = match std::env::var("LEDGER_CONFIG") {
            Ok(path) => Config::from_file(path)?,
            Err(_) => Config::default(),
        };

        if let Ok(addr) = std::env::var("LEDGER_HTTP_ADDR") {
            config.http_listen_addr = addr;
        }

        if let Ok(format) = std::env::var("LEDGER_LOG_FORMAT") {
            config.log_format = LogFormat::parse(&format).ok_or_else(|| {
                crate::Error::Config(format!("Unknown log format: {}", format))
            })?;
        }

        if let Ok(value) = std::env::var("LEDGER_QUEUE_CAPACITY") {
            config.pipeline.queue_capacity = parse_env("LEDGER_QUEUE_CAPACITY", &value)?;
        }

        if let Ok(value) = std::env::var("LEDGER_BATCH_SIZE") {
            config.pipeline.max_batch_size = parse_env("LEDGER_BATCH_SIZE", &value)?;
        }

        if let Ok(value) = std::env::var("LEDGER_FLUSH_INTERVAL_MS") {
            config.pipeline.flush_interval_ms = parse_env("LEDGER_FLUSH_INTERVAL_MS", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.pipeline.queue_capacity == 0 {
            return Err(crate::Error::Config(
                "pipeline.queue_capacity must be positive".to_string(),
            ));
        }
        if self.pipeline.max_batch_size == 0 {
            return Err(crate::Error::Config(
                "pipeline.max_batch_size must be positive".to_string(),
            ));
        }
        if self.pipeline.flush_interval_ms == 0 {
            return Err(crate::Error::Config(
                "pipeline.flush_interval_ms must be positive".to_string(),
            ));
        }
        if self.pipeline.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(crate::Error::Config(format!(
                "pipeline.queue_capacity must be at most {}",
                MAX_QUEUE_CAPACITY
            )));
        }
        if self.pipeline.max_batch_size > self.pipeline.queue_capacity {
            return Err(crate::Error::Config(
                "pipeline.max_batch_size must not exceed pipeline.queue_capacity".to_string(),
            ));
        }
        if self.pipeline.flush_interval_ms > MAX_FLUSH_INTERVAL_MS {
            return Err(crate::Error::Config(format!(
                "pipeline.flush_interval_ms must be at most {}",
                MAX_FLUSH_INTERVAL_MS
            )));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> crate::Result<T> {
    value
        .parse()
        .map_err(|_| crate::Error::Config(format!("Invalid value for {}: {}", name, value)))
}
