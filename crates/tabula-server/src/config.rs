//! Configuration for the Tabula server
//!
//! Loads configuration from:
//! 1. config.yaml - operational settings (port, data directory, paging, logging)
//! 2. .env file - loaded into the environment by `main`
//!
//! Environment variables always override config.yaml values. A missing
//! config.yaml means defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tabula_registry::{load_dir, DatasetRegistry, RegistryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to load datasets: {0}")]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory scanned for `*.json`, `*.yaml` and `*.yml` dataset files
    pub directory: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            directory: "./data".to_string(),
        }
    }
}

/// Paging of query results
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Items per page when the request gives no `limit`
    pub page_size: usize,

    /// Upper bound on a requested `limit`
    pub max_page_size: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            max_page_size: 1000,
        }
    }
}

impl QueryConfig {
    pub fn page_limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.page_size).clamp(1, self.max_page_size.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or module-specific
    pub level: String,

    /// Output format: pretty, json, compact
    pub format: String,

    /// Output destination: stdout, file, both
    pub output: String,

    /// Directory for log files
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            output: "stdout".to_string(),
            directory: "./logs".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub query: QueryConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file with environment variable overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config: Config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            serde_yaml::from_str(&contents)?
        } else {
            Config::default()
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Override settings from `lookup`, normally the process environment.
    /// Unparseable numbers are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("TABULA_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("TABULA_SERVER_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(dir) = lookup("TABULA_DATA_DIR") {
            self.data.directory = dir;
        }
        if let Some(size) = lookup("TABULA_PAGE_SIZE").and_then(|s| s.parse().ok()) {
            self.query.page_size = size;
        }

        if let Some(level) = lookup("RUST_LOG") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Some(output) = lookup("LOG_OUTPUT") {
            self.logging.output = output;
        }
        if let Some(dir) = lookup("LOG_DIR") {
            self.logging.directory = dir;
        }
    }

    /// Set logging environment variables for the logging module
    pub fn apply_logging_env(&self) {
        std::env::set_var("RUST_LOG", &self.logging.level);
        std::env::set_var("LOG_FORMAT", &self.logging.format);
        std::env::set_var("LOG_OUTPUT", &self.logging.output);
        std::env::set_var("LOG_DIR", &self.logging.directory);
    }

    pub fn load_registry(&self) -> Result<DatasetRegistry, ConfigError> {
        Ok(load_dir(&self.data.directory)?)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
