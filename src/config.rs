use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::classifier::normalize_hash;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub contracts: ContractsConfig,
    #[serde(default)]
    pub alert: AlertConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Chain tag written with every row.
    #[serde(default = "default_blockchain")]
    pub blockchain: String,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            blockchain: default_blockchain(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// What the engine does after reporting a malformed payload or a failed write.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop processing the block and return the error to the host.
    #[default]
    Abort,
    /// Log, count the failure and continue with the next notification.
    Isolate,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Sink DSNs, written in this order.
    pub conn_strings: Vec<String>,
    /// Path to a SQL file applied to each sink on connect.
    pub schema: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContractsConfig {
    pub hashes: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlertConfig {
    pub url: Option<String>,
    pub token: Option<String>,
    #[serde(default = "default_alert_timeout")]
    pub timeout_secs: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self { url: None, token: None, timeout_secs: default_alert_timeout() }
    }
}

impl AlertConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_blockchain() -> String {
    "neo".to_string()
}

fn default_alert_timeout() -> u64 {
    5
}

impl Config {
    pub fn load_from(path: &str) -> Result<Self> {
        let config_builder = config::Config::builder()
            .add_source(config::File::new(path, config::FileFormat::Toml))
            // Add environment variables with prefix "EVENTS_WRITER_", e.g. EVENTS_WRITER_DATABASE__CONN_STRINGS
            .add_source(
                config::Environment::with_prefix("EVENTS_WRITER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("database.conn_strings")
                    .with_list_parse_key("contracts.hashes"),
            )
            .build()?;

        let config: Config = config_builder.try_deserialize()?;
        config.validated()
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validated()
    }

    fn validated(mut self) -> Result<Self> {
        let mut conn_strings: Vec<String> = Vec::with_capacity(self.database.conn_strings.len());
        for dsn in self.database.conn_strings.drain(..) {
            let dsn = dsn.trim().to_string();
            if !dsn.is_empty() && !conn_strings.contains(&dsn) {
                conn_strings.push(dsn);
            }
        }
        if conn_strings.is_empty() {
            anyhow::bail!("database.conn_strings must list at least one sink");
        }
        self.database.conn_strings = conn_strings;

        self.contracts.hashes = self
            .contracts
            .hashes
            .iter()
            .map(|h| normalize_hash(h))
            .filter(|h| !h.is_empty())
            .collect();
        for hash in &self.contracts.hashes {
            if hex::decode(hash).is_err() {
                anyhow::bail!("Contract hash '{}' is not valid hex", hash);
            }
        }

        if self.alert.url.as_deref().is_some_and(|u| u.trim().is_empty()) {
            self.alert.url = None;
        }

        Ok(self)
    }

    pub fn schema_sql(&self) -> Result<Option<String>> {
        match &self.database.schema {
            Some(path) => Ok(Some(std::fs::read_to_string(path)?)),
            None => Ok(None),
        }
    }
}
