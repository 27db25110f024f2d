//! Console configuration
//!
//! Loaded from YAML, then selected fields are overridden from the
//! environment (after `.env` has been read).

use chatlink::{ChatLinkError, ClientConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Invalid connection settings: {0}")]
    Connection(#[from] ChatLinkError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Environment variable overriding `connection.address`
pub const ADDRESS_ENV: &str = "CHAT_ADDRESS";
/// Environment variable overriding `connection.user_id`
pub const USER_ID_ENV: &str = "CHAT_USER_ID";
/// Environment variable overriding `connection.session_id`
pub const SESSION_ID_ENV: &str = "CHAT_SESSION_ID";

/// Chat console configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    pub connection: ClientConfig,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds between connection status log lines
    #[serde(default = "default_status_interval")]
    pub status_interval_secs: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_status_interval() -> u64 {
    300
}

impl ConsoleConfig {
    /// Load configuration from a YAML file
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let yaml_content = std::fs::read_to_string(config_path)?;
        let mut config: ConsoleConfig = serde_yaml::from_str(&yaml_content)?;

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Parse and validate configuration from YAML text, without overrides
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: ConsoleConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Override connection fields from `lookup` (normally the environment)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(address) = lookup(ADDRESS_ENV) {
            info!("Overriding address from {}", ADDRESS_ENV);
            self.connection.address = address;
        }
        if let Some(user_id) = lookup(USER_ID_ENV) {
            info!("Overriding user id from {}", USER_ID_ENV);
            self.connection.user_id = user_id;
        }
        if let Some(session_id) = lookup(SESSION_ID_ENV) {
            info!("Overriding session id from {}", SESSION_ID_ENV);
            self.connection.session_id = Some(session_id);
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.connection.validate()?;

        if self.status_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "status_interval_secs must be greater than 0".to_string(),
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "log_level must be one of: {}",
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }

    /// Log configuration summary
    pub fn log(&self) {
        let connection = &self.connection;
        info!("Configuration loaded:");
        info!(
            "  Address: {}",
            if connection.has_address() {
                connection.address.as_str()
            } else {
                "<not configured>"
            }
        );
        info!("  User id: {}", connection.user_id);
        info!(
            "  Session id: {}",
            connection.session_id.as_deref().unwrap_or("<new>")
        );
        if let Some(context) = &connection.context {
            info!("  Context: {}", context.kind());
        }
        info!(
            "  Reconnect: every {}ms, at most {} attempts",
            connection.reconnect_delay_ms, connection.max_reconnect_attempts
        );
        info!("  Keep-alive: every {}ms", connection.keep_alive_period_ms);
        info!("  Log level: {}", self.log_level);
    }
}
