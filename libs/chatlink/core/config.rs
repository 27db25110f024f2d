use crate::error::{ChatLinkError, Result};
use crate::protocol::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection configuration
///
/// Everything the connection needs is passed in explicitly; nothing is read
/// from the process environment here. Deserializable so host applications
/// can keep it in their YAML config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// WebSocket address (wss:// or ws://). Empty means "not configured".
    #[serde(default)]
    pub address: String,

    /// Caller identity sent in every handshake
    pub user_id: String,

    /// Session to resume, if already known
    #[serde(default)]
    pub session_id: Option<String>,

    /// Initial conversation context
    #[serde(default)]
    pub context: Option<Context>,

    /// Connect as soon as the client is built
    #[serde(default = "default_auto_connect")]
    pub auto_connect: bool,

    /// Fixed delay between reconnection attempts
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Consecutive failed attempts before giving up
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: usize,

    /// Period between keep-alive pings
    #[serde(default = "default_keep_alive_period_ms")]
    pub keep_alive_period_ms: u64,

    /// Unanswered pings tolerated before forcing a reconnect (unset = never)
    #[serde(default)]
    pub max_missed_pongs: Option<u32>,
}

fn default_auto_connect() -> bool {
    true
}

fn default_reconnect_delay_ms() -> u64 {
    3000
}

fn default_max_reconnect_attempts() -> usize {
    10
}

fn default_keep_alive_period_ms() -> u64 {
    30_000
}

impl ClientConfig {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            address: String::new(),
            user_id: user_id.into(),
            session_id: None,
            context: None,
            auto_connect: default_auto_connect(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            keep_alive_period_ms: default_keep_alive_period_ms(),
            max_missed_pongs: None,
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn keep_alive_period(&self) -> Duration {
        Duration::from_millis(self.keep_alive_period_ms)
    }

    /// Check if an address is configured
    pub fn has_address(&self) -> bool {
        !self.address.trim().is_empty()
    }

    /// Validate values that would break the driver
    ///
    /// A missing address is not rejected here: it surfaces as a
    /// configuration error in the connection state when `connect` runs.
    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(ChatLinkError::Configuration(
                "user_id cannot be empty".to_string(),
            ));
        }
        if self.keep_alive_period_ms == 0 {
            return Err(ChatLinkError::Configuration(
                "keep_alive_period_ms must be greater than 0".to_string(),
            ));
        }
        if self.max_missed_pongs == Some(0) {
            return Err(ChatLinkError::Configuration(
                "max_missed_pongs must be greater than 0 when set".to_string(),
            ));
        }
        Ok(())
    }
}
