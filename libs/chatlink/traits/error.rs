use thiserror::Error;

/// Main error type for chatlink
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatLinkError {
    /// Missing or invalid configuration. Fatal, never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Open or send failure reported by the transport
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed inbound frame
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error frame reported by the remote peer
    #[error("Remote error: {0}")]
    Remote(String),

    /// Connection lost with automatic reconnection exhausted or disabled
    ///
    /// `attempts` counts the retries actually made since the last successful
    /// open. It is 0 when automatic reconnection was off, e.g. after a
    /// manual disconnect.
    #[error(
        "Connection lost, automatic reconnection stopped ({attempts} retries made). Reconnect manually to continue"
    )]
    MaxReconnectExceeded { attempts: usize },

    /// Channel send error
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// Channel receive error
    #[error("Channel receive error: {0}")]
    ChannelReceive(String),
}

impl ChatLinkError {
    /// Errors that put the connection in the terminal `error` state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ChatLinkError::Configuration(_) | ChatLinkError::MaxReconnectExceeded { .. }
        )
    }
}

/// Result type for chatlink operations
pub type Result<T> = std::result::Result<T, ChatLinkError>;
