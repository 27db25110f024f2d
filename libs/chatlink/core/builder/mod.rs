pub mod states;

use crate::core::client::ChatClient;
use crate::core::config::ClientConfig;
use crate::core::handshake::Session;
use crate::core::machine::{ConnectionMachine, MachineSettings};
use crate::core::ws_transport::WsTransport;
use crate::protocol::Context;
use crate::traits::*;
use states::*;
use std::sync::Arc;
use std::time::Duration;

/// Type-state builder for ChatClient
///
/// This builder uses Rust's type system to enforce that the user identity
/// is set before the client can be built. Every other setting has a default.
pub struct ChatClientBuilder<U>
where
    U: UserState,
{
    _state: TypeState<U>,
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
    observer: Option<Arc<dyn ConnectionObserver>>,
}

impl ChatClientBuilder<NoUser> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: TypeState::new(),
            config: ClientConfig::new(String::new()),
            transport: None,
            reconnect_strategy: None,
            observer: None,
        }
    }

    /// Start from a complete configuration (typically loaded from a file)
    pub fn from_config(config: ClientConfig) -> ChatClientBuilder<HasUser> {
        ChatClientBuilder {
            _state: TypeState::new(),
            config,
            transport: None,
            reconnect_strategy: None,
            observer: None,
        }
    }

    pub fn user_id(self, user_id: impl Into<String>) -> ChatClientBuilder<HasUser> {
        let mut config = self.config;
        config.user_id = user_id.into();

        ChatClientBuilder {
            _state: TypeState::new(),
            config,
            transport: self.transport,
            reconnect_strategy: self.reconnect_strategy,
            observer: self.observer,
        }
    }
}

impl Default for ChatClientBuilder<NoUser> {
    fn default() -> Self {
        Self::new()
    }
}

// Optional configuration methods
impl<U> ChatClientBuilder<U>
where
    U: UserState,
{
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.config.address = address.into();
        self
    }

    /// Resume an existing session
    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.config.session_id = Some(session_id.into());
        self
    }

    pub fn context(mut self, context: Context) -> Self {
        self.config.context = Some(context);
        self
    }

    /// Connect as soon as the client is built (default: true)
    pub fn auto_connect(mut self, enabled: bool) -> Self {
        self.config.auto_connect = enabled;
        self
    }

    /// Fixed delay between reconnection attempts (default: 3s)
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.config.reconnect_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Consecutive failed attempts before the terminal error state (default: 10)
    pub fn max_reconnect_attempts(mut self, attempts: usize) -> Self {
        self.config.max_reconnect_attempts = attempts;
        self
    }

    /// Period between keep-alive pings (default: 30s)
    pub fn keep_alive_period(mut self, period: Duration) -> Self {
        self.config.keep_alive_period_ms = period.as_millis() as u64;
        self
    }

    /// Force a reconnect after this many unanswered keep-alive pings
    ///
    /// Off by default: an unanswered ping never tears the link down.
    pub fn max_missed_pongs(mut self, missed: u32) -> Self {
        self.config.max_missed_pongs = Some(missed);
        self
    }

    /// Replace the reconnection strategy built from the delay/attempt settings
    pub fn reconnect_strategy(mut self, strategy: impl ReconnectionStrategy + 'static) -> Self {
        self.reconnect_strategy = Some(Box::new(strategy));
        self
    }

    /// Use a custom transport instead of WebSocket
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn observer(mut self, observer: impl ConnectionObserver + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

// Build method - only available once the user identity is set
impl ChatClientBuilder<HasUser> {
    /// Validate the configuration and spawn the connection driver
    ///
    /// Must be called inside a Tokio runtime.
    pub fn build(self) -> Result<ChatClient> {
        let config = self.config;
        config.validate()?;

        let strategy = self.reconnect_strategy.unwrap_or_else(|| {
            Box::new(FixedDelay::new(
                config.reconnect_delay(),
                config.max_reconnect_attempts,
            ))
        });
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(WsTransport::new()));

        let settings = MachineSettings {
            address: config.address.clone(),
            keep_alive_period: config.keep_alive_period(),
            max_missed_pongs: config.max_missed_pongs,
        };
        let session = Session::new(config.user_id.clone())
            .with_session_id(config.session_id.clone())
            .with_context(config.context.clone());

        let (link_tx, link_rx) = tokio::sync::mpsc::unbounded_channel();
        let machine = ConnectionMachine::new(settings, session, transport, strategy, link_tx);

        let observer = self
            .observer
            .unwrap_or_else(|| Arc::new(NoOpObserver));

        Ok(ChatClient::spawn(
            machine,
            link_rx,
            observer,
            config.auto_connect,
        ))
    }
}

impl ChatClient {
    /// Start building a client
    pub fn builder() -> ChatClientBuilder<NoUser> {
        ChatClientBuilder::new()
    }
}
