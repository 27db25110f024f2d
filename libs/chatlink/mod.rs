//! # ChatLink
//!
//! A resilient, message-based connection to a remote conversational service.
//!
//! ## Features
//!
//! - **Single-owner state machine**: every transition is an explicit `(input) -> effects` step
//! - **Authentication handshake**: identity, session and context replayed on every (re)connect
//! - **Outbound queue**: commands issued while offline are flushed in order once connected
//! - **Fixed-interval reconnection**: bounded by a ceiling of consecutive failures
//! - **Keep-alive**: periodic `ping` frames while connected, optional pong enforcement
//! - **Type-state builder**: compile-time guarantee that a user identity is configured

pub mod traits;
pub mod protocol;
pub mod core;

// Re-export all traits
pub use traits::*;

// Re-export the wire protocol
pub use protocol::{ChatMessage, Command, Context, InboundEvent, Role};

// Re-export core client functionality
pub use self::core::{
    builder,
    builder::{states, ChatClientBuilder},
    client::{ChatClient, ClientEvent},
    config::ClientConfig,
    connection_state::{AtomicConnectionState, ConnectionState},
    machine::{ConnectionMachine, ConnectionSnapshot, Effect, Input},
    ws_transport::WsTransport,
};

/// Type alias for Result with ChatLinkError
pub type Result<T> = std::result::Result<T, traits::ChatLinkError>;
