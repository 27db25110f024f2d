//! # ChatLink core
//!
//! Connection lifecycle and message delivery.
//!
//! ## Example
//!
//! ```rust,ignore
//! use chatlink::{ChatClient, ClientEvent, Context};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> chatlink::Result<()> {
//!     let client = ChatClient::builder()
//!         .user_id("u1")
//!         .address("wss://chat.example.com/ws")
//!         .context(Context::new("quotation").with_field("quotationId", "Q-7"))
//!         .reconnect_delay(Duration::from_secs(3))
//!         .max_reconnect_attempts(10)
//!         .build()?;
//!
//!     // Queued until the handshake went out
//!     client.send("hello")?;
//!
//!     while let Ok(event) = client.recv_event() {
//!         if let ClientEvent::Message(inbound) = event {
//!             println!("<- {:?}", inbound);
//!         }
//!     }
//!
//!     client.shutdown().await
//! }
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;
pub mod handshake;
pub mod heartbeat;
pub mod machine;
pub mod pong_tracker;
pub mod queue;
pub mod ws_transport;

// Re-export main types
pub use builder::{states, ChatClientBuilder};
pub use client::{ChatClient, ClientEvent};
pub use config::ClientConfig;
pub use connection_state::{AtomicConnectionState, ConnectionState};
pub use handshake::Session;
pub use machine::{ConnectionMachine, ConnectionSnapshot, Effect, Input, MachineSettings};
pub use pong_tracker::PongTracker;
pub use queue::{FlushReport, OutboundQueue};
pub use ws_transport::WsTransport;

// Re-export traits for convenience
pub use crate::traits::*;
