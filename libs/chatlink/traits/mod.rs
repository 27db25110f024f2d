//! # ChatLink Traits
//!
//! Seams between the connection core and its collaborators:
//!
//! - **Transport**: open a duplex text channel and report its events
//! - **ReconnectionStrategy**: decide whether and when to retry
//! - **ConnectionObserver**: caller callbacks for open/close/error/message

pub mod error;
pub mod observer;
pub mod reconnect;
pub mod transport;

// Re-export commonly used types
pub use error::{ChatLinkError, Result};
pub use observer::{ConnectionObserver, NoOpObserver};
pub use reconnect::{FixedDelay, ReconnectionStrategy};
pub use transport::{LinkEvent, LinkEventSender, LinkEvents, Transport, TransportLink};
