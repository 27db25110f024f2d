//! Transport primitive
//!
//! The connection core only needs a duplex text channel that can be opened,
//! written to, closed, and that reports what happens to it. Implementations
//! report events through [`LinkEvents`], which stamps every event with the
//! generation of the link that produced it.
//!
//! ```text
//! ConnectionMachine ──open(address)──> Transport ──spawn──> socket task
//!        ▲                                                      │
//!        └──────────── (generation, LinkEvent) ◄────────────────┘
//! ```
//!
//! Events from a generation older than the machine's current one are
//! dropped, which is how a replaced or manually closed link is detached.

use crate::error::Result;
use tokio::sync::mpsc::UnboundedSender;

/// Something that happened to an opened link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The channel is open and ready for traffic
    Open,
    /// A text frame arrived
    Message(String),
    /// The channel reported a failure. A `Closed` event follows.
    Error(String),
    /// The channel is gone
    Closed { reason: Option<String> },
}

/// Channel carrying link events tagged with their generation
pub type LinkEventSender = UnboundedSender<(u64, LinkEvent)>;

/// Event reporter handed to a transport when a link is opened
#[derive(Debug, Clone)]
pub struct LinkEvents {
    generation: u64,
    tx: LinkEventSender,
}

impl LinkEvents {
    pub fn new(generation: u64, tx: LinkEventSender) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Report an event. Returns false once nobody is listening.
    pub fn emit(&self, event: LinkEvent) -> bool {
        self.tx.send((self.generation, event)).is_ok()
    }
}

/// Opens links to a remote address
pub trait Transport: Send + Sync {
    /// Begin opening a link to `address`
    ///
    /// Must return immediately; the outcome of the open is reported through
    /// `events` (`Open`, or `Error` + `Closed`). An `Err` here means the open
    /// could not even be attempted (e.g. an unparseable address).
    fn open(&self, address: &str, events: LinkEvents) -> Result<Box<dyn TransportLink>>;
}

/// Handle to one opened (or opening) link
pub trait TransportLink: Send {
    /// Hand a text frame to the transport
    fn send(&self, frame: &str) -> Result<()>;

    /// Close the link. Safe to call more than once.
    fn close(&self);
}
