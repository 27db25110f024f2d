//! Wire protocol: outbound commands, inbound events and the JSON codec

pub mod codec;
pub mod command;
pub mod context;
pub mod event;

pub use codec::{decode, encode};
pub use command::Command;
pub use context::Context;
pub use event::{ChatMessage, InboundEvent, Role};
