use super::Context;
use serde::{Deserialize, Serialize};

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Ai,
}

/// A chat message as delivered by the peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    /// Peer-formatted timestamp (ISO 8601)
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
}

/// Decoded inbound frame
///
/// The set of kinds is closed; anything else is rejected by the codec.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Informational notice from the service
    System {
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// A new chat message
    Message { message: ChatMessage },

    /// Handshake accepted, carries the peer-assigned session id
    #[serde(rename_all = "camelCase")]
    AuthSuccess { session_id: String },

    /// The peer acknowledged (or changed) the conversation context
    ContextUpdated {
        #[serde(skip_serializing_if = "Option::is_none")]
        context: Option<Context>,
    },

    /// The peer started or stopped typing
    Typing { typing: bool },

    /// Full session history, oldest first
    History { messages: Vec<ChatMessage> },

    /// Keep-alive acknowledgement
    Pong,

    /// Error reported by the peer. The connection stays open.
    Error { error: String },
}

impl InboundEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::System { .. } => "system",
            InboundEvent::Message { .. } => "message",
            InboundEvent::AuthSuccess { .. } => "auth_success",
            InboundEvent::ContextUpdated { .. } => "context_updated",
            InboundEvent::Typing { .. } => "typing",
            InboundEvent::History { .. } => "history",
            InboundEvent::Pong => "pong",
            InboundEvent::Error { .. } => "error",
        }
    }
}
