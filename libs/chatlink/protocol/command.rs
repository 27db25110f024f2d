use super::Context;
use serde::Serialize;

/// Outbound command, tagged by `kind` on the wire
///
/// ```text
/// {"kind":"auth","userId":"u1","sessionId":"s-42","context":{...}}
/// {"kind":"chat","content":"hello"}
/// {"kind":"context","context":null}
/// {"kind":"history"}
/// {"kind":"ping","timestamp":1718000000000}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    /// Handshake sent on every transition into `connected`
    #[serde(rename_all = "camelCase")]
    Auth {
        user_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        context: Option<Context>,
    },

    /// User chat message
    Chat { content: String },

    /// Replace (or clear, with `null`) the conversation context
    #[serde(rename = "context")]
    UpdateContext { context: Option<Context> },

    /// Ask the peer to replay the session history
    History,

    /// Keep-alive signal, unix milliseconds
    Ping { timestamp: i64 },
}

impl Command {
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Auth { .. } => "auth",
            Command::Chat { .. } => "chat",
            Command::UpdateContext { .. } => "context",
            Command::History => "history",
            Command::Ping { .. } => "ping",
        }
    }
}
