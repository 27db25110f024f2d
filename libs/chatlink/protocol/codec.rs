//! Wire codec
//!
//! Frames are standalone JSON objects with a `kind` discriminator. Decoding
//! happens in two steps: the frame is parsed into a `serde_json::Value`, the
//! `kind` is read, then only the body shape for that kind is deserialized.
//! Unknown kinds are rejected instead of being silently skipped.

use super::{ChatMessage, Command, Context, InboundEvent};
use crate::error::{ChatLinkError, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Encode an outbound command to its wire text
pub fn encode(command: &Command) -> Result<String> {
    serde_json::to_string(command)
        .map_err(|e| ChatLinkError::Parse(format!("failed to encode {}: {}", command.kind(), e)))
}

/// Decode an inbound frame
pub fn decode(text: &str) -> Result<InboundEvent> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| ChatLinkError::Parse(format!("invalid JSON: {}", e)))?;

    let kind = match value.get("kind") {
        Some(Value::String(kind)) => kind.clone(),
        Some(_) => return Err(ChatLinkError::Parse("kind must be a string".to_string())),
        None => return Err(ChatLinkError::Parse("frame has no kind".to_string())),
    };

    let event = match kind.as_str() {
        "system" => {
            let body: SystemBody = body(&kind, value)?;
            InboundEvent::System {
                message: body.message,
            }
        }
        "message" => {
            let body: MessageBody = body(&kind, value)?;
            InboundEvent::Message {
                message: body.message,
            }
        }
        "auth_success" => {
            let body: AuthSuccessBody = body(&kind, value)?;
            InboundEvent::AuthSuccess {
                session_id: body.session_id,
            }
        }
        "context_updated" => {
            let body: ContextUpdatedBody = body(&kind, value)?;
            InboundEvent::ContextUpdated {
                context: body.context,
            }
        }
        "typing" => {
            let body: TypingBody = body(&kind, value)?;
            InboundEvent::Typing {
                typing: body.typing,
            }
        }
        "history" => {
            let body: HistoryBody = body(&kind, value)?;
            InboundEvent::History {
                messages: body.messages,
            }
        }
        "pong" => InboundEvent::Pong,
        "error" => {
            let body: ErrorBody = body(&kind, value)?;
            InboundEvent::Error { error: body.error }
        }
        other => {
            return Err(ChatLinkError::Parse(format!("unknown kind '{}'", other)));
        }
    };

    Ok(event)
}

fn body<T: DeserializeOwned>(kind: &str, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| ChatLinkError::Parse(format!("malformed {} frame: {}", kind, e)))
}

#[derive(Deserialize)]
struct SystemBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct MessageBody {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct AuthSuccessBody {
    #[serde(rename = "sessionId")]
    session_id: String,
}

#[derive(Deserialize)]
struct ContextUpdatedBody {
    #[serde(default)]
    context: Option<Context>,
}

#[derive(Deserialize)]
struct TypingBody {
    typing: bool,
}

#[derive(Deserialize)]
struct HistoryBody {
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "message")]
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Role;

    #[test]
    fn test_encode_auth_omits_unknown_session() {
        let cmd = Command::Auth {
            user_id: "u1".into(),
            session_id: None,
            context: None,
        };
        assert_eq!(encode(&cmd).unwrap(), r#"{"kind":"auth","userId":"u1"}"#);
    }

    #[test]
    fn test_encode_auth_with_session_and_context() {
        let cmd = Command::Auth {
            user_id: "u1".into(),
            session_id: Some("s-42".into()),
            context: Some(Context::new("document").with_field("documentId", "d-9")),
        };
        assert_eq!(
            encode(&cmd).unwrap(),
            r#"{"kind":"auth","userId":"u1","sessionId":"s-42","context":{"type":"document","documentId":"d-9"}}"#
        );
    }

    #[test]
    fn test_encode_other_commands() {
        assert_eq!(
            encode(&Command::Chat { content: "hi".into() }).unwrap(),
            r#"{"kind":"chat","content":"hi"}"#
        );
        assert_eq!(
            encode(&Command::UpdateContext { context: None }).unwrap(),
            r#"{"kind":"context","context":null}"#
        );
        assert_eq!(encode(&Command::History).unwrap(), r#"{"kind":"history"}"#);
        assert_eq!(
            encode(&Command::Ping { timestamp: 1700000000123 }).unwrap(),
            r#"{"kind":"ping","timestamp":1700000000123}"#
        );
    }

    #[test]
    fn test_decode_message() {
        let text = r#"{"kind":"message","message":{"id":"m1","sessionId":"s-1","role":"ai","content":"Hello!","timestamp":"2024-05-01T10:00:00Z"}}"#;
        match decode(text).unwrap() {
            InboundEvent::Message { message } => {
                assert_eq!(message.id, "m1");
                assert_eq!(message.role, Role::Ai);
                assert_eq!(message.content, "Hello!");
                assert!(message.context.is_none());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_decode_simple_kinds() {
        assert_eq!(
            decode(r#"{"kind":"auth_success","sessionId":"s-42"}"#).unwrap(),
            InboundEvent::AuthSuccess {
                session_id: "s-42".into()
            }
        );
        assert_eq!(
            decode(r#"{"kind":"typing","typing":true}"#).unwrap(),
            InboundEvent::Typing { typing: true }
        );
        assert_eq!(decode(r#"{"kind":"pong"}"#).unwrap(), InboundEvent::Pong);
        assert_eq!(
            decode(r#"{"kind":"pong","timestamp":17}"#).unwrap(),
            InboundEvent::Pong
        );
        assert_eq!(
            decode(r#"{"kind":"system","message":"welcome"}"#).unwrap(),
            InboundEvent::System {
                message: Some("welcome".into())
            }
        );
        assert_eq!(
            decode(r#"{"kind":"error","error":"rate limited"}"#).unwrap(),
            InboundEvent::Error {
                error: "rate limited".into()
            }
        );
        assert_eq!(
            decode(r#"{"kind":"context_updated"}"#).unwrap(),
            InboundEvent::ContextUpdated { context: None }
        );
        assert_eq!(
            decode(r#"{"kind":"history","messages":[]}"#).unwrap(),
            InboundEvent::History { messages: vec![] }
        );
    }

    #[test]
    fn test_decode_rejects_malformed_frames() {
        let cases = [
            "not json",
            "[1,2,3]",
            r#"{"content":"no kind"}"#,
            r#"{"kind":7}"#,
            r#"{"kind":"teleport"}"#,
            r#"{"kind":"typing"}"#,
            r#"{"kind":"auth_success"}"#,
            r#"{"kind":"message","message":{"id":"m1"}}"#,
        ];

        for text in cases {
            match decode(text) {
                Err(ChatLinkError::Parse(_)) => {}
                other => panic!("expected parse error for {:?}, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_unknown_kind_is_named() {
        let err = decode(r#"{"kind":"teleport"}"#).unwrap_err();
        assert!(err.to_string().contains("teleport"));
    }
}
