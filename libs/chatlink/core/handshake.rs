//! Authentication handshake and session state
//!
//! The auth frame carries the caller identity plus whatever the connection
//! has learned so far (peer-assigned session id, last known context), so a
//! reconnect resumes the same conversation.

use crate::protocol::{Command, Context};
use tracing::info;

/// Identity and conversation state replayed on every (re)connect
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub session_id: Option<String>,
    pub user_id: String,
    pub context: Option<Context>,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            session_id: None,
            user_id: user_id.into(),
            context: None,
        }
    }

    pub fn with_session_id(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn with_context(mut self, context: Option<Context>) -> Self {
        self.context = context;
        self
    }

    /// Capture the session id assigned by the peer's acknowledgement
    pub fn accept_auth(&mut self, session_id: String) {
        if self.session_id.as_deref() != Some(session_id.as_str()) {
            info!(session_id = %session_id, "Session established");
        }
        self.session_id = Some(session_id);
    }

    pub fn set_context(&mut self, context: Option<Context>) {
        self.context = context;
    }
}

/// Compose the auth command for the current session
pub fn compose_auth(session: &Session) -> Command {
    Command::Auth {
        user_id: session.user_id.clone(),
        session_id: session.session_id.clone(),
        context: session.context.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_handshake_has_identity_only() {
        let session = Session::new("u1");
        assert_eq!(
            compose_auth(&session),
            Command::Auth {
                user_id: "u1".into(),
                session_id: None,
                context: None,
            }
        );
    }

    #[test]
    fn test_handshake_replays_learned_session_and_context() {
        let mut session = Session::new("u1");
        session.accept_auth("s-42".into());
        session.set_context(Some(Context::new("quotation").with_field("id", "Q-1")));

        match compose_auth(&session) {
            Command::Auth {
                session_id,
                context,
                ..
            } => {
                assert_eq!(session_id.as_deref(), Some("s-42"));
                assert_eq!(context.unwrap().kind(), "quotation");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
