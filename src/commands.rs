//! Console input parsing
//!
//! Lines starting with `/` are commands, anything else is a chat message.

use chatlink::Context;

/// One line of console input
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Send(String),
    History,
    Status,
    Connect,
    Disconnect,
    /// `/context <type> [key=value ...]`, or `/context` alone to clear it
    Context(Option<Context>),
    Help,
    Quit,
    Unknown(String),
}

pub const HELP: &str = "\
/history                        request the session history
/status                         show the connection state
/connect                        connect (or reconnect after an error)
/disconnect                     disconnect and stop reconnecting
/context <type> [key=value ...] replace the conversation context
/context                        clear the conversation context
/quit                           exit
anything else                   send as a chat message";

impl ConsoleCommand {
    /// Parse an input line; blank lines yield `None`
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let Some(rest) = line.strip_prefix('/') else {
            return Some(ConsoleCommand::Send(line.to_string()));
        };

        let mut words = rest.split_whitespace();
        let command = match words.next().unwrap_or_default() {
            "history" => ConsoleCommand::History,
            "status" => ConsoleCommand::Status,
            "connect" => ConsoleCommand::Connect,
            "disconnect" => ConsoleCommand::Disconnect,
            "context" => ConsoleCommand::Context(parse_context(words)),
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            other => ConsoleCommand::Unknown(other.to_string()),
        };
        Some(command)
    }
}

fn parse_context<'a>(mut words: impl Iterator<Item = &'a str>) -> Option<Context> {
    let kind = words.next()?;
    let context = words.fold(Context::new(kind), |context, pair| match pair.split_once('=') {
        Some((key, value)) => context.with_field(key, value),
        None => context.with_field(pair, true),
    });
    Some(context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_a_message() {
        assert_eq!(
            ConsoleCommand::parse("  hello there "),
            Some(ConsoleCommand::Send("hello there".to_string()))
        );
        assert_eq!(ConsoleCommand::parse("   "), None);
    }

    #[test]
    fn test_slash_commands() {
        assert_eq!(ConsoleCommand::parse("/history"), Some(ConsoleCommand::History));
        assert_eq!(ConsoleCommand::parse("/status"), Some(ConsoleCommand::Status));
        assert_eq!(ConsoleCommand::parse("/exit"), Some(ConsoleCommand::Quit));
        assert_eq!(
            ConsoleCommand::parse("/dance"),
            Some(ConsoleCommand::Unknown("dance".to_string()))
        );
    }

    #[test]
    fn test_context_command() {
        let expected = Context::new("quotation")
            .with_field("quotationId", "Q-7")
            .with_field("urgent", true);

        assert_eq!(
            ConsoleCommand::parse("/context quotation quotationId=Q-7 urgent"),
            Some(ConsoleCommand::Context(Some(expected)))
        );
        assert_eq!(
            ConsoleCommand::parse("/context"),
            Some(ConsoleCommand::Context(None))
        );
    }
}
