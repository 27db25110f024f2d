use anyhow::{Context as _, Result};
use chatlink::{ChatClient, ChatClientBuilder, ClientEvent, InboundEvent, Role};
use chatlink_console::bin_common::{load_config_from_env, parse_args, BinaryRunner, ConfigType, RunConfig};
use chatlink_console::commands::{ConsoleCommand, HELP};
use chatlink_console::config::ConsoleConfig;
use chatlink_console::logging::init_tracing;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// How often the event channel is drained
const EVENT_POLL: Duration = Duration::from_millis(100);

struct ConsoleApp {
    client: Option<ChatClient>,
    run_config: RunConfig,
}

impl ConsoleApp {
    fn new(config: ConsoleConfig) -> Result<Self> {
        let run_config =
            RunConfig::new("Chat Console").with_status_interval(config.status_interval_secs);
        let client = ChatClientBuilder::from_config(config.connection)
            .build()
            .context("failed to start chat client")?;

        Ok(Self {
            client: Some(client),
            run_config,
        })
    }

    /// Returns false once the user asked to quit
    fn handle_line(&self, client: &ChatClient, line: &str) -> Result<bool> {
        let Some(command) = ConsoleCommand::parse(line) else {
            return Ok(true);
        };

        match command {
            ConsoleCommand::Send(content) => client.send(content)?,
            ConsoleCommand::History => client.request_history()?,
            ConsoleCommand::Connect => client.connect()?,
            ConsoleCommand::Disconnect => client.disconnect()?,
            ConsoleCommand::Context(context) => client.update_context(context)?,
            ConsoleCommand::Status => print_status(client),
            ConsoleCommand::Help => println!("{}", HELP),
            ConsoleCommand::Unknown(name) => println!("unknown command /{} (try /help)", name),
            ConsoleCommand::Quit => return Ok(false),
        }
        Ok(true)
    }
}

impl BinaryRunner for ConsoleApp {
    async fn run(&mut self) -> Result<()> {
        let Some(client) = self.client.take() else {
            return Ok(());
        };

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut events = tokio::time::interval(EVENT_POLL);
        let mut status =
            tokio::time::interval(Duration::from_secs(self.run_config.status_interval_secs));
        status.tick().await;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("");
                    info!("Received shutdown signal (Ctrl+C)");
                    break;
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if !self.handle_line(&client, &line)? {
                            break;
                        }
                    }
                    Ok(None) => {
                        info!("Input closed");
                        break;
                    }
                    Err(e) => {
                        warn!("Failed to read input: {}", e);
                        break;
                    }
                },
                _ = events.tick() => {
                    while let Some(event) = client.try_recv_event() {
                        print_event(&event);
                    }
                }
                _ = status.tick() => {
                    info!(
                        "Status: {} ({} messages, {} queued)",
                        client.connection_state(),
                        client.messages().len(),
                        client.snapshot().queued
                    );
                }
            }
        }

        info!("Shutting down gracefully...");
        client.shutdown().await?;
        Ok(())
    }

    fn config(&self) -> &RunConfig {
        &self.run_config
    }
}

fn print_event(event: &ClientEvent) {
    match event {
        ClientEvent::Connected => println!("* connected"),
        ClientEvent::Disconnected { reason } => {
            println!("* disconnected ({})", reason.as_deref().unwrap_or("no reason"))
        }
        ClientEvent::Reconnecting { attempt, delay } => {
            println!("* reconnecting in {:?} (attempt {})", delay, attempt)
        }
        ClientEvent::Error(error) => println!("! {}", error),
        ClientEvent::Message(inbound) => match inbound {
            InboundEvent::Message { message } => {
                let who = match message.role {
                    Role::User => "you",
                    Role::Ai => "ai",
                };
                println!("{}> {}", who, message.content);
            }
            InboundEvent::History { messages } => {
                println!("* history ({} messages)", messages.len());
                for message in messages {
                    println!("  [{}] {}", message.timestamp, message.content);
                }
            }
            InboundEvent::AuthSuccess { session_id } => println!("* session {}", session_id),
            InboundEvent::System { message } => {
                println!("* {}", message.as_deref().unwrap_or("system notice"))
            }
            InboundEvent::ContextUpdated { context } => match context {
                Some(context) => println!("* context: {}", context.kind()),
                None => println!("* context acknowledged"),
            },
            InboundEvent::Typing { typing: true } => println!("* ai is typing..."),
            InboundEvent::Typing { typing: false } | InboundEvent::Pong => {}
            InboundEvent::Error { error } => println!("! peer: {}", error),
        },
    }
}

fn print_status(client: &ChatClient) {
    let snapshot = client.snapshot();
    println!("state:      {}", snapshot.state);
    println!(
        "session:    {}",
        snapshot.session_id.as_deref().unwrap_or("<none>")
    );
    println!(
        "context:    {}",
        snapshot.context.as_ref().map(|c| c.kind()).unwrap_or("<none>")
    );
    println!("messages:   {}", snapshot.messages.len());
    println!("queued:     {}", snapshot.queued);
    println!("reconnects: {}", snapshot.reconnect_attempts);
    if let Some(error) = &snapshot.last_error {
        println!("last error: {}", error);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Optional first argument: path to the config file
    let config_type = parse_args()
        .into_iter()
        .next()
        .map(ConfigType::Custom)
        .unwrap_or(ConfigType::Console);
    let config_path = load_config_from_env(config_type);

    // Load config first (before logging is initialized)
    let config = ConsoleConfig::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    init_tracing(&config.log_level);
    config.log();

    let mut app = ConsoleApp::new(config)?;
    app.execute().await
}
