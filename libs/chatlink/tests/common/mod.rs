//! Common test utilities for ChatLink integration tests
//!
//! - [`FakeTransport`] / [`Harness`]: drive a `ConnectionMachine` by hand,
//!   deterministic and without sockets
//! - [`MockWsServer`]: a small WebSocket chat peer for end-to-end runs

#![allow(dead_code)]

use chatlink::core::{ConnectionMachine, Effect, Input, MachineSettings, Session};
use chatlink::{
    ChatLinkError, FixedDelay, LinkEvent, LinkEvents, Result, Transport, TransportLink,
};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Notify;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

// =============================================================================
// Fake transport
// =============================================================================

#[derive(Default)]
struct FakeShared {
    /// Every frame handed to any link, in order
    sent: Mutex<Vec<String>>,
    /// Address passed to every open
    opened: Mutex<Vec<String>>,
    /// Close flag per opened link
    closed: Mutex<Vec<Arc<AtomicBool>>>,
    refuse_open: AtomicBool,
    refuse_send: AtomicBool,
}

/// In-memory transport recording everything the machine does with it
#[derive(Clone, Default)]
pub struct FakeTransport {
    shared: Arc<FakeShared>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<String> {
        self.shared.sent.lock().clone()
    }

    pub fn clear_sent(&self) {
        self.shared.sent.lock().clear();
    }

    pub fn open_count(&self) -> usize {
        self.shared.opened.lock().len()
    }

    pub fn link_closed(&self, index: usize) -> bool {
        self.shared.closed.lock()[index].load(Ordering::Acquire)
    }

    /// Make `open` fail synchronously
    pub fn refuse_open(&self, refuse: bool) {
        self.shared.refuse_open.store(refuse, Ordering::Release);
    }

    /// Make `send` fail on every link
    pub fn refuse_send(&self, refuse: bool) {
        self.shared.refuse_send.store(refuse, Ordering::Release);
    }
}

impl Transport for FakeTransport {
    fn open(&self, address: &str, _events: LinkEvents) -> Result<Box<dyn TransportLink>> {
        if self.shared.refuse_open.load(Ordering::Acquire) {
            return Err(ChatLinkError::Transport("open refused".into()));
        }
        self.shared.opened.lock().push(address.to_string());
        let closed = Arc::new(AtomicBool::new(false));
        self.shared.closed.lock().push(Arc::clone(&closed));

        Ok(Box::new(FakeLink {
            shared: Arc::clone(&self.shared),
            closed,
        }))
    }
}

struct FakeLink {
    shared: Arc<FakeShared>,
    closed: Arc<AtomicBool>,
}

impl TransportLink for FakeLink {
    fn send(&self, frame: &str) -> Result<()> {
        if self.closed.load(Ordering::Acquire) || self.shared.refuse_send.load(Ordering::Acquire) {
            return Err(ChatLinkError::Transport("send refused".into()));
        }
        self.shared.sent.lock().push(frame.to_string());
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

// =============================================================================
// Machine harness
// =============================================================================

/// A `ConnectionMachine` wired to a [`FakeTransport`]
pub struct Harness {
    pub machine: ConnectionMachine,
    pub transport: FakeTransport,
    _link_rx: UnboundedReceiver<(u64, LinkEvent)>,
}

impl Harness {
    pub fn new(address: &str, user_id: &str, max_attempts: usize) -> Self {
        Self::with_settings(
            MachineSettings {
                address: address.to_string(),
                keep_alive_period: Duration::from_secs(30),
                max_missed_pongs: None,
            },
            Session::new(user_id),
            max_attempts,
        )
    }

    pub fn with_settings(settings: MachineSettings, session: Session, max_attempts: usize) -> Self {
        let transport = FakeTransport::new();
        let (link_tx, link_rx) = tokio::sync::mpsc::unbounded_channel();
        let machine = ConnectionMachine::new(
            settings,
            session,
            Arc::new(transport.clone()),
            Box::new(FixedDelay::new(Duration::from_millis(3000), max_attempts)),
            link_tx,
        );

        Self {
            machine,
            transport,
            _link_rx: link_rx,
        }
    }

    pub fn input(&mut self, input: Input) -> Vec<Effect> {
        self.machine.handle(input)
    }

    /// Deliver a link event as the current link
    pub fn link(&mut self, event: LinkEvent) -> Vec<Effect> {
        let generation = self.machine.generation();
        self.machine.handle(Input::Link { generation, event })
    }

    pub fn open(&mut self) -> Vec<Effect> {
        self.link(LinkEvent::Open)
    }

    pub fn close(&mut self) -> Vec<Effect> {
        self.link(LinkEvent::Closed {
            reason: Some("dropped".into()),
        })
    }

    pub fn inbound(&mut self, text: &str) -> Vec<Effect> {
        self.link(LinkEvent::Message(text.to_string()))
    }

    /// connect() followed by a successful open
    pub fn connect_and_open(&mut self) -> Vec<Effect> {
        let mut effects = self.input(Input::Connect);
        effects.extend(self.open());
        effects
    }

    /// Fire the reconnect timer scheduled in `effects`
    pub fn fire_reconnect(&mut self, effects: &[Effect]) -> Vec<Effect> {
        let ticket = scheduled_ticket(effects).expect("no reconnect scheduled");
        self.input(Input::ReconnectDue { ticket })
    }
}

/// Ticket of the reconnect scheduled in `effects`, if any
pub fn scheduled_ticket(effects: &[Effect]) -> Option<u64> {
    effects.iter().find_map(|e| match e {
        Effect::ScheduleReconnect { ticket, .. } => Some(*ticket),
        _ => None,
    })
}

/// Parse frames into JSON for field-level assertions
pub fn frames_json(frames: &[String]) -> Vec<serde_json::Value> {
    frames
        .iter()
        .map(|f| serde_json::from_str(f).expect("frame is JSON"))
        .collect()
}

pub fn kinds(frames: &[String]) -> Vec<String> {
    frames_json(frames)
        .iter()
        .map(|v| v["kind"].as_str().unwrap_or_default().to_string())
        .collect()
}

// =============================================================================
// Mock WebSocket peer
// =============================================================================

/// A minimal chat peer
///
/// - answers `auth` with `auth_success` (session id `s-42`)
/// - answers `chat` with an `ai` message echoing the content
/// - answers `ping` with `pong`
/// - can drop the first N connections right after their handshake
pub struct MockWsServer {
    pub addr: SocketAddr,
    received: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicUsize>,
    drops_remaining: Arc<AtomicUsize>,
    shutdown: Arc<Notify>,
}

impl MockWsServer {
    /// Create and start a new mock WebSocket server
    pub async fn start() -> Self {
        Self::start_dropping(0).await
    }

    /// Start a server that closes the first `drops` connections after auth
    pub async fn start_dropping(drops: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let received = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let drops_remaining = Arc::new(AtomicUsize::new(drops));

        {
            let shutdown = shutdown.clone();
            let received = received.clone();
            let connections = connections.clone();
            let drops_remaining = drops_remaining.clone();

            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        result = listener.accept() => {
                            match result {
                                Ok((stream, _)) => {
                                    connections.fetch_add(1, Ordering::AcqRel);
                                    let shutdown = shutdown.clone();
                                    let received = received.clone();
                                    let drops_remaining = drops_remaining.clone();
                                    tokio::spawn(async move {
                                        Self::handle_connection(stream, shutdown, received, drops_remaining).await;
                                    });
                                }
                                Err(e) => {
                                    eprintln!("Accept error: {}", e);
                                    break;
                                }
                            }
                        }
                        _ = shutdown.notified() => {
                            break;
                        }
                    }
                }
            });
        }

        Self {
            addr,
            received,
            connections,
            drops_remaining,
            shutdown,
        }
    }

    async fn handle_connection(
        stream: tokio::net::TcpStream,
        shutdown: Arc<Notify>,
        received: Arc<Mutex<Vec<String>>>,
        drops_remaining: Arc<AtomicUsize>,
    ) {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::accept_async;
        use tokio_tungstenite::tungstenite::Message;

        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();
        let mut counter = 0u32;

        loop {
            tokio::select! {
                msg = read.next() => {
                    let text = match msg {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => continue,
                    };
                    received.lock().push(text.clone());

                    let frame: serde_json::Value = match serde_json::from_str(&text) {
                        Ok(v) => v,
                        Err(_) => continue,
                    };
                    let reply = match frame["kind"].as_str() {
                        Some("auth") => {
                            let dropping = drops_remaining
                                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
                                .is_ok();
                            if dropping {
                                let _ = write.close().await;
                                break;
                            }
                            serde_json::json!({"kind": "auth_success", "sessionId": "s-42"})
                        }
                        Some("chat") => {
                            counter += 1;
                            serde_json::json!({
                                "kind": "message",
                                "message": {
                                    "id": format!("m{}", counter),
                                    "sessionId": "s-42",
                                    "role": "ai",
                                    "content": format!("echo: {}", frame["content"].as_str().unwrap_or("")),
                                    "timestamp": "2024-05-01T10:00:00Z"
                                }
                            })
                        }
                        Some("ping") => serde_json::json!({"kind": "pong"}),
                        _ => continue,
                    };

                    if write.send(Message::Text(reply.to_string())).await.is_err() {
                        break;
                    }
                }
                _ = shutdown.notified() => {
                    break;
                }
            }
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Frames received so far, across all connections
    pub fn received(&self) -> Vec<String> {
        self.received.lock().clone()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Acquire)
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
