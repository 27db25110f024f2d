use crate::core::connection_state::{AtomicConnectionState, ConnectionState};
use crate::core::heartbeat::spawn_heartbeat;
use crate::core::machine::{ConnectionMachine, ConnectionSnapshot, Effect, Input};
use crate::error::{ChatLinkError, Result};
use crate::protocol::{ChatMessage, Context, InboundEvent};
use crate::traits::{ConnectionObserver, LinkEvent};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Internal command messages for client control
#[derive(Debug)]
enum ClientCommand {
    Input(Input),
    /// Disconnect and stop the driver
    Shutdown,
}

/// Connection activity reported to the caller
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Link open, handshake sent, queue flushed
    Connected,
    /// Link lost without a manual disconnect
    Disconnected { reason: Option<String> },
    /// A retry is scheduled
    Reconnecting { attempt: usize, delay: Duration },
    /// A decoded inbound frame
    Message(InboundEvent),
    /// An error was recorded
    Error(ChatLinkError),
}

/// Handle to a running connection
///
/// Every control method returns immediately; the effect shows up in the
/// observable state ([`snapshot`](Self::snapshot), [`connection_state`](Self::connection_state))
/// and on the event stream once the driver task has processed it.
///
/// Dropping the handle disconnects and stops the driver.
pub struct ChatClient {
    /// Driver input channel
    command_tx: UnboundedSender<ClientCommand>,
    /// Event channel receiver
    event_rx: Receiver<ClientEvent>,
    /// Lock-free mirror of the connection state
    state: Arc<AtomicConnectionState>,
    /// Last published snapshot
    snapshot: Arc<RwLock<ConnectionSnapshot>>,
    /// Driver task handle
    task_handle: Option<JoinHandle<()>>,
}

impl ChatClient {
    /// Spawn the driver for a machine
    ///
    /// Called by the builder's `build()` method.
    /// Use `ChatClient::builder()` to create a client.
    pub(crate) fn spawn(
        machine: ConnectionMachine,
        link_rx: UnboundedReceiver<(u64, LinkEvent)>,
        observer: Arc<dyn ConnectionObserver>,
        auto_connect: bool,
    ) -> Self {
        let state = Arc::new(AtomicConnectionState::new(machine.state()));
        let snapshot = Arc::new(RwLock::new(machine.snapshot()));
        let (command_tx, command_rx) = tokio::sync::mpsc::unbounded_channel();
        let (event_tx, event_rx) = crossbeam_channel::unbounded();

        if auto_connect {
            let _ = command_tx.send(ClientCommand::Input(Input::Connect));
        }

        let driver = Driver {
            machine,
            observer,
            event_tx,
            state: Arc::clone(&state),
            snapshot: Arc::clone(&snapshot),
            reconnect_timer: None,
            keep_alive: None,
        };
        let task_handle = tokio::spawn(driver.run(command_rx, link_rx));

        Self {
            command_tx,
            event_rx,
            state,
            snapshot,
            task_handle: Some(task_handle),
        }
    }

    fn post(&self, input: Input) -> Result<()> {
        self.command_tx
            .send(ClientCommand::Input(input))
            .map_err(|e| ChatLinkError::ChannelSend(e.to_string()))
    }

    /// Open the connection. No-op while connecting or connected.
    pub fn connect(&self) -> Result<()> {
        self.post(Input::Connect)
    }

    /// Close the connection and stop automatic reconnection. Idempotent.
    pub fn disconnect(&self) -> Result<()> {
        self.post(Input::Disconnect)
    }

    /// Send a chat message, queued while not connected
    pub fn send(&self, content: impl Into<String>) -> Result<()> {
        self.post(Input::Send(content.into()))
    }

    /// Replace the conversation context (or clear it with `None`)
    pub fn update_context(&self, context: Option<Context>) -> Result<()> {
        self.post(Input::UpdateContext(context))
    }

    /// Ask the peer to replay the session history
    pub fn request_history(&self) -> Result<()> {
        self.post(Input::RequestHistory)
    }

    /// Get current connection state
    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Check if connected
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Copy of the last published snapshot
    pub fn snapshot(&self) -> ConnectionSnapshot {
        self.snapshot.read().clone()
    }

    pub fn last_event(&self) -> Option<InboundEvent> {
        self.snapshot.read().last_event.clone()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.snapshot.read().messages.clone()
    }

    pub fn last_error(&self) -> Option<ChatLinkError> {
        self.snapshot.read().last_error.clone()
    }

    pub fn session_id(&self) -> Option<String> {
        self.snapshot.read().session_id.clone()
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv_event(&self) -> Option<ClientEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive an event (blocking)
    pub fn recv_event(&self) -> Result<ClientEvent> {
        self.event_rx
            .recv()
            .map_err(|e| ChatLinkError::ChannelReceive(e.to_string()))
    }

    /// Receive an event, waiting at most `timeout`
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<ClientEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Disconnect, clear all timers and wait for the driver to exit
    pub async fn shutdown(mut self) -> Result<()> {
        info!("Shutting down chat client");
        let _ = self.command_tx.send(ClientCommand::Shutdown);

        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
        Ok(())
    }
}

impl Drop for ChatClient {
    fn drop(&mut self) {
        if self.task_handle.is_some() {
            let _ = self.command_tx.send(ClientCommand::Shutdown);
        }
    }
}

/// Driver task state: the machine plus the timers it asked for
struct Driver {
    machine: ConnectionMachine,
    observer: Arc<dyn ConnectionObserver>,
    event_tx: Sender<ClientEvent>,
    state: Arc<AtomicConnectionState>,
    snapshot: Arc<RwLock<ConnectionSnapshot>>,
    reconnect_timer: Option<JoinHandle<()>>,
    keep_alive: Option<JoinHandle<()>>,
}

impl Driver {
    /// Main driver loop
    ///
    /// Commands, link events and timer firings are serialised through one
    /// `select!`, so the machine never sees two inputs at once.
    async fn run(
        mut self,
        mut command_rx: UnboundedReceiver<ClientCommand>,
        mut link_rx: UnboundedReceiver<(u64, LinkEvent)>,
    ) {
        let (timer_tx, mut timer_rx) = tokio::sync::mpsc::unbounded_channel::<Input>();

        loop {
            let input = tokio::select! {
                cmd = command_rx.recv() => match cmd {
                    Some(ClientCommand::Input(input)) => input,
                    Some(ClientCommand::Shutdown) | None => {
                        debug!("Driver shutting down");
                        self.step(Input::Disconnect, &timer_tx);
                        break;
                    }
                },
                Some((generation, event)) = link_rx.recv() => Input::Link { generation, event },
                Some(input) = timer_rx.recv() => input,
            };

            self.step(input, &timer_tx);
        }

        self.clear_timers();
        info!("Chat client driver exiting");
    }

    fn step(&mut self, input: Input, timer_tx: &UnboundedSender<Input>) {
        let effects = self.machine.handle(input);
        for effect in effects {
            self.apply(effect, timer_tx);
        }
        self.publish();
    }

    fn apply(&mut self, effect: Effect, timer_tx: &UnboundedSender<Input>) {
        match effect {
            Effect::ScheduleReconnect { ticket, delay } => {
                if let Some(old) = self.reconnect_timer.take() {
                    old.abort();
                }
                let tx = timer_tx.clone();
                self.reconnect_timer = Some(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(Input::ReconnectDue { ticket });
                }));
            }
            Effect::CancelReconnect => {
                if let Some(timer) = self.reconnect_timer.take() {
                    timer.abort();
                }
            }
            Effect::StartKeepAlive { generation, period } => {
                if let Some(old) = self.keep_alive.take() {
                    old.abort();
                }
                self.keep_alive = Some(spawn_heartbeat(generation, period, timer_tx.clone()));
            }
            Effect::StopKeepAlive => {
                if let Some(task) = self.keep_alive.take() {
                    task.abort();
                }
            }
            Effect::Notify(event) => self.notify(event),
        }
    }

    fn notify(&self, event: ClientEvent) {
        match &event {
            ClientEvent::Connected => self.observer.on_open(),
            ClientEvent::Disconnected { reason } => self.observer.on_close(reason.as_deref()),
            ClientEvent::Reconnecting { .. } => {}
            ClientEvent::Message(inbound) => self.observer.on_message(inbound),
            ClientEvent::Error(error) => self.observer.on_error(error),
        }
        // Nobody listening is fine
        let _ = self.event_tx.send(event);
    }

    fn publish(&self) {
        self.state.set(self.machine.state());
        *self.snapshot.write() = self.machine.snapshot();
    }

    fn clear_timers(&mut self) {
        if let Some(timer) = self.reconnect_timer.take() {
            timer.abort();
        }
        if let Some(task) = self.keep_alive.take() {
            task.abort();
        }
    }
}
