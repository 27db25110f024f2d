//! Connection state machine
//!
//! Every piece of mutable connection state lives in [`ConnectionMachine`]:
//! the lifecycle state, the session, the outbound queue, the reconnect
//! counter, timer tickets and the live link. All activity enters through
//! [`ConnectionMachine::handle`], one [`Input`] at a time, and comes back out
//! as a list of [`Effect`]s for the driver to execute.
//!
//! ```text
//!                connect()                 Open
//! disconnected ───────────> connecting ───────────> connected
//!      ▲                        │                       │
//!      │  ReconnectDue          │ Closed / Error        │ Closed / Error
//!      └──── (counter < max) ◄──┴───────────────────────┘
//!                               │
//!                               └── (counter == max) ──> error
//! ```
//!
//! Frames are written straight to the owned link handle, so the machine can
//! queue a frame the moment the transport refuses it. Timers are the only
//! side effects left to the driver.

use crate::core::client::ClientEvent;
use crate::core::connection_state::ConnectionState;
use crate::core::handshake::{compose_auth, Session};
use crate::core::pong_tracker::PongTracker;
use crate::core::queue::OutboundQueue;
use crate::error::ChatLinkError;
use crate::protocol::{decode, encode, ChatMessage, Command, Context, InboundEvent};
use crate::traits::{
    LinkEvent, LinkEventSender, LinkEvents, ReconnectionStrategy, Transport, TransportLink,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Something the machine must react to
#[derive(Debug, Clone)]
pub enum Input {
    Connect,
    Disconnect,
    Send(String),
    UpdateContext(Option<Context>),
    RequestHistory,
    /// Event reported by the link of the given generation
    Link { generation: u64, event: LinkEvent },
    /// The reconnect timer identified by `ticket` fired
    ReconnectDue { ticket: u64 },
    /// The keep-alive timer of the given link generation fired
    KeepAliveDue { generation: u64, timestamp: i64 },
}

/// Side effect requested by the machine
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ScheduleReconnect { ticket: u64, delay: Duration },
    CancelReconnect,
    StartKeepAlive { generation: u64, period: Duration },
    StopKeepAlive,
    Notify(ClientEvent),
}

/// Static settings of a machine
#[derive(Debug, Clone)]
pub struct MachineSettings {
    pub address: String,
    pub keep_alive_period: Duration,
    /// Unanswered pings tolerated before the link is considered dead
    pub max_missed_pongs: Option<u32>,
}

/// Point-in-time view of the connection for callers
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSnapshot {
    pub state: ConnectionState,
    pub is_connected: bool,
    pub session_id: Option<String>,
    pub context: Option<Context>,
    pub last_event: Option<InboundEvent>,
    pub messages: Vec<ChatMessage>,
    pub last_error: Option<ChatLinkError>,
    pub peer_typing: bool,
    pub queued: usize,
    pub reconnect_attempts: usize,
}

impl Default for ConnectionSnapshot {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            is_connected: false,
            session_id: None,
            context: None,
            last_event: None,
            messages: Vec::new(),
            last_error: None,
            peer_typing: false,
            queued: 0,
            reconnect_attempts: 0,
        }
    }
}

/// Single owner of all connection state
pub struct ConnectionMachine {
    settings: MachineSettings,
    transport: Arc<dyn Transport>,
    strategy: Box<dyn ReconnectionStrategy>,
    link_tx: LinkEventSender,

    state: ConnectionState,
    session: Session,
    queue: OutboundQueue,
    reconnect_attempts: usize,
    /// Retries actually scheduled since the last successful open
    retries_made: usize,

    /// Generation of the current link; events from older links are dropped
    generation: u64,
    link: Option<Box<dyn TransportLink>>,
    pending_reconnect: Option<u64>,
    next_ticket: u64,
    keep_alive_running: bool,
    pongs: PongTracker,

    last_event: Option<InboundEvent>,
    messages: Vec<ChatMessage>,
    last_error: Option<ChatLinkError>,
    peer_typing: bool,
}

impl ConnectionMachine {
    pub fn new(
        settings: MachineSettings,
        session: Session,
        transport: Arc<dyn Transport>,
        strategy: Box<dyn ReconnectionStrategy>,
        link_tx: LinkEventSender,
    ) -> Self {
        Self {
            settings,
            transport,
            strategy,
            link_tx,
            state: ConnectionState::Disconnected,
            session,
            queue: OutboundQueue::new(),
            reconnect_attempts: 0,
            retries_made: 0,
            generation: 0,
            link: None,
            pending_reconnect: None,
            next_ticket: 0,
            keep_alive_running: false,
            pongs: PongTracker::new(),
            last_event: None,
            messages: Vec::new(),
            last_error: None,
            peer_typing: false,
        }
    }

    /// Apply one input and return the effects to execute
    pub fn handle(&mut self, input: Input) -> Vec<Effect> {
        let mut fx = Vec::new();

        match input {
            Input::Connect => self.connect(&mut fx),
            Input::Disconnect => self.disconnect(&mut fx),
            Input::Send(content) => self.send(content, &mut fx),
            Input::UpdateContext(context) => self.update_context(context, &mut fx),
            Input::RequestHistory => self.transmit(Command::History, &mut fx),
            Input::Link { generation, event } => self.on_link_event(generation, event, &mut fx),
            Input::ReconnectDue { ticket } => self.on_reconnect_due(ticket, &mut fx),
            Input::KeepAliveDue {
                generation,
                timestamp,
            } => self.on_keep_alive(generation, timestamp, &mut fx),
        }

        fx
    }

    // ------------------------------------------------------------------
    // Caller operations
    // ------------------------------------------------------------------

    fn connect(&mut self, fx: &mut Vec<Effect>) {
        if matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            debug!("connect() ignored, already {}", self.state);
            return;
        }

        if self.settings.address.trim().is_empty() {
            error!("Cannot connect: address not configured");
            self.state = ConnectionState::Error;
            self.fail(
                ChatLinkError::Configuration("address not configured".to_string()),
                fx,
            );
            return;
        }

        self.cancel_reconnect(fx);
        self.open_link(fx);
    }

    fn disconnect(&mut self, fx: &mut Vec<Effect>) {
        self.cancel_reconnect(fx);
        self.stop_keep_alive(fx);
        self.detach_link();
        self.pongs.reset();
        self.reconnect_attempts = self.strategy.max_attempts();
        self.retries_made = 0;

        if self.state != ConnectionState::Disconnected {
            info!("Disconnected by caller");
        }
        self.state = ConnectionState::Disconnected;
    }

    fn send(&mut self, content: String, fx: &mut Vec<Effect>) {
        if content.trim().is_empty() {
            warn!("Ignoring empty chat message");
            return;
        }
        self.transmit(Command::Chat { content }, fx);
    }

    fn update_context(&mut self, context: Option<Context>, fx: &mut Vec<Effect>) {
        self.session.set_context(context.clone());
        self.transmit(Command::UpdateContext { context }, fx);
    }

    /// Send now if connected, otherwise (or if the transport refuses) queue
    fn transmit(&mut self, command: Command, fx: &mut Vec<Effect>) {
        let kind = command.kind();
        let frame = match encode(&command) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Dropping {} command: {}", kind, e);
                self.fail(e, fx);
                return;
            }
        };

        if self.state == ConnectionState::Connected {
            if let Some(link) = self.link.as_deref() {
                match link.send(&frame) {
                    Ok(()) => {
                        debug!(kind, "Frame sent");
                        return;
                    }
                    Err(e) => warn!("Send of {} failed, queuing: {}", kind, e),
                }
            }
        }

        self.queue.enqueue(frame);
    }

    // ------------------------------------------------------------------
    // Link lifecycle
    // ------------------------------------------------------------------

    fn open_link(&mut self, fx: &mut Vec<Effect>) {
        self.detach_link();
        self.state = ConnectionState::Connecting;

        info!(
            generation = self.generation,
            attempt = self.reconnect_attempts,
            "Connecting to {}",
            self.settings.address
        );

        let events = LinkEvents::new(self.generation, self.link_tx.clone());
        match self.transport.open(&self.settings.address, events) {
            Ok(link) => self.link = Some(link),
            Err(e) => {
                warn!("Failed to open link: {}", e);
                let reason = e.to_string();
                self.fail(e, fx);
                self.on_link_closed(Some(reason), fx);
            }
        }
    }

    /// Close the current link (if any) and make its future events stale
    fn detach_link(&mut self) {
        if let Some(link) = self.link.take() {
            link.close();
        }
        self.generation += 1;
    }

    fn on_link_event(&mut self, generation: u64, event: LinkEvent, fx: &mut Vec<Effect>) {
        if generation != self.generation {
            debug!(
                generation,
                current = self.generation,
                "Ignoring event from detached link"
            );
            return;
        }

        match event {
            LinkEvent::Open => self.on_open(fx),
            LinkEvent::Message(text) => self.on_frame(&text, fx),
            LinkEvent::Error(reason) => self.on_link_error(reason, fx),
            LinkEvent::Closed { reason } => self.on_link_closed(reason, fx),
        }
    }

    fn on_open(&mut self, fx: &mut Vec<Effect>) {
        let Some(link) = self.link.as_deref() else {
            warn!("Open reported without a live link");
            return;
        };

        info!("Connected to {}", self.settings.address);
        self.state = ConnectionState::Connected;
        self.reconnect_attempts = 0;
        self.retries_made = 0;
        self.last_error = None;
        self.pongs.reset();

        // Handshake goes out before anything the caller queued
        match encode(&compose_auth(&self.session)) {
            Ok(frame) => match link.send(&frame) {
                Ok(()) => debug!("Sent authentication handshake"),
                Err(e) => warn!("Failed to send authentication handshake: {}", e),
            },
            Err(e) => error!("Failed to encode authentication handshake: {}", e),
        }

        self.keep_alive_running = true;
        fx.push(Effect::StartKeepAlive {
            generation: self.generation,
            period: self.settings.keep_alive_period,
        });

        let report = self.queue.flush(link);
        if report.sent + report.failed > 0 {
            info!(
                sent = report.sent,
                failed = report.failed,
                "Replayed frames queued while offline"
            );
        }
        fx.push(Effect::Notify(ClientEvent::Connected));
    }

    fn on_link_error(&mut self, reason: String, fx: &mut Vec<Effect>) {
        warn!("Transport error: {}", reason);

        match self.state {
            ConnectionState::Connecting => self.state = ConnectionState::Error,
            ConnectionState::Connected => {
                self.stop_keep_alive(fx);
                self.state = ConnectionState::Disconnected;
            }
            ConnectionState::Disconnected | ConnectionState::Error => {}
        }

        self.fail(ChatLinkError::Transport(reason), fx);
    }

    /// Unplanned loss of the link: apply the reconnection policy
    fn on_link_closed(&mut self, reason: Option<String>, fx: &mut Vec<Effect>) {
        self.detach_link();
        self.stop_keep_alive(fx);

        info!(
            reason = reason.as_deref().unwrap_or("none"),
            "Connection closed"
        );
        fx.push(Effect::Notify(ClientEvent::Disconnected { reason }));

        match self.strategy.next_delay(self.reconnect_attempts) {
            Some(delay) => {
                self.reconnect_attempts += 1;
                self.retries_made += 1;
                self.state = ConnectionState::Disconnected;

                let ticket = self.next_ticket;
                self.next_ticket += 1;
                self.pending_reconnect = Some(ticket);

                info!(
                    "Reconnecting in {:?} (attempt {}/{})",
                    delay,
                    self.reconnect_attempts,
                    self.strategy.max_attempts()
                );
                fx.push(Effect::ScheduleReconnect { ticket, delay });
                fx.push(Effect::Notify(ClientEvent::Reconnecting {
                    attempt: self.reconnect_attempts,
                    delay,
                }));
            }
            None => {
                error!(
                    retries = self.retries_made,
                    "Automatic reconnection stopped, manual reconnect required"
                );
                self.state = ConnectionState::Error;
                self.fail(
                    ChatLinkError::MaxReconnectExceeded {
                        attempts: self.retries_made,
                    },
                    fx,
                );
            }
        }
    }

    fn on_reconnect_due(&mut self, ticket: u64, fx: &mut Vec<Effect>) {
        if self.pending_reconnect != Some(ticket) {
            debug!(ticket, "Ignoring stale reconnect timer");
            return;
        }
        self.pending_reconnect = None;
        self.connect(fx);
    }

    fn on_keep_alive(&mut self, generation: u64, timestamp: i64, fx: &mut Vec<Effect>) {
        if generation != self.generation || self.state != ConnectionState::Connected {
            debug!(generation, "Ignoring stale keep-alive tick");
            return;
        }

        if !self.pongs.is_healthy(self.settings.max_missed_pongs) {
            let missed = self.pongs.missed();
            warn!(missed, "Keep-alive unanswered, treating link as lost");
            self.fail(
                ChatLinkError::Transport(format!("no pong after {} keep-alive pings", missed)),
                fx,
            );
            self.on_link_closed(Some("keep-alive timeout".to_string()), fx);
            return;
        }

        let Some(link) = self.link.as_deref() else {
            return;
        };
        match encode(&Command::Ping { timestamp }) {
            Ok(frame) => match link.send(&frame) {
                Ok(()) => {
                    self.pongs.record_ping_sent();
                    debug!("Keep-alive ping sent");
                }
                Err(e) => warn!("Failed to send keep-alive ping: {}", e),
            },
            Err(e) => error!("Failed to encode keep-alive ping: {}", e),
        }
    }

    // ------------------------------------------------------------------
    // Inbound frames
    // ------------------------------------------------------------------

    fn on_frame(&mut self, text: &str, fx: &mut Vec<Effect>) {
        match decode(text) {
            Ok(event) => self.apply_inbound(event, fx),
            Err(e) => {
                warn!("Dropping malformed frame: {}", e);
                self.fail(e, fx);
            }
        }
    }

    fn apply_inbound(&mut self, event: InboundEvent, fx: &mut Vec<Effect>) {
        debug!(kind = event.kind(), "Inbound event");

        match &event {
            InboundEvent::System { message } => {
                info!("System notice: {}", message.as_deref().unwrap_or(""));
            }
            InboundEvent::Message { message } => self.messages.push(message.clone()),
            InboundEvent::AuthSuccess { session_id } => {
                self.session.accept_auth(session_id.clone());
            }
            InboundEvent::ContextUpdated { context } => {
                if let Some(context) = context {
                    self.session.set_context(Some(context.clone()));
                }
            }
            InboundEvent::Typing { typing } => self.peer_typing = *typing,
            InboundEvent::History { messages } => self.messages = messages.clone(),
            InboundEvent::Pong => self.pongs.record_pong_received(),
            InboundEvent::Error { error } => {
                warn!("Peer reported error: {}", error);
                self.fail(ChatLinkError::Remote(error.clone()), fx);
            }
        }

        fx.push(Effect::Notify(ClientEvent::Message(event.clone())));
        self.last_event = Some(event);
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn fail(&mut self, error: ChatLinkError, fx: &mut Vec<Effect>) {
        self.last_error = Some(error.clone());
        fx.push(Effect::Notify(ClientEvent::Error(error)));
    }

    fn cancel_reconnect(&mut self, fx: &mut Vec<Effect>) {
        if self.pending_reconnect.take().is_some() {
            fx.push(Effect::CancelReconnect);
        }
    }

    fn stop_keep_alive(&mut self, fx: &mut Vec<Effect>) {
        if self.keep_alive_running {
            self.keep_alive_running = false;
            fx.push(Effect::StopKeepAlive);
        }
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn queue(&self) -> &OutboundQueue {
        &self.queue
    }

    pub fn reconnect_attempts(&self) -> usize {
        self.reconnect_attempts
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_pending_reconnect(&self) -> bool {
        self.pending_reconnect.is_some()
    }

    pub fn last_error(&self) -> Option<&ChatLinkError> {
        self.last_error.as_ref()
    }

    pub fn last_event(&self) -> Option<&InboundEvent> {
        self.last_event.as_ref()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot {
            state: self.state,
            is_connected: self.is_connected(),
            session_id: self.session.session_id.clone(),
            context: self.session.context.clone(),
            last_event: self.last_event.clone(),
            messages: self.messages.clone(),
            last_error: self.last_error.clone(),
            peer_typing: self.peer_typing,
            queued: self.queue.len(),
            reconnect_attempts: self.reconnect_attempts,
        }
    }
}
