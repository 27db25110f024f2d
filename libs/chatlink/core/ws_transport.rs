//! WebSocket transport built on tokio-tungstenite
//!
//! Each opened link owns one socket task. Outbound frames reach the task
//! over an unbounded channel, so [`TransportLink::send`] never blocks the
//! state machine; everything the socket does is reported back as
//! [`LinkEvent`]s.

use crate::error::{ChatLinkError, Result};
use crate::traits::{LinkEvent, LinkEvents, Transport, TransportLink};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::Request;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Outbound instruction for a socket task
#[derive(Debug)]
enum Outbound {
    Frame(String),
    Close,
}

/// Opens WebSocket links
#[derive(Debug, Clone, Default)]
pub struct WsTransport;

impl WsTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for WsTransport {
    fn open(&self, address: &str, events: LinkEvents) -> Result<Box<dyn TransportLink>> {
        let request = address
            .into_client_request()
            .map_err(|e| ChatLinkError::Transport(format!("invalid address '{}': {}", address, e)))?;

        let (out_tx, out_rx) = tokio::sync::mpsc::unbounded_channel();
        tokio::spawn(run_socket(request, out_rx, events));

        Ok(Box::new(WsLink { out_tx }))
    }
}

/// Handle to one socket task
struct WsLink {
    out_tx: UnboundedSender<Outbound>,
}

impl TransportLink for WsLink {
    fn send(&self, frame: &str) -> Result<()> {
        self.out_tx
            .send(Outbound::Frame(frame.to_string()))
            .map_err(|_| ChatLinkError::Transport("link is closed".to_string()))
    }

    fn close(&self) {
        let _ = self.out_tx.send(Outbound::Close);
    }
}

/// Socket task: connect, then pump frames both ways until either side ends
async fn run_socket(
    request: Request<()>,
    mut out_rx: UnboundedReceiver<Outbound>,
    events: LinkEvents,
) {
    let generation = events.generation();
    let uri = request.uri().to_string();

    let ws_stream = match connect_async(request).await {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            error!(generation, "Failed to connect to {}: {}", uri, e);
            events.emit(LinkEvent::Error(e.to_string()));
            events.emit(LinkEvent::Closed {
                reason: Some("connect failed".to_string()),
            });
            return;
        }
    };

    info!(generation, "WebSocket open: {}", uri);
    if !events.emit(LinkEvent::Open) {
        debug!(generation, "Nobody listening, dropping fresh socket");
        return;
    }

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            outbound = out_rx.recv() => match outbound {
                Some(Outbound::Frame(text)) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        warn!(generation, "WebSocket write failed: {}", e);
                        events.emit(LinkEvent::Error(e.to_string()));
                        events.emit(LinkEvent::Closed { reason: Some("write failed".to_string()) });
                        return;
                    }
                }
                Some(Outbound::Close) | None => {
                    debug!(generation, "Closing WebSocket");
                    let _ = write.close().await;
                    return;
                }
            },

            inbound = read.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    events.emit(LinkEvent::Message(text));
                }
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                    Ok(text) => {
                        events.emit(LinkEvent::Message(text));
                    }
                    Err(_) => warn!(generation, "Ignoring non UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .filter(|r| !r.is_empty());
                    info!(generation, "WebSocket closed by peer");
                    events.emit(LinkEvent::Closed { reason });
                    return;
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Err(e)) => {
                    warn!(generation, "WebSocket error: {}", e);
                    events.emit(LinkEvent::Error(e.to_string()));
                    events.emit(LinkEvent::Closed { reason: Some("stream error".to_string()) });
                    return;
                }
                None => {
                    warn!(generation, "WebSocket stream ended");
                    events.emit(LinkEvent::Closed { reason: Some("stream ended".to_string()) });
                    return;
                }
            },
        }
    }
}
