use crate::error::ChatLinkError;
use crate::protocol::InboundEvent;

/// Caller callbacks for connection activity
///
/// All methods have no-op defaults, implement only what you need.
/// Callbacks run on the connection driver task, so keep them short and
/// never block inside them.
///
/// # Example
/// ```ignore
/// struct PrintObserver;
///
/// impl ConnectionObserver for PrintObserver {
///     fn on_message(&self, event: &InboundEvent) {
///         println!("<- {:?}", event);
///     }
/// }
/// ```
pub trait ConnectionObserver: Send + Sync {
    /// The link opened and the handshake was sent
    fn on_open(&self) {}

    /// The link closed without a manual disconnect
    fn on_close(&self, _reason: Option<&str>) {}

    /// A transport, parse, remote or terminal error was recorded
    fn on_error(&self, _error: &ChatLinkError) {}

    /// An inbound frame was decoded
    fn on_message(&self, _event: &InboundEvent) {}
}

/// An observer that ignores everything
pub struct NoOpObserver;

impl ConnectionObserver for NoOpObserver {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_noop_observer_accepts_every_callback() {
        let observer: Arc<dyn ConnectionObserver> = Arc::new(NoOpObserver);

        observer.on_open();
        observer.on_close(Some("bye"));
        observer.on_error(&ChatLinkError::Remote("busy".into()));
        observer.on_message(&InboundEvent::Pong);
    }
}
