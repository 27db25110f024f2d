//! Outbound queue
//!
//! Holds already-encoded frames issued while the connection was not ready.
//! Frames leave the queue only after being handed to the transport, in the
//! order they were enqueued.

use crate::traits::TransportLink;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Result of a flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub sent: usize,
    pub failed: usize,
}

/// FIFO buffer of encoded outbound frames
#[derive(Debug, Default)]
pub struct OutboundQueue {
    frames: VecDeque<String>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, frame: String) {
        self.frames.push_back(frame);
        debug!(queued = self.frames.len(), "Frame queued until connection is ready");
    }

    /// Transmit every queued frame in insertion order
    ///
    /// Only call with a link that is confirmed open. The queue is cleared
    /// once the iteration completes; a frame the transport refuses is logged
    /// and dropped rather than re-queued.
    pub fn flush(&mut self, link: &dyn TransportLink) -> FlushReport {
        let mut report = FlushReport::default();

        for frame in &self.frames {
            match link.send(frame) {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    warn!("Dropping queued frame after send failure: {}", e);
                    report.failed += 1;
                }
            }
        }
        self.frames.clear();

        if report.sent + report.failed > 0 {
            debug!(sent = report.sent, failed = report.failed, "Outbound queue flushed");
        }
        report
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.frames.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ChatLinkError, Result};
    use parking_lot::Mutex;

    struct RecordingLink {
        sent: Mutex<Vec<String>>,
        refuse: Option<&'static str>,
    }

    impl TransportLink for RecordingLink {
        fn send(&self, frame: &str) -> Result<()> {
            if self.refuse == Some(frame) {
                return Err(ChatLinkError::Transport("refused".into()));
            }
            self.sent.lock().push(frame.to_string());
            Ok(())
        }

        fn close(&self) {}
    }

    #[test]
    fn test_flush_preserves_order_and_clears() {
        let mut queue = OutboundQueue::new();
        for frame in ["a", "b", "c"] {
            queue.enqueue(frame.to_string());
        }
        assert_eq!(queue.iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);

        let link = RecordingLink {
            sent: Mutex::new(Vec::new()),
            refuse: None,
        };
        let report = queue.flush(&link);

        assert_eq!(report, FlushReport { sent: 3, failed: 0 });
        assert_eq!(*link.sent.lock(), vec!["a", "b", "c"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_failed_frame_is_not_requeued() {
        let mut queue = OutboundQueue::new();
        for frame in ["a", "b", "c"] {
            queue.enqueue(frame.to_string());
        }

        let link = RecordingLink {
            sent: Mutex::new(Vec::new()),
            refuse: Some("b"),
        };
        let report = queue.flush(&link);

        assert_eq!(report, FlushReport { sent: 2, failed: 1 });
        assert_eq!(*link.sent.lock(), vec!["a", "c"]);
        assert_eq!(queue.len(), 0);
    }
}
