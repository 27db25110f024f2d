//! PONG Response Tracker
//!
//! Counts keep-alive pings that have not been answered by a `pong` frame.
//! The state machine consults it on every keep-alive tick when a
//! `max_missed_pongs` limit is configured.

/// Tracks outstanding keep-alive pings on the current link
#[derive(Debug, Default, Clone)]
pub struct PongTracker {
    /// Pings sent since the last pong
    outstanding: u32,
    /// Total pongs received on this link
    pongs_received: u64,
}

impl PongTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a PING was just sent
    pub fn record_ping_sent(&mut self) {
        self.outstanding = self.outstanding.saturating_add(1);
    }

    /// Record that a PONG was just received
    pub fn record_pong_received(&mut self) {
        self.outstanding = 0;
        self.pongs_received += 1;
    }

    /// Pings sent since the last pong
    pub fn missed(&self) -> u32 {
        self.outstanding
    }

    pub fn pongs_received(&self) -> u64 {
        self.pongs_received
    }

    /// Check if the link still looks alive
    ///
    /// `None` disables enforcement: the link is always considered healthy.
    pub fn is_healthy(&self, max_missed: Option<u32>) -> bool {
        match max_missed {
            Some(max) => self.outstanding < max,
            None => true,
        }
    }

    /// Reset the tracker state
    ///
    /// Call this when a new link opens.
    pub fn reset(&mut self) {
        self.outstanding = 0;
        self.pongs_received = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_healthy_before_first_ping() {
        let tracker = PongTracker::new();
        assert!(tracker.is_healthy(Some(1)));
    }

    #[test]
    fn test_healthy_after_pong() {
        let mut tracker = PongTracker::new();
        tracker.record_ping_sent();
        tracker.record_ping_sent();
        tracker.record_pong_received();
        assert_eq!(tracker.missed(), 0);
        assert!(tracker.is_healthy(Some(1)));
        assert_eq!(tracker.pongs_received(), 1);
    }

    #[test]
    fn test_unhealthy_after_limit() {
        let mut tracker = PongTracker::new();
        tracker.record_ping_sent();
        assert!(tracker.is_healthy(Some(2)));
        tracker.record_ping_sent();
        assert!(!tracker.is_healthy(Some(2)));
    }

    #[test]
    fn test_unenforced_is_always_healthy() {
        let mut tracker = PongTracker::new();
        for _ in 0..100 {
            tracker.record_ping_sent();
        }
        assert!(tracker.is_healthy(None));
    }

    #[test]
    fn test_reset() {
        let mut tracker = PongTracker::new();
        tracker.record_ping_sent();
        tracker.record_ping_sent();
        assert!(!tracker.is_healthy(Some(2)));

        tracker.reset();
        assert!(tracker.is_healthy(Some(2)));
    }
}
