//! Keep-alive timer for connected links
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  Keep-alive Task    │
//! │  (Tokio spawn)      │
//! │                     │
//! │  Every period:      │
//! │  1. Wait for tick   │
//! │  2. Post tick   ────┼──> driver input channel ──> ConnectionMachine ──> ping frame
//! │  3. Repeat          │
//! └─────────────────────┘
//! ```
//!
//! The task only produces ticks. Building and sending the `ping` frame is the
//! state machine's job, so a tick that arrives after the link changed is
//! recognised by its generation and ignored. The driver aborts the task when
//! the machine asks to stop the keep-alive.

use crate::core::machine::Input;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;

/// Keep-alive loop for one link generation
///
/// Skips the immediate first tick, then posts one `KeepAliveDue` per period
/// until the input channel closes.
pub async fn heartbeat_task(generation: u64, period: Duration, input_tx: UnboundedSender<Input>) {
    let mut ticker = tokio::time::interval(period);
    // Skip the first immediate tick - wait for the first period
    ticker.tick().await;
    // If we miss ticks due to slow processing, skip them rather than bursting
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    debug!(generation, "Keep-alive started with period {:?}", period);

    loop {
        ticker.tick().await;

        let tick = Input::KeepAliveDue {
            generation,
            timestamp: chrono::Utc::now().timestamp_millis(),
        };
        if input_tx.send(tick).is_err() {
            debug!("Driver input channel closed, stopping keep-alive");
            break;
        }
    }
}

/// Spawn the keep-alive task for a link generation
pub fn spawn_heartbeat(
    generation: u64,
    period: Duration,
    input_tx: UnboundedSender<Input>,
) -> JoinHandle<()> {
    tokio::spawn(heartbeat_task(generation, period, input_tx))
}
