//! Progress reporting for Deep Thought runs.
//!
//! The engine reports once per phase transition (ACK, WORK, THINK, FINAL),
//! never once per tool call. Observers are invoked synchronously on the run's
//! own task, so they must return quickly.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::orchestration::classify::TurnPhase;

/// One progress report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressUpdate {
    /// Turn that produced the transition.
    pub current_turn: u32,
    /// Turn budget of the run.
    pub max_turns: u32,
    /// Phase the reply was classified as.
    pub phase: TurnPhase,
    /// Short human-readable status line.
    pub status: String,
    /// Assistant text shown to the user between turns, if any.
    pub intermediate: Option<String>,
}

/// Receives progress updates from the engine.
pub trait ProgressObserver: Send + Sync {
    /// Called on every phase transition.
    fn on_progress(&self, update: &ProgressUpdate);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressUpdate) + Send + Sync,
{
    fn on_progress(&self, update: &ProgressUpdate) {
        self(update);
    }
}

/// Fans progress updates out to any number of subscribers.
pub struct BroadcastProgress {
    broadcast_tx: broadcast::Sender<ProgressUpdate>,
}

impl BroadcastProgress {
    /// Creates a broadcaster buffering up to `capacity` updates per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (broadcast_tx, _) = broadcast::channel(capacity.max(1));
        Self { broadcast_tx }
    }

    /// Subscribes to progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressUpdate> {
        self.broadcast_tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.broadcast_tx.receiver_count()
    }
}

impl Default for BroadcastProgress {
    fn default() -> Self {
        Self::new(64)
    }
}

impl ProgressObserver for BroadcastProgress {
    fn on_progress(&self, update: &ProgressUpdate) {
        // No subscribers is not an error.
        let _ = self.broadcast_tx.send(update.clone());
        debug!(turn = update.current_turn, phase = %update.phase, "Progress update");
    }
}

impl std::fmt::Debug for BroadcastProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastProgress").field("subscribers", &self.subscriber_count()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn update(turn: u32, phase: TurnPhase) -> ProgressUpdate {
        ProgressUpdate {
            current_turn: turn,
            max_turns: 3,
            phase,
            status: format!("turn {turn}"),
            intermediate: None,
        }
    }

    #[test]
    fn test_closure_observer() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer = move |u: &ProgressUpdate| sink.lock().unwrap().push(u.phase);

        observer.on_progress(&update(1, TurnPhase::Ack));
        observer.on_progress(&update(2, TurnPhase::Final));

        assert_eq!(*seen.lock().unwrap(), vec![TurnPhase::Ack, TurnPhase::Final]);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_subscriber() {
        let progress = BroadcastProgress::new(8);
        let mut first = progress.subscribe();
        let mut second = progress.subscribe();
        assert_eq!(progress.subscriber_count(), 2);

        progress.on_progress(&update(1, TurnPhase::Work));

        assert_eq!(first.recv().await.unwrap().phase, TurnPhase::Work);
        assert_eq!(second.recv().await.unwrap().current_turn, 1);
    }

    #[test]
    fn test_broadcast_without_subscribers_is_silent() {
        let progress = BroadcastProgress::default();
        progress.on_progress(&update(1, TurnPhase::Think));
        assert_eq!(progress.subscriber_count(), 0);
    }
}
