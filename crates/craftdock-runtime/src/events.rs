//! Lifecycle event broadcasting.
//!
//! Every status transition the lifecycle manager performs is published
//! here so UI layers can follow server state without polling.

use craftdock_core::{ServerStatus, TransitionEvent};
use tokio::sync::broadcast;
use tracing::debug;

/// Broadcast channel capacity for transition events.
const CHANNEL_CAPACITY: usize = 64;

/// Broadcaster for server lifecycle transitions.
pub struct TransitionBroadcaster {
    sender: broadcast::Sender<TransitionEvent>,
}

impl TransitionBroadcaster {
    /// Create a new broadcaster.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish a transition to all subscribers.
    pub fn publish(&self, server_id: &str, from: ServerStatus, to: ServerStatus) {
        let event = TransitionEvent::new(server_id.to_string(), from, to);
        debug!(server_id = %event.server_id, ?from, ?to, "server transition");
        let _ = self.sender.send(event);
    }

    /// Subscribe to transition events.
    pub fn subscribe(&self) -> broadcast::Receiver<TransitionEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for TransitionBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
