//! Lifecycle transition events published to the UI/API layer.
//!
//! Every status change of a managed server produces one of these. The
//! embedding layer should treat the event stream as the source of truth
//! for server state, using `timestamp` to resolve out-of-order delivery.

use crate::domain::ServerStatus;
use serde::{Deserialize, Serialize};

/// A single lifecycle transition of one managed server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionEvent {
    /// Id of the server that transitioned.
    pub server_id: String,
    /// Status before the transition.
    pub from: ServerStatus,
    /// Status after the transition.
    pub to: ServerStatus,
    /// Unix timestamp in milliseconds when the transition was recorded.
    pub timestamp: u64,
}

impl TransitionEvent {
    /// Create a new event stamped with the current time.
    #[must_use]
    pub fn new(server_id: impl Into<String>, from: ServerStatus, to: ServerStatus) -> Self {
        Self {
            server_id: server_id.into(),
            from,
            to,
            timestamp: crate::domain::now_ms(),
        }
    }
}
