//! Console log streaming for running servers.
//!
//! Each server gets its own [`LogBroadcaster`]: a bounded ring buffer of
//! recent lines plus a `tokio::sync::broadcast` channel fanning new lines
//! out to any number of observers. Ingestion never blocks; a subscriber
//! that falls behind loses part of its own backlog only.

use craftdock_core::{LogEntry, LogSource};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Maximum number of log lines retained per server.
const MAX_LOG_LINES: usize = 1000;

/// Per-subscriber broadcast queue capacity.
const CHANNEL_CAPACITY: usize = 256;

/// Ring buffer plus broadcast fan-out for one server's console output.
pub struct LogBroadcaster {
    buffer: RwLock<VecDeque<LogEntry>>,
    sender: broadcast::Sender<LogEntry>,
}

impl LogBroadcaster {
    /// Create an empty broadcaster.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            buffer: RwLock::new(VecDeque::with_capacity(MAX_LOG_LINES)),
            sender,
        }
    }

    /// Record one console line and fan it out to subscribers.
    ///
    /// The level is classified once here; subscribers and replays see the
    /// same immutable entry.
    pub fn publish(&self, source: LogSource, message: impl Into<String>) {
        let entry = LogEntry::new(source, message);

        {
            let mut buffer = self.buffer.write().unwrap_or_else(|e| e.into_inner());
            if buffer.len() >= MAX_LOG_LINES {
                buffer.pop_front();
            }
            buffer.push_back(entry.clone());
        }

        // Ignore the error when no subscriber is connected
        let _ = self.sender.send(entry);
    }

    /// Subscribe to the live feed.
    ///
    /// The receiver sees entries published after this call only; use
    /// [`replay`](Self::replay) for the backlog. Dropping the receiver
    /// unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }

    /// The most recent `max_lines` entries, oldest first.
    pub fn replay(&self, max_lines: usize) -> Vec<LogEntry> {
        let buffer = self.buffer.read().unwrap_or_else(|e| e.into_inner());
        let skip = buffer.len().saturating_sub(max_lines);
        buffer.iter().skip(skip).cloned().collect()
    }

    /// Number of buffered entries.
    pub fn len(&self) -> usize {
        self.buffer.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry of per-server broadcasters plus the backend's own channel.
///
/// Buffers survive process exit so a stopped server's last lines remain
/// replayable until the server is deleted.
pub struct LogHub {
    servers: RwLock<HashMap<String, Arc<LogBroadcaster>>>,
    backend: Arc<LogBroadcaster>,
}

impl LogHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self {
            servers: RwLock::new(HashMap::new()),
            backend: Arc::new(LogBroadcaster::new()),
        }
    }

    /// Get or create the broadcaster for a server.
    pub fn broadcaster(&self, server_id: &str) -> Arc<LogBroadcaster> {
        let mut servers = self.servers.write().unwrap_or_else(|e| e.into_inner());
        servers
            .entry(server_id.to_string())
            .or_insert_with(|| Arc::new(LogBroadcaster::new()))
            .clone()
    }

    /// The broadcaster for a server, if it has ever logged.
    pub fn get(&self, server_id: &str) -> Option<Arc<LogBroadcaster>> {
        let servers = self.servers.read().unwrap_or_else(|e| e.into_inner());
        servers.get(server_id).cloned()
    }

    /// Drop a server's broadcaster and its buffered lines.
    pub fn remove(&self, server_id: &str) {
        let mut servers = self.servers.write().unwrap_or_else(|e| e.into_inner());
        servers.remove(server_id);
    }

    /// The backend supervisor's own broadcaster.
    pub fn backend(&self) -> Arc<LogBroadcaster> {
        self.backend.clone()
    }
}

impl Default for LogHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use craftdock_core::LogLevel;

    #[test]
    fn replay_returns_most_recent_in_order() {
        let logs = LogBroadcaster::new();
        for i in 0..5 {
            logs.publish(LogSource::Stdout, format!("line {i}"));
        }

        let replayed = logs.replay(3);
        assert_eq!(replayed.len(), 3);
        assert_eq!(replayed[0].message, "line 2");
        assert_eq!(replayed[2].message, "line 4");
    }

    #[test]
    fn ring_buffer_evicts_oldest() {
        let logs = LogBroadcaster::new();
        for i in 0..(MAX_LOG_LINES + 10) {
            logs.publish(LogSource::Stdout, format!("line {i}"));
        }

        assert_eq!(logs.len(), MAX_LOG_LINES);
        let replayed = logs.replay(MAX_LOG_LINES);
        assert_eq!(replayed[0].message, "line 10");
    }

    #[test]
    fn publish_classifies_level() {
        let logs = LogBroadcaster::new();
        logs.publish(LogSource::Stdout, "[ERROR] something broke");
        assert_eq!(logs.replay(1)[0].level, LogLevel::Error);
    }

    #[tokio::test]
    async fn subscribers_see_only_new_entries() {
        let logs = LogBroadcaster::new();
        logs.publish(LogSource::Stdout, "before");

        let mut rx = logs.subscribe();
        logs.publish(LogSource::Stdout, "after");

        let entry = rx.recv().await.unwrap();
        assert_eq!(entry.message, "after");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn two_subscribers_both_receive() {
        let logs = LogBroadcaster::new();
        let mut a = logs.subscribe();
        let mut b = logs.subscribe();

        logs.publish(LogSource::Stderr, "shared");

        assert_eq!(a.recv().await.unwrap().message, "shared");
        assert_eq!(b.recv().await.unwrap().message, "shared");
    }

    #[tokio::test]
    async fn lagged_subscriber_does_not_block_ingestion() {
        let logs = LogBroadcaster::new();
        let mut slow = logs.subscribe();

        // Overflow the per-subscriber queue
        for i in 0..(CHANNEL_CAPACITY + 50) {
            logs.publish(LogSource::Stdout, format!("line {i}"));
        }

        // The slow subscriber lags but the buffer holds everything
        assert!(matches!(
            slow.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
        assert_eq!(logs.len(), CHANNEL_CAPACITY + 50);
    }

    #[test]
    fn hub_reuses_broadcaster_per_server() {
        let hub = LogHub::new();
        let a = hub.broadcaster("srv1");
        a.publish(LogSource::System, "hello");

        let b = hub.broadcaster("srv1");
        assert_eq!(b.len(), 1);

        hub.remove("srv1");
        assert!(hub.get("srv1").is_none());
    }
}
