//! Async stream log readers (non-UTF8-safe).
//!
//! Game servers and their tooling can emit non-UTF8 bytes on
//! stdout/stderr. Using `BufReader::lines()` would terminate the reader
//! task on invalid UTF-8, so lines are read as bytes and decoded lossily.

use crate::logs::LogBroadcaster;
use craftdock_core::LogSource;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::debug;

pub fn spawn_stream_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    source: LogSource,
    logs: Arc<LogBroadcaster>,
) {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    // Trim trailing newline(s)
                    if buf.last() == Some(&b'\n') {
                        buf.pop();
                        if buf.last() == Some(&b'\r') {
                            buf.pop();
                        }
                    }

                    let line = String::from_utf8_lossy(&buf).to_string();
                    logs.publish(source, line);
                }
                Err(e) => {
                    debug!(?source, error = %e, "log stream reader exiting due to read error");
                    break;
                }
            }
        }

        debug!(?source, "log stream reader task exiting");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{Duration, sleep};

    #[tokio::test]
    async fn invalid_utf8_is_decoded_lossily() {
        let logs = Arc::new(LogBroadcaster::new());
        let bytes: &[u8] = b"ok line\n\xff\xfe broken\n";

        spawn_stream_reader(bytes, LogSource::Stdout, logs.clone());
        sleep(Duration::from_millis(50)).await;

        let entries = logs.replay(10);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "ok line");
        assert!(entries[1].message.contains("broken"));
    }

    #[tokio::test]
    async fn crlf_line_endings_are_trimmed() {
        let logs = Arc::new(LogBroadcaster::new());
        let bytes: &[u8] = b"windows line\r\n";

        spawn_stream_reader(bytes, LogSource::Stderr, logs.clone());
        sleep(Duration::from_millis(50)).await;

        let entries = logs.replay(10);
        assert_eq!(entries[0].message, "windows line");
        assert_eq!(entries[0].source, LogSource::Stderr);
    }
}
