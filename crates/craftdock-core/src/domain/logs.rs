//! Console log entries and their one-shot severity classification.

use serde::{Deserialize, Serialize};

/// Where a log line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSource {
    /// Process standard output.
    Stdout,
    /// Process standard error.
    Stderr,
    /// Synthesized by craftdock (command echoes, exit markers).
    System,
}

/// Advisory severity of a log line, derived from its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Default,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Classify a console line by its text, case-insensitively.
    ///
    /// Error markers win over warn markers, which win over info markers.
    /// This is display metadata only and is computed exactly once, when
    /// the entry is created.
    #[must_use]
    pub fn classify(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("[error]") || lower.contains("error:") || lower.contains("exception") {
            Self::Error
        } else if lower.contains("[warn]") || lower.contains("warn:") {
            Self::Warn
        } else if lower.contains("[info]") || lower.contains("info:") {
            Self::Info
        } else {
            Self::Default
        }
    }
}

/// A single immutable console log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
    /// The log line content, without trailing newline.
    pub message: String,
    /// Stream the line arrived on.
    pub source: LogSource,
    /// Severity classified at creation time.
    pub level: LogLevel,
}

impl LogEntry {
    /// Create a new entry with the current timestamp and classified level.
    #[must_use]
    pub fn new(source: LogSource, message: impl Into<String>) -> Self {
        let message = message.into();
        let level = LogLevel::classify(&message);
        Self {
            timestamp: now_ms(),
            message,
            source,
            level,
        }
    }
}

/// Current time as Unix milliseconds.
pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_error_lines() {
        assert_eq!(LogLevel::classify("[ERROR] world corrupted"), LogLevel::Error);
        assert_eq!(
            LogLevel::classify("java.lang.NullPointerException at ..."),
            LogLevel::Error
        );
    }

    #[test]
    fn classifies_info_lines() {
        assert_eq!(LogLevel::classify("Server thread/INFO: Done"), LogLevel::Info);
        assert_eq!(LogLevel::classify("[Info] loading world"), LogLevel::Info);
    }

    #[test]
    fn classifies_warn_lines() {
        assert_eq!(LogLevel::classify("[WARN] can't keep up"), LogLevel::Warn);
        assert_eq!(LogLevel::classify("main/WARN: deprecated"), LogLevel::Warn);
    }

    #[test]
    fn unmarked_lines_are_default() {
        assert_eq!(LogLevel::classify("ok"), LogLevel::Default);
    }

    #[test]
    fn error_wins_over_other_markers() {
        // A line carrying both markers classifies as the more severe one.
        assert_eq!(
            LogLevel::classify("[ERROR] warn: something odd"),
            LogLevel::Error
        );
    }

    #[test]
    fn entry_is_classified_once_at_creation() {
        let entry = LogEntry::new(LogSource::Stdout, "[WARN] low memory");
        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(entry.source, LogSource::Stdout);
        assert!(entry.timestamp > 0);
    }
}
