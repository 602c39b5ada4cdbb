//! Readiness probing for supervised processes.
//!
//! A probe repeatedly runs an async boolean check until it succeeds or
//! the attempt budget runs out. Timing out is a normal outcome for the
//! caller to interpret, never an error.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Result of a bounded readiness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The check succeeded within the attempt budget.
    Ready,
    /// Every attempt failed.
    TimedOut,
}

impl ProbeOutcome {
    /// Whether the probed target became ready.
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Poll `check` until it returns true, at most `max_attempts` times,
/// sleeping `interval` between failed attempts.
///
/// The first attempt runs immediately, so an already-ready target is
/// confirmed without waiting out an interval.
pub async fn await_ready<C, F>(mut check: C, interval: Duration, max_attempts: u32) -> ProbeOutcome
where
    C: FnMut() -> F,
    F: Future<Output = bool>,
{
    for attempt in 1..=max_attempts {
        if check().await {
            debug!(attempt, "probe target ready");
            return ProbeOutcome::Ready;
        }
        if attempt < max_attempts {
            sleep(interval).await;
        }
    }
    ProbeOutcome::TimedOut
}

/// Boolean HTTP GET liveness check against a fixed address.
///
/// One short-timeout request per call; retrying is the prober's job.
pub struct HttpLiveness {
    client: reqwest::Client,
    url: String,
}

impl HttpLiveness {
    /// Create a check against `url` with a two second per-request timeout.
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// True when the target answers with a success status.
    pub async fn check(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(url = %self.url, error = %e, "liveness check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn ready_once_check_passes() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let outcome = await_ready(
            move || {
                let calls = calls_clone.clone();
                async move { calls.fetch_add(1, Ordering::SeqCst) + 1 >= 3 }
            },
            Duration::from_millis(1),
            10,
        )
        .await;

        assert_eq!(outcome, ProbeOutcome::Ready);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn ready_target_is_confirmed_without_waiting() {
        // A long interval would blow the timeout if the prober slept
        // before the first attempt
        let outcome = tokio::time::timeout(
            Duration::from_millis(100),
            await_ready(|| async { true }, Duration::from_secs(60), 3),
        )
        .await
        .unwrap();
        assert_eq!(outcome, ProbeOutcome::Ready);
    }

    #[tokio::test]
    async fn exhausted_attempts_time_out() {
        let outcome = await_ready(|| async { false }, Duration::from_millis(1), 5).await;
        assert_eq!(outcome, ProbeOutcome::TimedOut);
        assert!(!outcome.is_ready());
    }

    #[tokio::test]
    async fn liveness_check_is_false_for_unreachable_target() {
        // Reserved port on localhost, nothing listens there
        let liveness = HttpLiveness::new("http://127.0.0.1:9/health").unwrap();
        assert!(!liveness.check().await);
    }
}
