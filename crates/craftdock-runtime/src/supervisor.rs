//! Backend helper-process supervision.
//!
//! The backend is a single helper executable (asset indexer and download
//! broker) that craftdock starts once and keeps alive for its own
//! lifetime. The supervisor owns the handle internally; there is no
//! global mutable state.

use crate::logs::LogBroadcaster;
use crate::probe::{HttpLiveness, ProbeOutcome, await_ready};
use crate::process::{ServerProcess, spawn_tagged};
use craftdock_core::LogSource;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Readiness probe cadence after spawning the backend.
const PROBE_INTERVAL: Duration = Duration::from_millis(500);
const PROBE_ATTEMPTS: u32 = 60;

/// Errors from backend supervision.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// The backend is already running under this supervisor.
    #[error("backend already started")]
    AlreadyStarted,

    /// The entry point was not found in any candidate location.
    #[error("backend executable '{entry_point}' not found (searched {searched:?} and PATH)")]
    BackendNotFound {
        /// Entry-point file name that was looked for
        entry_point: String,
        /// Candidate directories that were checked
        searched: Vec<PathBuf>,
    },

    /// Spawning the backend process failed.
    #[error("failed to spawn backend: {message}")]
    SpawnFailed {
        /// OS-level failure description
        message: String,
    },
}

/// Ordered search for the backend executable.
///
/// Candidate directories are injected by the embedding application
/// (development tree, packaged resource dir, user config dir); the PATH
/// is the final fallback. First hit wins.
pub struct BackendLocator {
    candidates: Vec<PathBuf>,
    entry_point: String,
}

impl BackendLocator {
    /// Create a locator for `entry_point` searched in `candidates`.
    pub fn new(candidates: Vec<PathBuf>, entry_point: impl Into<String>) -> Self {
        Self {
            candidates,
            entry_point: entry_point.into(),
        }
    }

    /// Resolve the executable path.
    pub fn locate(&self) -> Result<PathBuf, SupervisorError> {
        for dir in &self.candidates {
            let candidate = dir.join(&self.entry_point);
            if candidate.is_file() {
                debug!(path = %candidate.display(), "backend found in candidate directory");
                return Ok(candidate);
            }
        }

        if let Ok(path) = which::which(&self.entry_point) {
            debug!(path = %path.display(), "backend found on PATH");
            return Ok(path);
        }

        Err(SupervisorError::BackendNotFound {
            entry_point: self.entry_point.clone(),
            searched: self.candidates.clone(),
        })
    }
}

/// Supervisor for the backend helper process.
///
/// `start()` is exactly-once per supervisor; a second call is rejected.
/// All backend output is tagged `System` into a dedicated broadcaster.
pub struct BackendSupervisor {
    handle: Mutex<Option<ServerProcess>>,
    logs: Arc<LogBroadcaster>,
    probe_interval: Duration,
    probe_attempts: u32,
}

impl BackendSupervisor {
    /// Create a supervisor logging into `logs`.
    pub fn new(logs: Arc<LogBroadcaster>) -> Self {
        Self {
            handle: Mutex::new(None),
            logs,
            probe_interval: PROBE_INTERVAL,
            probe_attempts: PROBE_ATTEMPTS,
        }
    }

    /// Override the readiness probe cadence.
    #[must_use]
    pub const fn with_probe(mut self, interval: Duration, attempts: u32) -> Self {
        self.probe_interval = interval;
        self.probe_attempts = attempts;
        self
    }

    /// Locate, spawn, and probe the backend. Returns its pid.
    ///
    /// A readiness timeout is logged and tolerated; the backend may still
    /// come up late. Locate and spawn failures are fatal.
    pub async fn start(
        &self,
        locator: &BackendLocator,
        args: &[String],
        health_url: &str,
    ) -> Result<u32, SupervisorError> {
        let mut guard = self.handle.lock().await;
        if guard.is_some() {
            return Err(SupervisorError::AlreadyStarted);
        }

        let executable = locator.locate()?;
        let cwd = executable
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        let process = spawn_tagged(
            &executable.to_string_lossy(),
            args,
            &cwd,
            &self.logs,
            LogSource::System,
            LogSource::System,
        )
        .map_err(|e| SupervisorError::SpawnFailed {
            message: e.to_string(),
        })?;

        let pid = process.pid();
        info!(%pid, path = %executable.display(), "backend started");
        *guard = Some(process);
        drop(guard);

        match HttpLiveness::new(health_url) {
            Ok(liveness) => {
                let outcome = await_ready(
                    || liveness.check(),
                    self.probe_interval,
                    self.probe_attempts,
                )
                .await;
                match outcome {
                    ProbeOutcome::Ready => info!(%health_url, "backend is ready"),
                    ProbeOutcome::TimedOut => {
                        warn!(%health_url, "backend did not become ready in time; continuing");
                    }
                }
            }
            Err(e) => warn!(error = %e, "skipping backend readiness probe"),
        }

        Ok(pid)
    }

    /// Whether a backend process is attached and still alive.
    pub async fn is_running(&self) -> bool {
        let mut guard = self.handle.lock().await;
        match guard.as_mut() {
            Some(process) => match process.try_wait() {
                Ok(None) => true,
                _ => {
                    *guard = None;
                    false
                }
            },
            None => false,
        }
    }

    /// Best-effort forced kill of the backend, if present.
    pub async fn shutdown(&self) {
        let mut guard = self.handle.lock().await;
        if let Some(mut process) = guard.take() {
            info!(pid = %process.pid(), "shutting down backend");
            process.kill().await;
        }
    }
}
