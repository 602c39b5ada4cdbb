//! Typed error taxonomy for the orchestration engine.
//!
//! Every caller-visible failure maps to a stable code via `code()`, so UI
//! layers can render kind-specific guidance without parsing messages.

use crate::domain::Loader;
use crate::ports::RegistryPortError;
use thiserror::Error;

/// Errors from server record persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists for the given server id.
    #[error("server not found: {id}")]
    NotFound {
        /// The server id that wasn't found
        id: String,
    },

    /// The record on disk could not be parsed.
    #[error("corrupt server record '{id}': {message}")]
    Corrupt {
        /// The server id whose record is damaged
        id: String,
        /// Parse failure detail
        message: String,
    },

    /// Filesystem failure.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Stable error code for the UI layer.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "server_not_found",
            Self::Corrupt { .. } => "record_corrupt",
            Self::Io(_) => "io",
        }
    }
}

/// Errors from server lifecycle operations.
///
/// Precondition violations are rejected synchronously with no state
/// change; the remaining variants describe process-level failures.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The EULA gate has not been accepted for this server.
    #[error("EULA must be accepted before the server can start")]
    EulaRequired,

    /// A start was requested while the server is not in a startable state.
    #[error("server is already running")]
    AlreadyRunning,

    /// A stop or command was requested while no process is attached.
    #[error("server is not running")]
    NotRunning,

    /// Another lifecycle operation holds this server's operation lock.
    #[error("another operation is in progress for this server")]
    OperationInProgress,

    /// Destructive operation attempted while the server is not settled.
    #[error("server must be stopped first")]
    NotStopped,

    /// The server process could not be spawned.
    #[error("failed to spawn server process: {message}")]
    SpawnFailed {
        /// OS-level failure detail
        message: String,
    },

    /// The process refused to die within the escalation budget.
    #[error("server process did not exit within the shutdown budget")]
    ShutdownTimedOut,

    /// Underlying record store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Filesystem failure outside the store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LifecycleError {
    /// Stable error code for the UI layer.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EulaRequired => "eula_required",
            Self::AlreadyRunning => "already_running",
            Self::NotRunning => "not_running",
            Self::OperationInProgress => "operation_in_progress",
            Self::NotStopped => "not_stopped",
            Self::SpawnFailed { .. } => "spawn_failed",
            Self::ShutdownTimedOut => "shutdown_timed_out",
            Self::Store(e) => e.code(),
            Self::Io(_) => "io",
        }
    }
}

/// Errors from the add-on installer.
#[derive(Debug, Error)]
pub enum InstallError {
    /// The requested package has no version for this loader/game version.
    #[error("no compatible version of '{package_id}' for {loader} {game_version}")]
    NoCompatibleVersion {
        /// The requested package
        package_id: String,
        /// Loader the server runs
        loader: Loader,
        /// Game version the server targets
        game_version: String,
    },

    /// The dependency walk exceeded the hard depth ceiling, which points
    /// at a malformed registry response rather than a real graph.
    #[error("dependency graph exceeded depth {max_depth} while resolving '{package_id}'")]
    DependencyTooDeep {
        /// Package whose dependency pushed past the ceiling
        package_id: String,
        /// The configured ceiling
        max_depth: usize,
    },

    /// The registry could not be reached or answered badly.
    #[error(transparent)]
    Registry(#[from] RegistryPortError),

    /// Writing into the add-on directory failed.
    #[error("installer I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl InstallError {
    /// Stable error code for the UI layer.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NoCompatibleVersion { .. } => "no_compatible_version",
            Self::DependencyTooDeep { .. } => "dependency_too_deep",
            Self::Registry(_) => "registry",
            Self::Io(_) => "io",
        }
    }
}
