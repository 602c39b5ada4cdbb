//! Process runtime for craftdock.
//!
//! Everything that touches the operating system lives here: spawning and
//! supervising game-server processes, streaming their console output to
//! concurrent observers, probing readiness, and driving the server
//! lifecycle state machine.
//!
//! The crate installs no tracing subscriber; the embedding application
//! owns that.

#![deny(unsafe_code)]

pub mod events;
pub mod lifecycle;
pub mod logs;
pub mod probe;
pub mod process;
pub mod supervisor;
pub mod system;

// Lifecycle state machine
pub use lifecycle::{JavaLaunchPlan, LaunchPlan, LifecycleConfig, LifecycleManager};

// Log streaming
pub use logs::{LogBroadcaster, LogHub};

// Lifecycle event fan-out
pub use events::TransitionBroadcaster;

// Readiness probing
pub use probe::{HttpLiveness, ProbeOutcome, await_ready};

// Process primitives
pub use process::{ServerProcess, shutdown_child, spawn_server_process};

// Backend supervision
pub use supervisor::{BackendLocator, BackendSupervisor, SupervisorError};

// System probe
pub use system::{SystemSnapshot, process_alive, snapshot};

// Silence unused dev-dependency warnings
#[cfg(test)]
use tokio_test as _;
