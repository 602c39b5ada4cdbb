//! Core domain types and port definitions for craftdock.
//!
//! This crate holds everything the orchestration engine shares across
//! adapters: server records and statuses, log entries, add-on package
//! types, the registry port, typed errors, and the on-disk server store.
//! Nothing in here talks to the network or spawns processes; those
//! concerns live in `craftdock-registry` and `craftdock-runtime`.

#![deny(unsafe_code)]

pub mod domain;
pub mod error;
pub mod events;
pub mod paths;
pub mod ports;
pub mod store;

// Re-export commonly used types for convenience
pub use domain::{
    InstallResult, InstalledPackage, LoaderParseError, Loader, LogEntry, LogLevel, LogSource,
    NewServer, PackageDependency, ServerRecord, ServerStatus,
};
pub use error::{InstallError, LifecycleError, StoreError};
pub use events::TransitionEvent;
pub use paths::{PathError, data_root, ensure_directory, servers_dir};
pub use ports::{
    PackageSummary, PackageVersion, RegistryPort, RegistryPortError, RegistryResult,
};
pub use store::ServerStore;

// Silence unused dev-dependency warnings
#[cfg(test)]
use tokio_test as _;
