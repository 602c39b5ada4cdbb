//! Dependency-aware add-on installer for craftdock.
//!
//! Resolves a package against the registry, downloads its primary file
//! into a server's add-on directory, and walks required dependencies
//! transitively. Installs for the same server are serialized; different
//! servers install concurrently.

#![deny(unsafe_code)]

mod installer;

pub use installer::AddonInstaller;

// Silence unused dev-dependency warnings
#[cfg(test)]
use tokio_test as _;
