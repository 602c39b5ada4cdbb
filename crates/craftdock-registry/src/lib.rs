//! Modrinth-style add-on registry client for craftdock.
//!
//! Implements the core [`craftdock_core::RegistryPort`] against a
//! Modrinth-v2-shaped HTTP API: package search with loader/version
//! facets, version listing, and binary download. The HTTP layer sits
//! behind a backend trait so tests can inject canned responses.
//!
//! Internal API errors are mapped to `RegistryPortError` at the client
//! boundary; consumers never see reqwest or serde types.

#![deny(unsafe_code)]

mod client;
mod config;
mod error;
mod http;
mod models;

// ============================================================================
// Public API
// ============================================================================

// Client
pub use client::{DefaultRegistryClient, RegistryClient};

// Configuration
pub use config::RegistryClientConfig;

// Silence unused dev-dependency warnings
#[cfg(test)]
use tokio_test as _;
