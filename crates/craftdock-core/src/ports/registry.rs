//! Add-on registry port: search, version listing, and binary download.

use crate::domain::{Loader, PackageDependency};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A package as returned by a registry search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSummary {
    /// Registry id of the package.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Short description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Total download count.
    pub downloads: u64,
    /// Icon URL, when the registry provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// A concrete installable version of a package.
///
/// Versions are returned in the registry's own order (most relevant or
/// most recent first); consumers must not re-rank them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageVersion {
    /// Registry id of this version.
    pub version_id: String,
    /// Registry id of the owning package.
    pub package_id: String,
    /// Declared filename of the primary file.
    pub filename: String,
    /// Required dependencies declared by this version.
    #[serde(default)]
    pub dependencies: Vec<PackageDependency>,
}

/// Errors from registry port operations.
///
/// These are domain-level errors that consumers can handle; adapter
/// errors (HTTP, JSON) are mapped to these at the boundary.
#[derive(Debug, Error)]
pub enum RegistryPortError {
    /// The requested package or version does not exist.
    #[error("package not found: {id}")]
    NotFound {
        /// The package or version id that wasn't found
        id: String,
    },

    /// The registry answered with a non-success status.
    #[error("registry request failed with status {status}")]
    RequestFailed {
        /// HTTP status code
        status: u16,
    },

    /// Network or connectivity error.
    #[error("registry network error: {message}")]
    Network {
        /// Description of the network error
        message: String,
    },

    /// The registry answered with something we could not interpret.
    #[error("invalid registry response: {message}")]
    InvalidResponse {
        /// What was invalid
        message: String,
    },
}

/// Result type alias for registry port operations.
pub type RegistryResult<T> = Result<T, RegistryPortError>;

/// Port trait for the external add-on registry.
///
/// # Design
///
/// - Uses core-owned DTOs, not registry API types
/// - Returns `RegistryPortError` for all failures
/// - No retries beyond what the adapter does internally; callers decide
///   whether to retry a whole operation
#[async_trait]
pub trait RegistryPort: Send + Sync {
    /// Search for packages compatible with a loader and game version.
    async fn search(
        &self,
        query: &str,
        loader: Loader,
        game_version: Option<&str>,
        limit: u32,
    ) -> RegistryResult<Vec<PackageSummary>>;

    /// List installable versions of a package, filtered by loader and
    /// game version, in registry order.
    async fn list_versions(
        &self,
        package_id: &str,
        loader: Loader,
        game_version: &str,
    ) -> RegistryResult<Vec<PackageVersion>>;

    /// Download the primary file of a version.
    async fn download(&self, version_id: &str) -> RegistryResult<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    // Verify the trait is object-safe
    fn _assert_object_safe(_: Arc<dyn RegistryPort>) {}

    #[test]
    fn test_error_display() {
        let err = RegistryPortError::NotFound {
            id: "sodium".to_string(),
        };
        assert!(err.to_string().contains("sodium"));

        let err = RegistryPortError::RequestFailed { status: 503 };
        assert!(err.to_string().contains("503"));
    }
}
