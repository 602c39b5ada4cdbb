//! Installed add-on packages and install results.

use serde::{Deserialize, Serialize};

/// A dependency declared by a package version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDependency {
    /// Registry id of the package this dependency points at.
    pub package_id: String,
    /// Optional version constraint; `None` means "any compatible".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_constraint: Option<String>,
}

impl PackageDependency {
    #[must_use]
    pub fn new(package_id: impl Into<String>) -> Self {
        Self {
            package_id: package_id.into(),
            version_constraint: None,
        }
    }
}

/// An add-on file written into a server's add-on directory.
///
/// Uniqueness key is the filename within one server: a file with the same
/// name is treated as the same package regardless of its actual contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstalledPackage {
    /// File name inside the add-on directory.
    pub filename: String,
    /// Display name from the registry (file stem when unknown).
    pub name: String,
    /// Registry version id this file came from, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    /// File size in bytes.
    pub size: u64,
    /// Dependencies the chosen version declared.
    #[serde(default)]
    pub dependencies: Vec<PackageDependency>,
}

/// Flat result of an install cascade.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallResult {
    /// Packages written during this call, requested one first.
    pub installed: Vec<InstalledPackage>,
    /// Package ids that were skipped: already present on disk, already
    /// processed in this call, or unresolvable dependencies.
    pub skipped: Vec<String>,
}
