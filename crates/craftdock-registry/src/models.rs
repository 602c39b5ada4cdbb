//! Internal API response types for the registry.
//!
//! These types are internal to `craftdock-registry` and are not exposed
//! to consumers. External consumers use the port DTOs defined in
//! `craftdock-core`.

use serde::Deserialize;

/// Response of `GET /search`.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: Vec<SearchHit>,
}

/// One search result.
#[derive(Debug, Deserialize)]
pub struct SearchHit {
    pub project_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub downloads: u64,
    #[serde(default)]
    pub icon_url: Option<String>,
}

/// One version of a project, from `GET /project/{id}/version` or
/// `GET /version/{id}`.
#[derive(Debug, Deserialize)]
pub struct VersionInfo {
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub files: Vec<VersionFile>,
    #[serde(default)]
    pub dependencies: Vec<VersionDependency>,
}

/// A downloadable file within a version.
#[derive(Debug, Deserialize)]
pub struct VersionFile {
    pub url: String,
    pub filename: String,
    #[serde(default)]
    pub primary: bool,
}

/// A dependency declared by a version.
#[derive(Debug, Deserialize)]
pub struct VersionDependency {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub version_id: Option<String>,
    pub dependency_type: String,
}

impl VersionInfo {
    /// The primary file, falling back to the first file when none is
    /// flagged primary (some registries leave the flag unset).
    pub fn primary_file(&self) -> Option<&VersionFile> {
        self.files
            .iter()
            .find(|f| f.primary)
            .or_else(|| self.files.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_file_prefers_flagged() {
        let version: VersionInfo = serde_json::from_value(serde_json::json!({
            "id": "v1",
            "project_id": "p1",
            "files": [
                {"url": "https://cdn/a.jar", "filename": "a.jar", "primary": false},
                {"url": "https://cdn/b.jar", "filename": "b.jar", "primary": true},
            ],
        }))
        .unwrap();
        assert_eq!(version.primary_file().unwrap().filename, "b.jar");
    }

    #[test]
    fn primary_file_falls_back_to_first() {
        let version: VersionInfo = serde_json::from_value(serde_json::json!({
            "id": "v1",
            "project_id": "p1",
            "files": [{"url": "https://cdn/a.jar", "filename": "a.jar"}],
        }))
        .unwrap();
        assert_eq!(version.primary_file().unwrap().filename, "a.jar");
    }

    #[test]
    fn missing_optional_fields_default() {
        let hit: SearchHit = serde_json::from_value(serde_json::json!({
            "project_id": "p1",
            "title": "Example",
        }))
        .unwrap();
        assert!(hit.description.is_none());
        assert_eq!(hit.downloads, 0);
    }
}
