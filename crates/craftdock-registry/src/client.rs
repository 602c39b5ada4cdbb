//! Registry client implementing the core registry port.

use crate::config::RegistryClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::http::{HttpBackend, ReqwestBackend};
use crate::models::{SearchResponse, VersionInfo};
use async_trait::async_trait;
use craftdock_core::{
    Loader, PackageDependency, PackageSummary, PackageVersion, RegistryPort, RegistryResult,
};
use tracing::debug;
use url::Url;

/// Default registry client using the reqwest backend.
pub type DefaultRegistryClient = RegistryClient<ReqwestBackend>;

/// Client for a Modrinth-v2-shaped add-on registry.
///
/// Generic over the HTTP backend so tests can inject canned responses.
/// Implements [`RegistryPort`]; all errors cross that boundary as
/// `RegistryPortError`.
pub struct RegistryClient<B: HttpBackend> {
    backend: B,
    base_url: Url,
}

impl DefaultRegistryClient {
    /// Create a client with default configuration.
    pub fn new() -> ClientResult<Self> {
        Self::with_config(RegistryClientConfig::default())
    }

    /// Create a client with custom configuration.
    pub fn with_config(config: RegistryClientConfig) -> ClientResult<Self> {
        let base_url = Url::parse(&config.base_url)?;
        Ok(Self {
            backend: ReqwestBackend::new(&config),
            base_url,
        })
    }
}

impl<B: HttpBackend> RegistryClient<B> {
    /// Create a client with an injected backend, for tests.
    #[cfg(test)]
    pub fn with_backend(backend: B, base_url: &str) -> ClientResult<Self> {
        Ok(Self {
            backend,
            base_url: Url::parse(base_url)?,
        })
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        self.base_url.join(path).map_err(Into::into)
    }

    async fn fetch_version(&self, version_id: &str) -> ClientResult<VersionInfo> {
        let url = self.endpoint(&format!("version/{version_id}"))?;
        self.backend.get_json(&url).await
    }
}

/// Build the search facet expression: a JSON array of OR-groups, one
/// group per constraint, ANDed together by the registry.
fn search_facets(loader: Loader, game_version: Option<&str>) -> String {
    let mut facets = vec![
        vec![format!("project_type:{}", loader.project_type())],
        vec![format!("categories:{}", loader.as_str())],
    ];
    if let Some(gv) = game_version {
        facets.push(vec![format!("versions:{gv}")]);
    }
    serde_json::to_string(&facets).unwrap_or_default()
}

fn to_package_version(info: VersionInfo) -> ClientResult<PackageVersion> {
    let filename = info
        .primary_file()
        .map(|f| f.filename.clone())
        .ok_or_else(|| ClientError::InvalidResponse {
            message: format!("version {} has no files", info.id),
        })?;

    // Only required dependencies with a resolvable project id matter
    // for installation; optional and embedded ones are ignored.
    let dependencies = info
        .dependencies
        .into_iter()
        .filter(|d| d.dependency_type == "required")
        .filter_map(|d| {
            d.project_id.map(|package_id| PackageDependency {
                package_id,
                version_constraint: d.version_id,
            })
        })
        .collect();

    Ok(PackageVersion {
        version_id: info.id,
        package_id: info.project_id,
        filename,
        dependencies,
    })
}

#[async_trait]
impl<B: HttpBackend> RegistryPort for RegistryClient<B> {
    async fn search(
        &self,
        query: &str,
        loader: Loader,
        game_version: Option<&str>,
        limit: u32,
    ) -> RegistryResult<Vec<PackageSummary>> {
        let mut url = self.endpoint("search").map_err(ClientError::from)?;
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("limit", &limit.to_string())
            .append_pair("facets", &search_facets(loader, game_version));

        debug!(%url, "searching registry");
        let response: SearchResponse = self.backend.get_json(&url).await?;

        Ok(response
            .hits
            .into_iter()
            .map(|hit| PackageSummary {
                id: hit.project_id,
                title: hit.title,
                description: hit.description,
                downloads: hit.downloads,
                icon_url: hit.icon_url,
            })
            .collect())
    }

    async fn list_versions(
        &self,
        package_id: &str,
        loader: Loader,
        game_version: &str,
    ) -> RegistryResult<Vec<PackageVersion>> {
        let mut url = self
            .endpoint(&format!("project/{package_id}/version"))
            .map_err(ClientError::from)?;
        url.query_pairs_mut()
            .append_pair("loaders", &format!("[\"{}\"]", loader.as_str()))
            .append_pair("game_versions", &format!("[\"{game_version}\"]"));

        debug!(%url, "listing package versions");
        let versions: Vec<VersionInfo> = self.backend.get_json(&url).await?;

        versions
            .into_iter()
            .map(|v| to_package_version(v).map_err(Into::into))
            .collect()
    }

    async fn download(&self, version_id: &str) -> RegistryResult<Vec<u8>> {
        let info = self.fetch_version(version_id).await?;
        let file = info
            .primary_file()
            .ok_or_else(|| ClientError::InvalidResponse {
                message: format!("version {version_id} has no files"),
            })?;

        let url = Url::parse(&file.url).map_err(ClientError::from)?;
        debug!(%url, filename = %file.filename, "downloading package file");
        let bytes = self.backend.get_bytes(&url).await?;
        Ok(bytes)
    }
}
