//! Install cascade over the registry port.

use craftdock_core::{
    InstallError, InstallResult, InstalledPackage, Loader, PackageVersion, RegistryPort,
    RegistryPortError,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Hard ceiling on the dependency walk. A well-formed graph stays far
/// below this; exceeding it points at a malformed registry response.
const MAX_DEPTH: usize = 20;

/// Installer for add-on packages and their required dependencies.
///
/// Files are keyed by filename within the add-on directory: a file that
/// is already present is never re-downloaded, even if it came from a
/// different version. That can mask stale versions; remove the file
/// first to force a fresh download.
pub struct AddonInstaller {
    registry: Arc<dyn RegistryPort>,
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AddonInstaller {
    /// Create an installer over a registry.
    pub fn new(registry: Arc<dyn RegistryPort>) -> Self {
        Self {
            registry,
            locks: StdMutex::new(HashMap::new()),
        }
    }

    fn dir_lock(&self, addon_dir: &Path) -> Arc<Mutex<()>> {
        let key = addon_dir.to_string_lossy().to_string();
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Install `package_id` and its required dependencies into
    /// `addon_dir`.
    ///
    /// The requested package with no compatible version fails with
    /// `NoCompatibleVersion` before anything is written; an unresolvable
    /// dependency is skipped with a warning and never fails the install.
    pub async fn install(
        &self,
        addon_dir: &Path,
        package_id: &str,
        loader: Loader,
        game_version: &str,
    ) -> Result<InstallResult, InstallError> {
        let lock = self.dir_lock(addon_dir);
        let _guard = lock.lock().await;

        fs::create_dir_all(addon_dir).await?;

        let mut result = InstallResult::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut installed_ids: HashSet<String> = HashSet::new();
        let mut worklist: VecDeque<(String, Option<String>, usize)> = VecDeque::new();
        worklist.push_back((package_id.to_string(), None, 0));

        while let Some((current, constraint, depth)) = worklist.pop_front() {
            if depth > MAX_DEPTH {
                return Err(InstallError::DependencyTooDeep {
                    package_id: current,
                    max_depth: MAX_DEPTH,
                });
            }
            if !seen.insert(current.clone()) {
                // A package this call already installed (a shared
                // dependency or a cycle edge) is not reported skipped
                if !installed_ids.contains(&current) && !result.skipped.contains(&current) {
                    result.skipped.push(current);
                }
                continue;
            }
            let is_root = depth == 0;

            let version =
                match self.resolve(&current, constraint.as_deref(), loader, game_version).await {
                    Ok(Some(version)) => version,
                    Ok(None) if is_root => {
                        return Err(InstallError::NoCompatibleVersion {
                            package_id: current,
                            loader,
                            game_version: game_version.to_string(),
                        });
                    }
                    Ok(None) => {
                        warn!(
                            package_id = %current,
                            %loader,
                            %game_version,
                            "no compatible version for dependency, skipping"
                        );
                        result.skipped.push(current);
                        continue;
                    }
                    Err(e) => return Err(e),
                };

            let target = addon_dir.join(&version.filename);
            if target.exists() {
                debug!(package_id = %current, filename = %version.filename, "already installed");
                result.skipped.push(current);
                continue;
            }

            let bytes = self.registry.download(&version.version_id).await?;
            fs::write(&target, &bytes).await?;
            info!(
                package_id = %current,
                filename = %version.filename,
                size = bytes.len(),
                "installed add-on"
            );

            for dep in &version.dependencies {
                worklist.push_back((
                    dep.package_id.clone(),
                    dep.version_constraint.clone(),
                    depth + 1,
                ));
            }

            installed_ids.insert(current);
            result.installed.push(InstalledPackage {
                name: file_stem(&version.filename),
                filename: version.filename,
                version_id: Some(version.version_id),
                size: bytes.len() as u64,
                dependencies: version.dependencies,
            });
        }

        Ok(result)
    }

    /// Pick a version for a package: the constrained version id when it
    /// is listed, otherwise the registry's first (its preferred) one.
    async fn resolve(
        &self,
        package_id: &str,
        constraint: Option<&str>,
        loader: Loader,
        game_version: &str,
    ) -> Result<Option<PackageVersion>, InstallError> {
        let versions = match self
            .registry
            .list_versions(package_id, loader, game_version)
            .await
        {
            Ok(versions) => versions,
            // A dependency id the registry no longer knows behaves like
            // "no compatible version"
            Err(RegistryPortError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if let Some(wanted) = constraint {
            if let Some(version) = versions.iter().find(|v| v.version_id == wanted) {
                return Ok(Some(version.clone()));
            }
        }
        Ok(versions.into_iter().next())
    }

    /// Delete one installed file. Dependencies that nothing else uses
    /// are left behind; there is no orphan cascade.
    pub async fn remove(&self, addon_dir: &Path, filename: &str) -> Result<(), InstallError> {
        validate_filename(filename)?;
        let lock = self.dir_lock(addon_dir);
        let _guard = lock.lock().await;

        match fs::remove_file(addon_dir.join(filename)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Files currently present in the add-on directory.
    pub async fn list_installed(
        &self,
        addon_dir: &Path,
    ) -> Result<Vec<InstalledPackage>, InstallError> {
        let mut installed = Vec::new();
        let mut entries = match fs::read_dir(addon_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(installed),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let filename = entry.file_name().to_string_lossy().to_string();
            let size = entry.metadata().await?.len();
            installed.push(InstalledPackage {
                name: file_stem(&filename),
                filename,
                version_id: None,
                size,
                dependencies: Vec::new(),
            });
        }

        installed.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(installed)
    }
}

/// Reject names that would escape the add-on directory.
fn validate_filename(filename: &str) -> Result<(), InstallError> {
    if filename.is_empty() || filename.contains('/') || filename.contains('\\') {
        return Err(InstallError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid add-on filename: {filename}"),
        )));
    }
    Ok(())
}

fn file_stem(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .map_or_else(|| filename.to_string(), |s| s.to_string_lossy().to_string())
}
