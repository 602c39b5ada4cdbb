//! On-disk persistence of server records.
//!
//! Layout mirrors the reference: one directory per server under the
//! servers root, holding `config.json`, `eula.txt`, `server.properties`,
//! the server jar, and the add-on directory. Records are small, so every
//! operation reads or writes the whole file.

use crate::domain::{NewServer, ServerRecord};
use crate::error::StoreError;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;
use uuid::Uuid;

const CONFIG_FILE: &str = "config.json";
const EULA_FILE: &str = "eula.txt";
const PROPERTIES_FILE: &str = "server.properties";

/// Store of server records, one directory per server.
#[derive(Debug, Clone)]
pub struct ServerStore {
    root: PathBuf,
}

impl ServerStore {
    /// Create a store rooted at the given servers directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The servers root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of one server.
    #[must_use]
    pub fn server_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    /// Add-on directory of one server (`mods/` or `plugins/` by loader).
    #[must_use]
    pub fn addon_dir(&self, record: &ServerRecord) -> PathBuf {
        self.server_dir(&record.id)
            .join(record.loader.addon_dir_name())
    }

    fn config_path(&self, id: &str) -> PathBuf {
        self.server_dir(id).join(CONFIG_FILE)
    }

    /// Create a new server record and its directory.
    pub async fn create(&self, new: NewServer) -> Result<ServerRecord, StoreError> {
        // Short id, also used as the directory name.
        let id = Uuid::new_v4().simple().to_string()[..8].to_string();
        let record = ServerRecord {
            id: id.clone(),
            name: new.name,
            loader: new.loader,
            version: new.version,
            port: new.port,
            ram_min: new.ram_min,
            ram_max: new.ram_max,
            eula_accepted: false,
            max_players: 20,
            created_at: Utc::now(),
            last_started: None,
        };
        fs::create_dir_all(self.server_dir(&id)).await?;
        self.save(&record).await?;
        Ok(record)
    }

    /// Load one server record.
    pub async fn load(&self, id: &str) -> Result<ServerRecord, StoreError> {
        let path = self.config_path(id);
        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound { id: id.to_string() });
            }
            Err(e) => return Err(StoreError::Io(e)),
        };
        serde_json::from_str(&text).map_err(|e| StoreError::Corrupt {
            id: id.to_string(),
            message: e.to_string(),
        })
    }

    /// Load all server records, skipping unreadable entries with a warning.
    pub async fn load_all(&self) -> Result<Vec<ServerRecord>, StoreError> {
        let mut records = Vec::new();
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(records),
            Err(e) => return Err(StoreError::Io(e)),
        };
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().to_string();
            match self.load(&id).await {
                Ok(record) => records.push(record),
                Err(StoreError::NotFound { .. }) => {}
                Err(e) => warn!(server_id = %id, error = %e, "skipping unreadable server record"),
            }
        }
        Ok(records)
    }

    /// Persist a server record.
    pub async fn save(&self, record: &ServerRecord) -> Result<(), StoreError> {
        let path = self.config_path(&record.id);
        let json = serde_json::to_string_pretty(record).map_err(|e| StoreError::Corrupt {
            id: record.id.clone(),
            message: e.to_string(),
        })?;
        fs::write(&path, json).await?;
        Ok(())
    }

    /// Delete a server directory and everything in it.
    ///
    /// Status gating (only settled servers may be deleted) is the
    /// lifecycle manager's responsibility.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let dir = self.server_dir(id);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound { id: id.to_string() })
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Record EULA consent in both the record and `eula.txt`.
    ///
    /// Only records consent; validating the legal text is not our job.
    pub async fn record_eula(&self, id: &str, accepted: bool) -> Result<ServerRecord, StoreError> {
        let mut record = self.load(id).await?;
        let eula_path = self.server_dir(id).join(EULA_FILE);
        let body = format!(
            "# EULA accepted via craftdock\n# {}\neula={}\n",
            Utc::now().to_rfc3339(),
            accepted
        );
        fs::write(&eula_path, body).await?;
        record.eula_accepted = accepted;
        self.save(&record).await?;
        Ok(record)
    }

    /// Read `server.properties`; a missing file yields an empty list.
    pub async fn read_properties(&self, id: &str) -> Result<Vec<(String, String)>, StoreError> {
        let path = self.server_dir(id).join(PROPERTIES_FILE);
        match fs::read_to_string(&path).await {
            Ok(text) => Ok(parse_properties(&text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Write `server.properties`, preserving the given order.
    pub async fn write_properties(
        &self,
        id: &str,
        properties: &[(String, String)],
    ) -> Result<(), StoreError> {
        let path = self.server_dir(id).join(PROPERTIES_FILE);
        fs::write(&path, render_properties(properties)).await?;
        Ok(())
    }
}

/// Parse `key=value` lines, skipping blanks and `#` comments.
#[must_use]
pub fn parse_properties(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            line.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        })
        .collect()
}

/// Render properties with the generated-file header.
#[must_use]
pub fn render_properties(properties: &[(String, String)]) -> String {
    let mut out = String::from("# Minecraft server properties\n# Generated by craftdock\n");
    for (key, value) in properties {
        out.push_str(key);
        out.push('=');
        out.push_str(value);
        out.push('\n');
    }
    out
}
