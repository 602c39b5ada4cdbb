//! Server instance records and lifecycle status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle status of a managed game server.
///
/// The lifecycle manager is the only writer; everyone else observes these
/// through transition events or status queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    /// No process attached; the server can be started.
    Stopped,
    /// Start requested, process launched but not yet confirmed live.
    Starting,
    /// Process confirmed live and accepting console commands.
    Running,
    /// Stop requested, waiting for the process to exit.
    Stopping,
    /// First-run asset fetch in progress (set by the provisioning layer).
    Downloading,
    /// The process crashed or could not be started; restartable.
    Error,
}

impl ServerStatus {
    /// Whether a `start` is legal from this status.
    #[must_use]
    pub const fn can_start(self) -> bool {
        matches!(self, Self::Stopped | Self::Error)
    }

    /// Whether a `stop` is legal from this status.
    ///
    /// Stopping a server that is still `Starting` is allowed; it passes
    /// through Stopping to Stopped rather than being rejected.
    #[must_use]
    pub const fn can_stop(self) -> bool {
        matches!(self, Self::Running | Self::Starting)
    }

    /// Whether destructive operations (delete, EULA toggle) are legal.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Stopped | Self::Error)
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Downloading => "downloading",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Game-server runtime flavor.
///
/// The loader constrains which add-on packages are compatible and where
/// they are installed inside the server directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Loader {
    Vanilla,
    Paper,
    Fabric,
    Forge,
}

impl Loader {
    /// Canonical lowercase name, as used in registry facets.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vanilla => "vanilla",
            Self::Paper => "paper",
            Self::Fabric => "fabric",
            Self::Forge => "forge",
        }
    }

    /// Registry project type for this loader.
    ///
    /// Paper-family servers consume plugins; mod loaders consume mods.
    #[must_use]
    pub const fn project_type(self) -> &'static str {
        match self {
            Self::Paper => "plugin",
            Self::Vanilla | Self::Fabric | Self::Forge => "mod",
        }
    }

    /// Directory name for installed add-ons inside the server directory.
    #[must_use]
    pub const fn addon_dir_name(self) -> &'static str {
        match self {
            Self::Paper => "plugins",
            Self::Vanilla | Self::Fabric | Self::Forge => "mods",
        }
    }
}

impl fmt::Display for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown loader name.
#[derive(Debug, Error)]
#[error("unknown loader: {0}")]
pub struct LoaderParseError(pub String);

impl FromStr for Loader {
    type Err = LoaderParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vanilla" => Ok(Self::Vanilla),
            "paper" => Ok(Self::Paper),
            "fabric" => Ok(Self::Fabric),
            "forge" => Ok(Self::Forge),
            other => Err(LoaderParseError(other.to_string())),
        }
    }
}

/// One configured game server, as persisted in its `config.json`.
///
/// Runtime status is intentionally not part of the record; it lives in
/// the lifecycle manager and is recomputed on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerRecord {
    /// Unique short id; doubles as the server directory name.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Runtime flavor.
    pub loader: Loader,
    /// Target game version (e.g. "1.21.1").
    pub version: String,
    /// Network port the server listens on.
    pub port: u16,
    /// Minimum JVM heap in MiB.
    pub ram_min: u32,
    /// Maximum JVM heap in MiB.
    pub ram_max: u32,
    /// One-time consent gate; must be set before the server may start.
    pub eula_accepted: bool,
    /// Player cap mirrored from server.properties.
    pub max_players: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last successful start, if any.
    pub last_started: Option<DateTime<Utc>>,
}

/// Parameters for creating a new server record.
#[derive(Debug, Clone)]
pub struct NewServer {
    pub name: String,
    pub loader: Loader,
    pub version: String,
    pub port: u16,
    pub ram_min: u32,
    pub ram_max: u32,
}

impl NewServer {
    /// Create with the reference defaults (1024/2048 MiB heap, port 25565).
    #[must_use]
    pub fn new(name: impl Into<String>, loader: Loader, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            loader,
            version: version.into(),
            port: 25565,
            ram_min: 1024,
            ram_max: 2048,
        }
    }

    /// Set the network port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the JVM heap bounds in MiB.
    #[must_use]
    pub const fn with_ram(mut self, min: u32, max: u32) -> Self {
        self.ram_min = min;
        self.ram_max = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions_gating() {
        assert!(ServerStatus::Stopped.can_start());
        assert!(ServerStatus::Error.can_start());
        assert!(!ServerStatus::Running.can_start());
        assert!(!ServerStatus::Starting.can_start());

        assert!(ServerStatus::Running.can_stop());
        assert!(ServerStatus::Starting.can_stop());
        assert!(!ServerStatus::Stopped.can_stop());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&ServerStatus::Starting).unwrap();
        assert_eq!(json, "\"starting\"");
    }

    #[test]
    fn loader_round_trip() {
        for name in ["vanilla", "paper", "fabric", "forge"] {
            let loader: Loader = name.parse().unwrap();
            assert_eq!(loader.as_str(), name);
        }
        assert!("spigot".parse::<Loader>().is_err());
    }

    #[test]
    fn loader_addon_dirs() {
        assert_eq!(Loader::Paper.addon_dir_name(), "plugins");
        assert_eq!(Loader::Fabric.addon_dir_name(), "mods");
        assert_eq!(Loader::Paper.project_type(), "plugin");
        assert_eq!(Loader::Forge.project_type(), "mod");
    }

    #[test]
    fn new_server_defaults() {
        let new = NewServer::new("Test", Loader::Fabric, "1.21.1");
        assert_eq!(new.port, 25565);
        assert_eq!(new.ram_min, 1024);
        assert_eq!(new.ram_max, 2048);
    }
}
