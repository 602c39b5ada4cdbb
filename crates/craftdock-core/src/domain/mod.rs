//! Domain types for managed game servers, logs, and add-on packages.

mod addon;
mod logs;
mod server;

pub use addon::{InstallResult, InstalledPackage, PackageDependency};
pub use logs::{LogEntry, LogLevel, LogSource};
pub(crate) use logs::now_ms;
pub use server::{LoaderParseError, Loader, NewServer, ServerRecord, ServerStatus};
