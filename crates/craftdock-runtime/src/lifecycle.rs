//! Server lifecycle state machine.
//!
//! The manager owns the runtime status of every server, the attached
//! process handles, and the per-server operation locks. Persisted records
//! live in the store; runtime status never touches disk.
//!
//! Ownership rule for exit handling: whichever task removes a process
//! from the map performs the status transition and the final log entry.
//! `stop()` takes the entry before shutting down; the monitor task takes
//! it when the process exits on its own. A process is therefore processed
//! exactly once on every path.

use crate::events::TransitionBroadcaster;
use crate::logs::LogHub;
use crate::process::{ServerProcess, shutdown_child, spawn_server_process};
use chrono::Utc;
use craftdock_core::{LifecycleError, LogSource, ServerRecord, ServerStatus, ServerStore};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// Timing knobs for lifecycle operations.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// How long to wait for first console output before declaring a
    /// freshly spawned server Running anyway.
    pub startup_grace: Duration,
    /// How long the graceful console `stop` gets before signal escalation.
    pub stop_timeout: Duration,
    /// Exit-polling cadence of the per-process monitor task.
    pub monitor_interval: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            startup_grace: Duration::from_millis(1500),
            stop_timeout: Duration::from_secs(30),
            monitor_interval: Duration::from_millis(500),
        }
    }
}

/// Builds the command line for a server's process.
pub trait LaunchPlan: Send + Sync {
    /// Program and arguments to run in the server directory.
    fn build(&self, record: &ServerRecord, server_dir: &Path) -> (String, Vec<String>);
}

/// Default plan: a Java server jar with G1 tuning flags.
pub struct JavaLaunchPlan;

impl LaunchPlan for JavaLaunchPlan {
    fn build(&self, record: &ServerRecord, _server_dir: &Path) -> (String, Vec<String>) {
        let args = vec![
            format!("-Xms{}M", record.ram_min),
            format!("-Xmx{}M", record.ram_max),
            "-XX:+UseG1GC".to_string(),
            "-XX:+ParallelRefProcEnabled".to_string(),
            "-XX:MaxGCPauseMillis=200".to_string(),
            "-XX:+UnlockExperimentalVMOptions".to_string(),
            "-XX:+DisableExplicitGC".to_string(),
            "-jar".to_string(),
            "server.jar".to_string(),
            "nogui".to_string(),
        ];
        ("java".to_string(), args)
    }
}

struct Inner {
    store: ServerStore,
    hub: Arc<LogHub>,
    events: TransitionBroadcaster,
    statuses: RwLock<HashMap<String, ServerStatus>>,
    processes: RwLock<HashMap<String, ServerProcess>>,
    ops: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
    plan: Box<dyn LaunchPlan>,
    config: LifecycleConfig,
}

impl Inner {
    async fn status(&self, id: &str) -> ServerStatus {
        self.statuses
            .read()
            .await
            .get(id)
            .copied()
            .unwrap_or(ServerStatus::Stopped)
    }

    /// Record a status change and publish it. Same-state writes are
    /// silent so racing paths cannot emit duplicate events.
    async fn set_status(&self, id: &str, to: ServerStatus) {
        let from = {
            let mut statuses = self.statuses.write().await;
            let slot = statuses
                .entry(id.to_string())
                .or_insert(ServerStatus::Stopped);
            std::mem::replace(slot, to)
        };
        if from != to {
            self.events.publish(id, from, to);
        }
    }

    fn op_lock(&self, id: &str) -> Arc<Mutex<()>> {
        let mut ops = self.ops.lock().unwrap_or_else(|e| e.into_inner());
        ops.entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Manager for server processes and their lifecycle state.
///
/// Cheap to clone; all clones share state. Operations on different
/// servers never block each other.
#[derive(Clone)]
pub struct LifecycleManager {
    inner: Arc<Inner>,
}

impl LifecycleManager {
    /// Create a manager with the default Java launch plan and timings.
    pub fn new(store: ServerStore, hub: Arc<LogHub>) -> Self {
        Self::with_plan(store, hub, Box::new(JavaLaunchPlan), LifecycleConfig::default())
    }

    /// Create a manager with a custom launch plan and timings.
    pub fn with_plan(
        store: ServerStore,
        hub: Arc<LogHub>,
        plan: Box<dyn LaunchPlan>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                hub,
                events: TransitionBroadcaster::new(),
                statuses: RwLock::new(HashMap::new()),
                processes: RwLock::new(HashMap::new()),
                ops: StdMutex::new(HashMap::new()),
                plan,
                config,
            }),
        }
    }

    /// Runtime status of a server. Unknown ids are Stopped.
    pub async fn status(&self, id: &str) -> ServerStatus {
        self.inner.status(id).await
    }

    /// Subscribe to lifecycle transition events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<craftdock_core::TransitionEvent> {
        self.inner.events.subscribe()
    }

    /// The log hub serving this manager's servers.
    pub fn hub(&self) -> Arc<LogHub> {
        self.inner.hub.clone()
    }

    /// The record store backing this manager.
    pub fn store(&self) -> &ServerStore {
        &self.inner.store
    }

    /// All persisted servers with their runtime status.
    pub async fn list(&self) -> Result<Vec<(ServerRecord, ServerStatus)>, LifecycleError> {
        let records = self.inner.store.load_all().await?;
        let mut out = Vec::with_capacity(records.len());
        for record in records {
            let status = self.inner.status(&record.id).await;
            out.push((record, status));
        }
        Ok(out)
    }

    /// Start a server.
    ///
    /// Fails fast with `OperationInProgress` if another operation holds
    /// this server's lock, `EulaRequired` before consent, and
    /// `AlreadyRunning` unless the server is settled.
    pub async fn start(&self, id: &str) -> Result<(), LifecycleError> {
        let lock = self.inner.op_lock(id);
        let _guard = lock
            .try_lock()
            .map_err(|_| LifecycleError::OperationInProgress)?;

        let mut record = self.inner.store.load(id).await?;
        if !record.eula_accepted {
            return Err(LifecycleError::EulaRequired);
        }
        if !self.inner.status(id).await.can_start() {
            return Err(LifecycleError::AlreadyRunning);
        }

        self.inner.set_status(id, ServerStatus::Starting).await;

        let server_dir = self.inner.store.server_dir(id);
        let logs = self.inner.hub.broadcaster(id);
        // Subscribe before the spawn so the first output line is not missed
        let mut first_line = logs.subscribe();

        let (program, args) = self.inner.plan.build(&record, &server_dir);
        let process = match spawn_server_process(&program, &args, &server_dir, &logs) {
            Ok(process) => process,
            Err(e) => {
                logs.publish(LogSource::System, format!("Failed to start server: {e}"));
                self.inner.set_status(id, ServerStatus::Error).await;
                return Err(LifecycleError::SpawnFailed {
                    message: e.to_string(),
                });
            }
        };

        let pid = process.pid();
        info!(server_id = %id, %pid, "server process spawned");
        self.inner.processes.write().await.insert(id.to_string(), process);

        // Confirmed live by first output, or after the grace delay
        match timeout(self.inner.config.startup_grace, first_line.recv()).await {
            Ok(_) => debug!(server_id = %id, "server produced output"),
            Err(_) => debug!(server_id = %id, "startup grace elapsed without output"),
        }

        // The process may already have died during the grace window
        if let Some(status) = self.reap_if_exited(id, pid).await {
            return if status.success() {
                record.last_started = Some(Utc::now());
                self.inner.store.save(&record).await?;
                Ok(())
            } else {
                Err(LifecycleError::SpawnFailed {
                    message: format!("server exited during startup ({status})"),
                })
            };
        }

        self.inner.set_status(id, ServerStatus::Running).await;
        logs.publish(LogSource::System, "Server started");

        record.last_started = Some(Utc::now());
        self.inner.store.save(&record).await?;

        self.spawn_monitor(id.to_string(), pid);
        Ok(())
    }

    /// Stop a server, legal from Running and Starting.
    ///
    /// Sends the graceful console `stop`, waits the configured budget,
    /// then escalates through SIGTERM to SIGKILL.
    pub async fn stop(&self, id: &str) -> Result<(), LifecycleError> {
        let lock = self.inner.op_lock(id);
        let _guard = lock.lock().await;

        if !self.inner.status(id).await.can_stop() {
            return Err(LifecycleError::NotRunning);
        }
        self.inner.set_status(id, ServerStatus::Stopping).await;

        let taken = self.inner.processes.write().await.remove(id);
        let Some(mut process) = taken else {
            // Exited on its own while we acquired the lock; the monitor
            // already handled the exit.
            self.inner.set_status(id, ServerStatus::Stopped).await;
            return Ok(());
        };

        let logs = self.inner.hub.broadcaster(id);
        let _ = process.send_line("stop");

        match timeout(self.inner.config.stop_timeout, process.wait()).await {
            Ok(Ok(status)) => {
                debug!(server_id = %id, ?status, "server exited after stop command");
            }
            Ok(Err(e)) => {
                warn!(server_id = %id, error = %e, "wait failed during stop");
            }
            Err(_) => {
                warn!(server_id = %id, "stop command ignored, escalating");
                if shutdown_child(process.into_child()).await.is_err() {
                    self.inner.set_status(id, ServerStatus::Error).await;
                    return Err(LifecycleError::ShutdownTimedOut);
                }
            }
        }

        logs.publish(LogSource::System, "Server stopped");
        self.inner.set_status(id, ServerStatus::Stopped).await;
        Ok(())
    }

    /// Stop (tolerating a server that is not running) and start again.
    ///
    /// The stop path fully processes the old exit before the new process
    /// attaches, so observers see exactly one exit.
    pub async fn restart(&self, id: &str) -> Result<(), LifecycleError> {
        match self.stop(id).await {
            Ok(()) | Err(LifecycleError::NotRunning) => {}
            Err(e) => return Err(e),
        }
        self.start(id).await
    }

    /// Queue one console command for a Running server.
    ///
    /// The write goes through the process's bounded console queue, so a
    /// server that stopped reading its stdin fails the call instead of
    /// stalling operations on other servers.
    pub async fn send_command(&self, id: &str, command: &str) -> Result<(), LifecycleError> {
        if self.inner.status(id).await != ServerStatus::Running {
            return Err(LifecycleError::NotRunning);
        }

        let sent = {
            let processes = self.inner.processes.read().await;
            let process = processes.get(id).ok_or(LifecycleError::NotRunning)?;
            process.send_line(command)
        };
        sent.map_err(|e| match e.kind() {
            std::io::ErrorKind::WouldBlock => LifecycleError::Io(e),
            _ => LifecycleError::NotRunning,
        })?;

        self.inner
            .hub
            .broadcaster(id)
            .publish(LogSource::System, format!("> {command}"));
        Ok(())
    }

    /// Record EULA consent. Legal only while Stopped.
    pub async fn accept_eula(&self, id: &str) -> Result<ServerRecord, LifecycleError> {
        if self.inner.status(id).await != ServerStatus::Stopped {
            return Err(LifecycleError::NotStopped);
        }
        Ok(self.inner.store.record_eula(id, true).await?)
    }

    /// Mark a server as Downloading during first-run asset fetch.
    pub async fn mark_downloading(&self, id: &str) -> Result<(), LifecycleError> {
        if self.inner.status(id).await != ServerStatus::Stopped {
            return Err(LifecycleError::NotStopped);
        }
        self.inner.set_status(id, ServerStatus::Downloading).await;
        Ok(())
    }

    /// Settle a Downloading server back to Stopped or Error.
    pub async fn finish_download(&self, id: &str, succeeded: bool) {
        let to = if succeeded {
            ServerStatus::Stopped
        } else {
            ServerStatus::Error
        };
        self.inner.set_status(id, to).await;
    }

    /// Delete a settled server and everything it owns.
    pub async fn delete(&self, id: &str) -> Result<(), LifecycleError> {
        let lock = self.inner.op_lock(id);
        let _guard = lock
            .try_lock()
            .map_err(|_| LifecycleError::OperationInProgress)?;

        if !self.inner.status(id).await.is_settled() {
            return Err(LifecycleError::NotStopped);
        }

        self.inner.store.delete(id).await?;
        self.inner.statuses.write().await.remove(id);
        self.inner.hub.remove(id);
        {
            let mut ops = self.inner.ops.lock().unwrap_or_else(|e| e.into_inner());
            ops.remove(id);
        }
        info!(server_id = %id, "server deleted");
        Ok(())
    }

    /// If the process attached under `pid` has exited, process that exit
    /// (final log entry plus settled status) and report it.
    async fn reap_if_exited(&self, id: &str, pid: u32) -> Option<std::process::ExitStatus> {
        let mut processes = self.inner.processes.write().await;
        let status = match processes.get_mut(id) {
            Some(p) if p.pid() == pid => match p.try_wait() {
                Ok(Some(status)) => status,
                _ => return None,
            },
            _ => return None,
        };
        processes.remove(id);
        drop(processes);

        let logs = self.inner.hub.broadcaster(id);
        if status.success() {
            logs.publish(LogSource::System, "Server process exited");
            self.inner.set_status(id, ServerStatus::Stopped).await;
        } else {
            logs.publish(
                LogSource::System,
                format!("Server process exited unexpectedly ({status})"),
            );
            self.inner.set_status(id, ServerStatus::Error).await;
        }
        Some(status)
    }

    /// Poll for exit of the process attached under `pid`.
    fn spawn_monitor(&self, id: String, pid: u32) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            loop {
                sleep(inner.config.monitor_interval).await;

                let mut processes = inner.processes.write().await;
                let exit = match processes.get_mut(&id) {
                    // stop() took the process, or a newer one attached
                    None => break,
                    Some(p) if p.pid() != pid => break,
                    Some(p) => match p.try_wait() {
                        Ok(None) => continue,
                        Ok(Some(status)) => Some(status),
                        Err(e) => {
                            warn!(server_id = %id, error = %e, "failed to poll server process");
                            None
                        }
                    },
                };

                processes.remove(&id);
                drop(processes);

                let logs = inner.hub.broadcaster(&id);
                let clean = exit.is_some_and(|status| status.success());
                if clean {
                    logs.publish(LogSource::System, "Server process exited");
                    inner.set_status(&id, ServerStatus::Stopped).await;
                } else {
                    let detail = exit.map_or_else(
                        || "unknown".to_string(),
                        |status| status.to_string(),
                    );
                    logs.publish(
                        LogSource::System,
                        format!("Server process exited unexpectedly ({detail})"),
                    );
                    inner.set_status(&id, ServerStatus::Error).await;
                }
                break;
            }
            debug!(server_id = %id, %pid, "monitor task exiting");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use craftdock_core::{Loader, NewServer};

    fn manager() -> (tempfile::TempDir, LifecycleManager) {
        let tmp = tempfile::tempdir().unwrap();
        let store = ServerStore::new(tmp.path());
        let manager = LifecycleManager::new(store, Arc::new(LogHub::new()));
        (tmp, manager)
    }

    #[tokio::test]
    async fn unknown_server_is_stopped() {
        let (_tmp, manager) = manager();
        assert_eq!(manager.status("nope").await, ServerStatus::Stopped);
    }

    #[tokio::test]
    async fn start_requires_eula() {
        let (_tmp, manager) = manager();
        let record = manager
            .store()
            .create(NewServer::new("S", Loader::Vanilla, "1.21"))
            .await
            .unwrap();

        let err = manager.start(&record.id).await.unwrap_err();
        assert!(matches!(err, LifecycleError::EulaRequired));
        assert_eq!(manager.status(&record.id).await, ServerStatus::Stopped);
    }

    #[tokio::test]
    async fn start_of_missing_server_is_store_error() {
        let (_tmp, manager) = manager();
        let err = manager.start("missing1").await.unwrap_err();
        assert_eq!(err.code(), "server_not_found");
    }

    #[tokio::test]
    async fn accept_eula_only_while_stopped() {
        let (_tmp, manager) = manager();
        let record = manager
            .store()
            .create(NewServer::new("S", Loader::Paper, "1.21"))
            .await
            .unwrap();

        let updated = manager.accept_eula(&record.id).await.unwrap();
        assert!(updated.eula_accepted);

        manager.mark_downloading(&record.id).await.unwrap();
        assert!(matches!(
            manager.accept_eula(&record.id).await,
            Err(LifecycleError::NotStopped)
        ));
    }

    #[tokio::test]
    async fn downloading_settles_back() {
        let (_tmp, manager) = manager();
        let record = manager
            .store()
            .create(NewServer::new("S", Loader::Fabric, "1.21"))
            .await
            .unwrap();

        let mut events = manager.subscribe_events();
        manager.mark_downloading(&record.id).await.unwrap();
        assert_eq!(manager.status(&record.id).await, ServerStatus::Downloading);

        manager.finish_download(&record.id, false).await;
        assert_eq!(manager.status(&record.id).await, ServerStatus::Error);

        let first = events.recv().await.unwrap();
        assert_eq!(first.to, ServerStatus::Downloading);
        let second = events.recv().await.unwrap();
        assert_eq!(second.to, ServerStatus::Error);
    }

    #[tokio::test]
    async fn delete_requires_settled_state() {
        let (_tmp, manager) = manager();
        let record = manager
            .store()
            .create(NewServer::new("S", Loader::Forge, "1.20.1"))
            .await
            .unwrap();

        manager.mark_downloading(&record.id).await.unwrap();
        assert!(matches!(
            manager.delete(&record.id).await,
            Err(LifecycleError::NotStopped)
        ));

        manager.finish_download(&record.id, true).await;
        manager.delete(&record.id).await.unwrap();
        assert_eq!(manager.list().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn stop_when_not_running_fails() {
        let (_tmp, manager) = manager();
        assert!(matches!(
            manager.stop("ghost").await,
            Err(LifecycleError::NotRunning)
        ));
    }

    #[test]
    fn java_plan_uses_ram_bounds() {
        let record = ServerRecord {
            id: "x".to_string(),
            name: "S".to_string(),
            loader: Loader::Vanilla,
            version: "1.21".to_string(),
            port: 25565,
            ram_min: 512,
            ram_max: 4096,
            eula_accepted: true,
            max_players: 20,
            created_at: Utc::now(),
            last_started: None,
        };
        let (program, args) = JavaLaunchPlan.build(&record, Path::new("/srv"));
        assert_eq!(program, "java");
        assert!(args.contains(&"-Xms512M".to_string()));
        assert!(args.contains(&"-Xmx4096M".to_string()));
        assert!(args.ends_with(&["server.jar".to_string(), "nogui".to_string()]));
    }
}
