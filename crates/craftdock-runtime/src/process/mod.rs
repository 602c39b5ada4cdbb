//! Spawning and handling of supervised OS processes.

mod shutdown;
mod stream;

pub use shutdown::shutdown_child;
pub(crate) use stream::spawn_stream_reader;

use crate::logs::LogBroadcaster;
use craftdock_core::LogSource;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tracing::debug;

/// Bound on queued console lines per process.
const STDIN_QUEUE: usize = 64;

/// A spawned server process with piped stdin and pumped output streams.
///
/// Console writes go through a bounded queue drained by a writer task
/// that owns the stdin pipe, so a process that stops reading its console
/// never parks the caller on pipe I/O.
pub struct ServerProcess {
    child: Child,
    stdin_tx: Option<mpsc::Sender<String>>,
    pid: u32,
}

impl ServerProcess {
    /// OS process id.
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Queue one line for the process's console.
    ///
    /// Fails with `NotConnected` once stdin has been closed or taken, and
    /// with `WouldBlock` when the queue is full because the process
    /// stopped reading its console.
    pub fn send_line(&self, text: &str) -> io::Result<()> {
        let tx = self
            .stdin_tx
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "process stdin closed"))?;
        tx.try_send(text.to_string()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                io::Error::new(io::ErrorKind::WouldBlock, "console queue full")
            }
            mpsc::error::TrySendError::Closed(_) => {
                io::Error::new(io::ErrorKind::NotConnected, "process stdin closed")
            }
        })
    }

    /// Check for exit without blocking.
    pub fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    /// Wait for the process to exit.
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        // Closing the queue lets the writer task flush pending lines and
        // drop stdin, so the child sees EOF
        self.stdin_tx.take();
        self.child.wait().await
    }

    /// Take the child for shutdown escalation, consuming the handle.
    pub fn into_child(mut self) -> Child {
        self.stdin_tx.take();
        self.child
    }

    /// Force-kill the process, ignoring whether it already exited.
    pub async fn kill(&mut self) {
        let _ = self.child.kill().await;
    }
}

/// Spawn a game-server process in `cwd` with output pumped into `logs`.
///
/// stdout and stderr are read line-by-line with lossy UTF-8 decoding and
/// published as `Stdout`/`Stderr` entries.
pub fn spawn_server_process(
    program: &str,
    args: &[String],
    cwd: &Path,
    logs: &Arc<LogBroadcaster>,
) -> io::Result<ServerProcess> {
    spawn_tagged(program, args, cwd, logs, LogSource::Stdout, LogSource::Stderr)
}

/// Spawn with explicit log source tags per stream.
///
/// The backend supervisor tags both streams as `System`.
pub(crate) fn spawn_tagged(
    program: &str,
    args: &[String],
    cwd: &Path,
    logs: &Arc<LogBroadcaster>,
    stdout_source: LogSource,
    stderr_source: LogSource,
) -> io::Result<ServerProcess> {
    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let pid = child
        .id()
        .ok_or_else(|| io::Error::other("spawned process has no pid"))?;

    if let Some(stdout) = child.stdout.take() {
        spawn_stream_reader(stdout, stdout_source, logs.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_stream_reader(stderr, stderr_source, logs.clone());
    }

    let stdin_tx = child.stdin.take().map(spawn_stdin_writer);
    debug!(%program, %pid, cwd = %cwd.display(), "spawned process");

    Ok(ServerProcess {
        child,
        stdin_tx,
        pid,
    })
}

/// Writer task owning the stdin pipe; the only place that blocks on it.
fn spawn_stdin_writer(mut stdin: ChildStdin) -> mpsc::Sender<String> {
    let (tx, mut rx) = mpsc::channel::<String>(STDIN_QUEUE);
    tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if stdin.write_all(line.as_bytes()).await.is_err()
                || stdin.write_all(b"\n").await.is_err()
                || stdin.flush().await.is_err()
            {
                break;
            }
        }
        // Dropping stdin here closes the pipe
    });
    tx
}
