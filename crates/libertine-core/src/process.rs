//! Process invocation primitive: one external tool run per instance.
//!
//! Children are spawned into their own process group so that teardown can
//! take the whole descendant tree down with a single group signal. Stdout is
//! streamed chunk by chunk as it becomes readable; nothing here ever blocks
//! the event loop waiting on a child.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tracing::{debug, trace, warn};

/// Final state of a completed tool run.
#[derive(Debug)]
pub struct ToolExit {
    /// Exit code; `None` when the child died on a signal.
    pub code: Option<i32>,
    /// Everything the child wrote to stdout (also streamed incrementally).
    pub stdout: String,
    /// Everything the child wrote to stderr.
    pub stderr: String,
}

impl ToolExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Spawn or I/O failure of a tool run.
#[derive(Debug)]
pub enum ToolError {
    /// The executable could not be started; no process exists.
    Spawn(std::io::Error),
    /// The child started but a pipe read/write failed.
    Io(std::io::Error),
}

#[derive(Default)]
struct RegistryState {
    groups: HashMap<u64, i32>,
}

/// Shared bookkeeping of live child process groups.
///
/// The dispatcher owns one registry; every spawned tool registers its group
/// id for the duration of its run. `kill_all` is the teardown path: once it
/// has run, the registry is closed and any group registered afterwards is
/// signalled immediately, closing the spawn/teardown race.
#[derive(Clone, Default)]
pub struct ChildRegistry {
    state: Arc<Mutex<RegistryState>>,
    next_token: Arc<AtomicU64>,
    closed: Arc<AtomicBool>,
}

impl ChildRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, pgid: i32) -> ChildGuard {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        if self.closed.load(Ordering::SeqCst) {
            debug!(pgid, "registry already closed; killing new child group");
            kill_group(pgid);
        } else {
            self.state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .groups
                .insert(token, pgid);
        }
        ChildGuard {
            registry: self.clone(),
            token,
        }
    }

    fn deregister(&self, token: u64) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .groups
            .remove(&token);
    }

    /// Process-group ids of every still-registered child.
    pub fn active_process_groups(&self) -> Vec<i32> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .groups
            .values()
            .copied()
            .collect()
    }

    /// Kill every registered child process group and close the registry.
    ///
    /// Kill failures are logged, not escalated: this only runs during
    /// teardown, when no caller remains to notify.
    pub fn kill_all(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let groups: Vec<i32> = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .groups
            .drain()
            .map(|(_, pgid)| pgid)
            .collect();
        for pgid in groups {
            debug!(pgid, "terminating child process group");
            kill_group(pgid);
        }
    }
}

/// Removes a registry entry when the owning tool run ends, on any path.
struct ChildGuard {
    registry: ChildRegistry,
    token: u64,
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        self.registry.deregister(self.token);
    }
}

/// SIGTERM then SIGKILL the whole group. No grace period: by the time this
/// runs nothing is left to consume a graceful exit.
fn kill_group(pgid: i32) {
    for sig in [libc::SIGTERM, libc::SIGKILL] {
        // SAFETY: killpg with a pgid we obtained from a spawned child and a
        // constant signal number is safe to call.
        #[allow(unsafe_code)]
        let ret = unsafe { libc::killpg(pgid, sig) };
        if ret != 0 {
            let errno = std::io::Error::last_os_error();
            if errno.raw_os_error() == Some(libc::ESRCH) {
                trace!(pgid, "process group already gone");
                return;
            }
            warn!(pgid, signal = sig, "failed to signal child group: {errno}");
        }
    }
}

/// A started tool child. Created by [`ToolProcess::spawn`]; consumed by
/// [`ToolProcess::complete`].
pub struct ToolProcess {
    child: Child,
    _guard: ChildGuard,
}

impl ToolProcess {
    /// Start the tool. Fails immediately if the executable cannot be
    /// located or spawned; there is no retry.
    pub fn spawn(
        executable: &Path,
        args: &[String],
        want_stdin: bool,
        registry: &ChildRegistry,
    ) -> Result<Self, ToolError> {
        let mut cmd = Command::new(executable);
        cmd.args(args)
            .stdin(if want_stdin {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(ToolError::Spawn)?;
        // With process_group(0) the child leads its own group, so pid == pgid.
        let pgid = child.id().map_or(0, |pid| pid as i32);
        trace!(tool = %executable.display(), pgid, "spawned external tool");
        let guard = registry.register(pgid);

        Ok(Self {
            child,
            _guard: guard,
        })
    }

    pub fn pgid(&self) -> Option<i32> {
        self.child.id().map(|pid| pid as i32)
    }

    /// Drive the run to completion: write the one-shot stdin payload (then
    /// close the channel), forward each stdout chunk to `on_chunk` in
    /// arrival order, capture stderr, and reap the exit status.
    pub async fn complete(
        mut self,
        stdin_payload: Option<Vec<u8>>,
        mut on_chunk: impl FnMut(&str),
    ) -> Result<ToolExit, ToolError> {
        if let Some(payload) = stdin_payload {
            if let Some(mut stdin) = self.child.stdin.take() {
                stdin.write_all(&payload).await.map_err(ToolError::Io)?;
                stdin.shutdown().await.map_err(ToolError::Io)?;
                // Dropping the handle closes the write end; no further
                // writes are possible from here on.
            }
        }

        let mut stdout_pipe = self.child.stdout.take();
        let mut stderr_pipe = self.child.stderr.take();

        let stdout_fut = async {
            let mut collected = String::new();
            if let Some(pipe) = stdout_pipe.as_mut() {
                let mut buf = [0u8; 4096];
                loop {
                    let n = pipe.read(&mut buf).await?;
                    if n == 0 {
                        break;
                    }
                    let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
                    collected.push_str(&chunk);
                    on_chunk(&chunk);
                }
            }
            Ok::<String, std::io::Error>(collected)
        };

        let stderr_fut = async {
            let mut collected = String::new();
            if let Some(pipe) = stderr_pipe.as_mut() {
                pipe.read_to_string(&mut collected).await?;
            }
            Ok::<String, std::io::Error>(collected)
        };

        let status_fut = self.child.wait();

        let (stdout, stderr, status) = tokio::join!(stdout_fut, stderr_fut, status_fut);
        let stdout = stdout.map_err(ToolError::Io)?;
        let stderr = stderr.map_err(ToolError::Io)?;
        let status = status.map_err(ToolError::Io)?;

        Ok(ToolExit {
            code: status.code(),
            stdout,
            stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sh() -> PathBuf {
        PathBuf::from("/bin/sh")
    }

    #[tokio::test]
    async fn successful_run_streams_stdout() {
        let registry = ChildRegistry::new();
        let args = vec!["-c".to_owned(), "printf one; printf two".to_owned()];
        let proc = ToolProcess::spawn(&sh(), &args, false, &registry).unwrap();

        let mut streamed = String::new();
        let exit = proc
            .complete(None, |chunk| streamed.push_str(chunk))
            .await
            .unwrap();

        assert!(exit.success());
        assert_eq!(exit.stdout, "onetwo");
        assert_eq!(streamed, "onetwo");
        assert!(registry.active_process_groups().is_empty());
    }

    #[tokio::test]
    async fn stderr_and_exit_code_are_captured() {
        let registry = ChildRegistry::new();
        let args = vec!["-c".to_owned(), "echo oops >&2; exit 3".to_owned()];
        let proc = ToolProcess::spawn(&sh(), &args, false, &registry).unwrap();
        let exit = proc.complete(None, |_| {}).await.unwrap();

        assert!(!exit.success());
        assert_eq!(exit.code, Some(3));
        assert_eq!(exit.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn stdin_payload_is_delivered_then_closed() {
        let registry = ChildRegistry::new();
        let args = vec!["-c".to_owned(), "cat".to_owned()];
        let proc = ToolProcess::spawn(&sh(), &args, true, &registry).unwrap();
        let exit = proc
            .complete(Some(b"secret".to_vec()), |_| {})
            .await
            .unwrap();

        // cat only terminates because the write channel was closed.
        assert!(exit.success());
        assert_eq!(exit.stdout, "secret");
    }

    #[tokio::test]
    async fn missing_executable_fails_to_spawn() {
        let registry = ChildRegistry::new();
        let err = ToolProcess::spawn(
            Path::new("/nonexistent/tool-that-is-not-there"),
            &[],
            false,
            &registry,
        )
        .err();
        assert!(matches!(err, Some(ToolError::Spawn(_))));
        assert!(registry.active_process_groups().is_empty());
    }

    #[tokio::test]
    async fn kill_all_terminates_running_children() {
        let registry = ChildRegistry::new();
        let args = vec!["-c".to_owned(), "sleep 30".to_owned()];
        let proc = ToolProcess::spawn(&sh(), &args, false, &registry).unwrap();
        let pgid = proc.pgid().unwrap();

        registry.kill_all();
        let exit = proc.complete(None, |_| {}).await.unwrap();
        // Killed by signal, so no exit code.
        assert_eq!(exit.code, None);

        // SAFETY: signal 0 only probes for existence.
        #[allow(unsafe_code)]
        let alive = unsafe { libc::kill(pgid, 0) } == 0;
        assert!(!alive, "child {pgid} should be gone after kill_all");
    }

    #[tokio::test]
    async fn closed_registry_kills_late_registrations() {
        let registry = ChildRegistry::new();
        registry.kill_all();

        let args = vec!["-c".to_owned(), "sleep 30".to_owned()];
        let proc = ToolProcess::spawn(&sh(), &args, false, &registry).unwrap();
        let exit = proc.complete(None, |_| {}).await.unwrap();
        assert_eq!(exit.code, None);
    }
}
