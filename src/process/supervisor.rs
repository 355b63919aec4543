//! # Process supervisor: spawn, liveness, graceful stop with escalation.
//!
//! ```text
//! start() ──► running ──try_wait()──► exited (status cached)
//!                │
//!              stop(grace)
//!                ├─► SIGTERM ──► exited within grace ──► Termination { forced: false }
//!                └─► grace elapsed ──► SIGKILL ──► reap (bounded) ──► Termination { forced: true }
//! ```
//!
//! Errors from signalling an already-exited process are swallowed.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::handle::{ProcessHandle, Termination};
use crate::error::RuntimeError;

/// Owns the lifecycle of one external process at a time.
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    reap_timeout: Duration,
}

impl ProcessSupervisor {
    /// `reap_timeout` bounds the wait for the exit status after a forced kill.
    pub fn new(reap_timeout: Duration) -> Self {
        Self { reap_timeout }
    }

    /// Spawns `program` with `args` inside `working_dir`.
    ///
    /// The child's standard streams are detached; its output is read from the log file.
    pub fn start(
        &self,
        program: &Path,
        args: &[String],
        working_dir: &Path,
    ) -> Result<ProcessHandle, RuntimeError> {
        let child = Command::new(program)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RuntimeError::SpawnFailed {
                program: program.display().to_string(),
                source,
            })?;

        let handle = ProcessHandle::new(child);
        info!(program = %program.display(), pid = ?handle.pid(), ?args, "process started");
        Ok(handle)
    }

    /// Non-blocking liveness check. Caches the exit status once observed.
    pub fn is_running(&self, handle: &mut ProcessHandle) -> bool {
        if handle.exit.is_some() {
            return false;
        }
        match handle.child.try_wait() {
            Ok(Some(status)) => {
                info!(pid = ?handle.pid, %status, "process exited");
                handle.exit = Some(status);
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!(
                    pid = ?handle.pid,
                    error = %e,
                    "liveness check failed; treating process as gone"
                );
                false
            }
        }
    }

    /// Termination details of a process already observed as exited.
    pub fn termination(&self, handle: &ProcessHandle) -> Termination {
        handle
            .exit
            .map(|status| Termination::from_status(status, false))
            .unwrap_or_default()
    }

    /// Requests graceful termination and force-kills after `grace`.
    pub async fn stop(&self, handle: &mut ProcessHandle, grace: Duration) -> Termination {
        if !self.is_running(handle) {
            return self.termination(handle);
        }

        request_terminate(handle);
        match timeout(grace, handle.child.wait()).await {
            Ok(Ok(status)) => {
                info!(pid = ?handle.pid, %status, "process stopped gracefully");
                handle.exit = Some(status);
                return Termination::from_status(status, false);
            }
            Ok(Err(e)) => debug!(pid = ?handle.pid, error = %e, "wait after terminate failed"),
            Err(_) => warn!(pid = ?handle.pid, ?grace, "grace period elapsed; forcing kill"),
        }

        if let Err(e) = handle.child.start_kill() {
            debug!(pid = ?handle.pid, error = %e, "kill failed; process already gone");
        }
        match timeout(self.reap_timeout, handle.child.wait()).await {
            Ok(Ok(status)) => {
                handle.exit = Some(status);
                Termination::from_status(status, true)
            }
            Ok(Err(e)) => {
                debug!(pid = ?handle.pid, error = %e, "reap after kill failed");
                Termination {
                    forced: true,
                    ..Termination::default()
                }
            }
            Err(_) => {
                warn!(
                    pid = ?handle.pid,
                    reap_timeout = ?self.reap_timeout,
                    "process not reaped after kill"
                );
                Termination {
                    forced: true,
                    ..Termination::default()
                }
            }
        }
    }
}

#[cfg(unix)]
fn request_terminate(handle: &mut ProcessHandle) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = handle.pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    if let Err(errno) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
        debug!(pid, %errno, "SIGTERM not delivered");
    }
}

#[cfg(not(unix))]
fn request_terminate(handle: &mut ProcessHandle) {
    if let Err(e) = handle.child.start_kill() {
        debug!(pid = ?handle.pid, error = %e, "terminate not delivered");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Instant;

    fn sh(script: &str) -> (PathBuf, Vec<String>) {
        (PathBuf::from("/bin/sh"), vec!["-c".into(), script.into()])
    }

    fn supervisor() -> ProcessSupervisor {
        ProcessSupervisor::new(Duration::from_millis(500))
    }

    #[tokio::test]
    async fn test_spawn_missing_executable() {
        let err = supervisor()
            .start(Path::new("/definitely/not/here"), &[], Path::new("/"))
            .unwrap_err();
        assert_eq!(err.as_label(), "runtime_spawn_failed");
    }

    #[tokio::test]
    async fn test_spontaneous_exit_is_observed() {
        let sup = supervisor();
        let (prog, args) = sh("exit 3");
        let mut h = sup.start(&prog, &args, Path::new("/")).unwrap();
        assert!(h.pid().is_some());

        let deadline = Instant::now() + Duration::from_secs(5);
        while sup.is_running(&mut h) {
            assert!(Instant::now() < deadline);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let t = sup.termination(&h);
        assert_eq!(t.exit_code, Some(3));
        assert!(!t.forced);

        // Stopping an exited process is a no-op.
        assert_eq!(sup.stop(&mut h, Duration::from_millis(10)).await, t);
    }

    #[tokio::test]
    async fn test_graceful_stop() {
        let sup = supervisor();
        let (prog, args) = sh("exec sleep 30");
        let mut h = sup.start(&prog, &args, Path::new("/")).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let t = sup.stop(&mut h, Duration::from_secs(5)).await;
        assert!(!t.forced);
        assert_eq!(t.signal, Some(15));
        assert!(!sup.is_running(&mut h));
    }

    #[tokio::test]
    async fn test_escalates_when_term_is_ignored() {
        let sup = supervisor();
        let (prog, args) = sh("trap '' TERM; exec sleep 30");
        let mut h = sup.start(&prog, &args, Path::new("/")).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let grace = Duration::from_millis(300);
        let started = Instant::now();
        let t = sup.stop(&mut h, grace).await;
        assert!(t.forced);
        assert_eq!(t.signal, Some(9));
        assert!(started.elapsed() < grace + Duration::from_millis(600));
    }
}
