use std::process::ExitStatus;
use std::time::SystemTime;

use tokio::process::Child;

/// Live reference to a spawned simulator process.
///
/// Owned by the run task only. Dropping it kills the process if it is still alive.
#[derive(Debug)]
pub struct ProcessHandle {
    pub(super) child: Child,
    pub(super) pid: Option<u32>,
    pub(super) started_at: SystemTime,
    pub(super) exit: Option<ExitStatus>,
}

impl ProcessHandle {
    pub(super) fn new(child: Child) -> Self {
        Self {
            pid: child.id(),
            child,
            started_at: SystemTime::now(),
            exit: None,
        }
    }

    /// OS process id captured at spawn.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// Exit status, once the supervisor has observed it.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit
    }
}

/// How the process ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Termination {
    /// Exit code, when the process exited normally.
    pub exit_code: Option<i32>,
    /// Terminating signal (unix).
    pub signal: Option<i32>,
    /// True when a forced kill was sent after the grace period.
    pub forced: bool,
}

impl Termination {
    pub(super) fn from_status(status: ExitStatus, forced: bool) -> Self {
        Self {
            exit_code: status.code(),
            signal: exit_signal(&status),
            forced,
        }
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}
