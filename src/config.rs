//! # Monitor configuration.
//!
//! Provides [`Config`], the settings a [`Monitor`](crate::Monitor) is built with.
//! It is passed explicitly at build time; there is no global settings object.
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → clamped to 1
//! - `poll_interval = 0s` → clamped to 1 ms (the loop never spins)
//! - `max_line_len = 0` → clamped to 1 byte
//! - `grace = 0s` → no graceful wait, the process is killed right after SIGTERM

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::tail::LogPattern;

/// Shortest poll interval the run loop accepts.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Settings for supervised runs.
///
/// ## Field semantics
/// - `executable`: simulator program; a relative path with a directory part is
///   resolved against `project_root`
/// - `base_args`: flags always passed before the per-run ones
/// - `project_root`: working directory of the process
/// - `log_dir`: where the process writes its log (relative to `project_root` unless absolute)
/// - `log_pattern`: fixed name or glob used to locate the log
/// - `poll_interval`: tail poll period
/// - `grace`: wait after SIGTERM before SIGKILL
/// - `reap_timeout`: wait for the exit status after SIGKILL
/// - `bus_capacity`: events each subscription may lag before oldest are dropped
/// - `max_line_len`: bytes of each line the parser inspects
/// - `forward_raw_lines`: publish every line as `EventKind::LogLine`
/// - `skip_preexisting`: start tailing existing log files at their current size
#[derive(Clone, Debug)]
pub struct Config {
    pub executable: PathBuf,
    pub base_args: Vec<String>,
    pub project_root: PathBuf,
    pub log_dir: PathBuf,
    pub log_pattern: LogPattern,

    /// Period between tail polls.
    ///
    /// Trades CPU overhead against event latency. Also bounds how long a stop
    /// request waits for the in-flight poll.
    pub poll_interval: Duration,

    /// Maximum time to wait for graceful termination before force-killing.
    pub grace: Duration,

    pub reap_timeout: Duration,
    pub bus_capacity: usize,
    pub max_line_len: usize,
    pub forward_raw_lines: bool,

    /// The simulator appends to its log across runs; when set, content already
    /// present before the run starts is not replayed.
    pub skip_preexisting: bool,
}

impl Config {
    /// Program path the process is spawned from.
    pub fn executable_path(&self) -> PathBuf {
        let has_dir = self
            .executable
            .parent()
            .is_some_and(|p| !p.as_os_str().is_empty());
        if self.executable.is_relative() && has_dir {
            self.project_root.join(&self.executable)
        } else {
            self.executable.clone()
        }
    }

    /// Absolute or project-relative log directory.
    pub fn log_dir_path(&self) -> PathBuf {
        resolve(&self.project_root, &self.log_dir)
    }

    /// Full argument list: `base_args` followed by `extra`.
    pub fn args_with(&self, extra: Vec<String>) -> Vec<String> {
        let mut args = self.base_args.clone();
        args.extend(extra);
        args
    }

    #[inline]
    pub fn poll_interval_clamped(&self) -> Duration {
        self.poll_interval.max(MIN_POLL_INTERVAL)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    #[inline]
    pub fn max_line_len_clamped(&self) -> usize {
        self.max_line_len.max(1)
    }

    /// Upper bound for a stop request: grace, one poll, reap slack.
    pub fn stop_deadline(&self) -> Duration {
        self.grace + self.poll_interval_clamped() + self.reap_timeout + self.poll_interval_clamped()
    }
}

fn resolve(root: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `executable = ./bin/space_launch_sim`, run from `project_root = .`
    /// - `log_dir = logs`, `log_pattern = Fixed("sls_simulation.log")`
    /// - `poll_interval = 100ms`, `grace = 5s`, `reap_timeout = 100ms`
    /// - `bus_capacity = 1024`, `max_line_len = 8192`
    /// - `forward_raw_lines = true`, `skip_preexisting = true`
    fn default() -> Self {
        Self {
            executable: PathBuf::from("./bin/space_launch_sim"),
            base_args: Vec::new(),
            project_root: PathBuf::from("."),
            log_dir: PathBuf::from("logs"),
            log_pattern: LogPattern::default(),
            poll_interval: Duration::from_millis(100),
            grace: Duration::from_secs(5),
            reap_timeout: Duration::from_millis(100),
            bus_capacity: 1024,
            max_line_len: crate::parser::DEFAULT_MAX_LINE_LEN,
            forward_raw_lines: true,
            skip_preexisting: true,
        }
    }
}
