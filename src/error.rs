//! Error types of the monitor runtime.
//!
//! [`RuntimeError`] covers what the control surface can report to a caller.
//! Parse mismatches and transient log read failures are not errors: they are
//! absorbed inside the run loop and never reach this type.
//!
//! Like every error here it provides `as_label` / `as_message` for logs and metrics.

use std::time::Duration;

use thiserror::Error;

use crate::events::RunId;

/// # Errors produced by the monitor runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The simulator executable is missing or not executable. The run aborts before tailing starts.
    #[error("failed to start {program}: {source}")]
    SpawnFailed {
        /// Program path as given.
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Run parameters were rejected before reaching the process.
    #[error("invalid run parameters: {reason}")]
    InvalidParameters { reason: String },

    /// A run is already live; stop it first.
    #[error("run {run} is still active")]
    AlreadyRunning { run: RunId },

    /// The run task did not finish within the stop deadline.
    #[error("run did not stop within {waited:?}")]
    StopTimeout { waited: Duration },

    /// The background run task failed to complete (panicked or was aborted).
    #[error("run task failed: {reason}")]
    RunTaskFailed { reason: String },

    /// A log pattern or parser rule failed to compile.
    #[error("invalid pattern: {source}")]
    InvalidPattern {
        #[from]
        source: regex::Error,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use simvisor::RuntimeError;
    ///
    /// let err = RuntimeError::AlreadyRunning { run: 1 };
    /// assert_eq!(err.as_label(), "runtime_already_running");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::SpawnFailed { .. } => "runtime_spawn_failed",
            RuntimeError::InvalidParameters { .. } => "runtime_invalid_parameters",
            RuntimeError::AlreadyRunning { .. } => "runtime_already_running",
            RuntimeError::StopTimeout { .. } => "runtime_stop_timeout",
            RuntimeError::RunTaskFailed { .. } => "runtime_run_task_failed",
            RuntimeError::InvalidPattern { .. } => "runtime_invalid_pattern",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::SpawnFailed { program, source } => {
                format!("Failed to start simulation: {program}: {source}")
            }
            RuntimeError::InvalidParameters { reason } => format!("invalid parameters: {reason}"),
            RuntimeError::AlreadyRunning { run } => format!("run {run} already active"),
            RuntimeError::StopTimeout { waited } => format!("stop timed out after {waited:?}"),
            RuntimeError::RunTaskFailed { reason } => format!("run task failed: {reason}"),
            RuntimeError::InvalidPattern { source } => format!("pattern: {source}"),
        }
    }

    /// True when the failure happened before any process was spawned.
    pub fn is_rejected_before_spawn(&self) -> bool {
        matches!(
            self,
            RuntimeError::InvalidParameters { .. }
                | RuntimeError::AlreadyRunning { .. }
                | RuntimeError::InvalidPattern { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_failed_message_names_program() {
        let err = RuntimeError::SpawnFailed {
            program: "./bin/space_launch_sim".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(err.as_label(), "runtime_spawn_failed");
        assert!(err.as_message().starts_with("Failed to start simulation: ./bin/space_launch_sim"));
        assert!(!err.is_rejected_before_spawn());
    }

    #[test]
    fn test_regex_error_converts() {
        let err: RuntimeError = regex::Regex::new("(").unwrap_err().into();
        assert_eq!(err.as_label(), "runtime_invalid_pattern");
        assert!(err.is_rejected_before_spawn());
    }
}
