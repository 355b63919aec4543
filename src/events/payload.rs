//! # Event payloads.
//!
//! Immutable values extracted from the tailed log or produced by the run loop.
//! Optional telemetry fields stay `None` when the line did not carry them, so
//! consumers can tell "unknown" apart from `0`.

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use serde::Serialize;

/// Identifier of one supervised run (monotonic per [`Monitor`](crate::Monitor)).
pub type RunId = u64;

/// One complete log line, delivered without its terminator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RawLogLine(Arc<str>);

impl RawLogLine {
    /// Wraps an already decoded line.
    pub fn new(line: impl Into<Arc<str>>) -> Self {
        Self(line.into())
    }

    /// Decodes raw bytes (invalid UTF-8 is replaced) and strips a trailing `\r`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
        Self(Arc::from(String::from_utf8_lossy(bytes)))
    }

    /// Line text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RawLogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Numeric telemetry parsed from one line.
///
/// At least one of the measurement fields is `Some`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySample {
    /// Altitude in meters (signed).
    pub altitude: Option<f64>,
    /// Velocity in m/s (signed).
    pub velocity: Option<f64>,
    /// Fuel remaining in percent (0–100).
    pub fuel_remaining: Option<f64>,
    /// Wall-clock capture time.
    pub observed_at: SystemTime,
}

impl TelemetrySample {
    /// True when no measurement field is set.
    pub fn is_empty(&self) -> bool {
        self.altitude.is_none() && self.velocity.is_none() && self.fuel_remaining.is_none()
    }
}

/// Log level marker the status message was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warn,
    Error,
    Critical,
}

impl Severity {
    /// Maps a logger level word (`INFO`, `WARN`, `ERROR`, `CRIT`).
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "INFO" => Some(Severity::Info),
            "WARN" => Some(Severity::Warn),
            "ERROR" => Some(Severity::Error),
            "CRIT" => Some(Severity::Critical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

/// Component-attributed status report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusMessage {
    /// Reporting component; empty when the line had no `component: message` shape.
    pub component: String,
    /// Report text.
    pub message: String,
    pub severity: Severity,
    /// Wall-clock capture time.
    pub observed_at: SystemTime,
}

impl StatusMessage {
    /// Builds an info-level message stamped now.
    pub fn info(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::now(Severity::Info, component, message)
    }

    /// Builds an error-level message stamped now.
    pub fn error(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::now(Severity::Error, component, message)
    }

    fn now(severity: Severity, component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            message: message.into(),
            severity,
            observed_at: SystemTime::now(),
        }
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The process exited on its own and the log was drained.
    Exited,
    /// `stop_run` (or a shutdown signal) ended the run.
    Requested,
}

/// Payload of the single `SupervisorStopped` event of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopReport {
    pub run: RunId,
    pub reason: StopReason,
    /// Exit code, when the process exited normally.
    pub exit_code: Option<i32>,
    /// Terminating signal number (unix), when killed by a signal.
    pub signal: Option<i32>,
    /// True when the grace period elapsed and the process was force-killed.
    pub forced: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_line_replaces_invalid_utf8() {
        let line = RawLogLine::from_bytes(b"Fuel: 50\xff%\r");
        assert_eq!(line.as_str(), "Fuel: 50\u{fffd}%");
    }

    #[test]
    fn test_severity_markers() {
        assert_eq!(Severity::from_marker("CRIT"), Some(Severity::Critical));
        assert_eq!(Severity::from_marker("DEBUG"), None);
    }
}
