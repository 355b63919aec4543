//! # LogWriter: structured event printer
//!
//! A minimal subscriber that renders every [`Event`] as one `tracing` line.
//! Install a `tracing` subscriber (for example `tracing-subscriber`'s `fmt`) to see it.
//!
//! ## Example output
//! ```text
//! INFO simvisor::log: line run=1 seq=12 text="[00:00:03.100] INFO  FCC         : Ignition sequence start"
//! INFO simvisor::log: telemetry run=1 seq=14 altitude=Some(1200.0) velocity=Some(85.2) fuel=None
//! INFO simvisor::log: status run=1 seq=13 severity="info" component="FCC" message="Ignition sequence start"
//! INFO simvisor::log: phase run=1 seq=15 from=PRE_LAUNCH to=IGNITION kind=Forward
//! INFO simvisor::log: supervisor stopped run=1 reason=Exited exit_code=Some(0) forced=false
//! ```

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::events::{Event, EventKind, Severity};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter {
    raw_lines: bool,
}

impl LogWriter {
    /// Construct a new [`LogWriter`] that skips raw log lines.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also print every raw log line.
    #[must_use]
    pub fn with_raw_lines(mut self) -> Self {
        self.raw_lines = true;
        self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let run = e.run.unwrap_or_default();
        let seq = e.seq;
        match &e.kind {
            EventKind::LogLine(line) => {
                if self.raw_lines {
                    info!(target: "simvisor::log", run, seq, text = %line, "line");
                }
            }
            EventKind::Telemetry(s) => {
                info!(
                    target: "simvisor::log",
                    run,
                    seq,
                    altitude = ?s.altitude,
                    velocity = ?s.velocity,
                    fuel = ?s.fuel_remaining,
                    "telemetry"
                );
            }
            EventKind::Status(m) => {
                let severity = m.severity.as_str();
                match m.severity {
                    Severity::Info => info!(
                        target: "simvisor::log",
                        run,
                        seq,
                        severity,
                        component = %m.component,
                        message = %m.message,
                        "status"
                    ),
                    Severity::Warn => warn!(
                        target: "simvisor::log",
                        run,
                        seq,
                        severity,
                        component = %m.component,
                        message = %m.message,
                        "status"
                    ),
                    Severity::Error | Severity::Critical => error!(
                        target: "simvisor::log",
                        run,
                        seq,
                        severity,
                        component = %m.component,
                        message = %m.message,
                        "status"
                    ),
                }
            }
            EventKind::Phase(t) if t.is_regressive() => {
                warn!(
                    target: "simvisor::log",
                    run,
                    seq,
                    from = %t.from,
                    to = %t.to,
                    kind = ?t.kind,
                    "phase"
                );
            }
            EventKind::Phase(t) => {
                info!(
                    target: "simvisor::log",
                    run,
                    seq,
                    from = %t.from,
                    to = %t.to,
                    kind = ?t.kind,
                    "phase"
                );
            }
            EventKind::SupervisorStopped(r) => {
                info!(
                    target: "simvisor::log",
                    run = r.run,
                    reason = ?r.reason,
                    exit_code = ?r.exit_code,
                    signal = ?r.signal,
                    forced = r.forced,
                    "supervisor stopped"
                );
            }
            EventKind::SubscriberPanicked { subscriber, info } => {
                error!(target: "simvisor::log", subscriber, info = %info, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
