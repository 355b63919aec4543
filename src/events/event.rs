//! # Events published by a supervised run.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Log events**: raw lines and what was parsed from them (telemetry, status, phase)
//! - **Run events**: the single `SupervisorStopped` at the end of a run
//! - **Subscriber events**: callback failures reported by subscriber workers
//!
//! The [`Event`] struct wraps the kind with a sequence number, a wall-clock
//! timestamp and the id of the run that produced it.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Events of one run are published from one task, so `seq` order equals log order.
//!
//! ## Example
//! ```rust
//! use simvisor::{Event, EventKind, StatusMessage};
//!
//! let ev = Event::new(EventKind::Status(StatusMessage::info("MAIN", "ready"))).with_run(3);
//!
//! assert_eq!(ev.run, Some(3));
//! assert_eq!(ev.label(), "status");
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use serde::Serialize;

use super::payload::{RawLogLine, RunId, StatusMessage, StopReport, TelemetrySample};
use crate::phase::PhaseTransition;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of events, with payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventKind {
    // === Log events ===
    /// A complete line read from the tailed log.
    LogLine(RawLogLine),

    /// Numeric telemetry extracted from a line.
    Telemetry(TelemetrySample),

    /// Status message extracted from a line, or reported by the monitor itself
    /// (component `ERROR` on spawn failure).
    Status(StatusMessage),

    /// Phase change extracted from a line and tagged by the state machine.
    Phase(PhaseTransition),

    // === Run events ===
    /// The run ended. Published exactly once per run, after the last drained line.
    SupervisorStopped(StopReport),

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    SubscriberPanicked {
        /// Subscriber name.
        subscriber: &'static str,
        /// Panic message.
        info: String,
    },
}

/// Event envelope.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock publish time
/// - `run`: producing run, if any
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Run that produced the event.
    pub run: Option<RunId>,
    /// Event classification and payload.
    pub kind: EventKind,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            run: None,
            kind,
        }
    }

    /// Attaches the producing run.
    #[inline]
    pub fn with_run(mut self, run: RunId) -> Self {
        self.run = Some(run);
        self
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked { subscriber, info })
    }

    /// Short stable label (snake_case) for logs/metrics.
    pub fn label(&self) -> &'static str {
        match self.kind {
            EventKind::LogLine(_) => "log_line",
            EventKind::Telemetry(_) => "telemetry",
            EventKind::Status(_) => "status",
            EventKind::Phase(_) => "phase",
            EventKind::SupervisorStopped(_) => "supervisor_stopped",
            EventKind::SubscriberPanicked { .. } => "subscriber_panicked",
        }
    }

    #[inline]
    pub fn is_supervisor_stopped(&self) -> bool {
        matches!(self.kind, EventKind::SupervisorStopped(_))
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked { .. })
    }
}
