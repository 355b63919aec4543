//! # simvisor
//!
//! **Simvisor** supervises a simulation process, tails the log file it writes
//! and streams what the log says as ordered, structured events.
//!
//! It launches the external simulator, follows its append-only log while it is
//! being written (file not there yet, reads landing mid-line, crashes, hangs),
//! extracts telemetry samples, status messages and mission-phase transitions
//! from free-text lines, and fans them out to independent subscribers without
//! letting a slow one stall the pipeline.
//!
//! ## Architecture
//! ```text
//!    start_run(params)                               stop_run()
//!          │                                             │
//! ┌────────▼─────────────────────────────────────────────▼────────────┐
//! │  Monitor (control surface)                                        │
//! │  - Config, LineParser (compiled once), Bus, SubscriberSet         │
//! └────────┬──────────────────────────────────────────────────────────┘
//!          │ spawns one run task per run
//!          ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  run task                                                         │
//! │  ProcessSupervisor ── liveness ─────────────────────────┐         │
//! │  LogLocator ─► LogTailer (LogCursor) ─► lines           │         │
//! │                   lines ─► LineParser ─► PhaseStateMachine        │
//! │                                │                        │         │
//! │            LogLine, Telemetry, Status, Phase   SupervisorStopped  │
//! └────────────────────────────────┬──────────────────────────────────┘
//!                                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                     Bus (broadcast ring)                          │
//! │         (capacity per subscriber: Config::bus_capacity)           │
//! └────────┬───────────────────────┬───────────────────────┬──────────┘
//!          ▼                       ▼                       ▼
//!     worker 1                worker 2                Subscription
//!   MissionState              LogWriter            (Monitor::subscribe)
//! ```
//!
//! ### Lifecycle of a run
//! ```text
//! start_run ──► spawn ──┬─ Err ──► Status{component: "ERROR"} + Err(SpawnFailed)
//!                       └─ Ok  ──► loop { liveness, poll, parse, publish, sleep }
//!                                    ├─ process exited + 2 quiet polls ─► Exited
//!                                    └─ stop_run ─► SIGTERM, grace, SIGKILL ─► Requested
//!                                  publish SupervisorStopped(StopReport)  (once, last)
//! ```
//!
//! ## Features
//! | Area              | Description                                                | Key types                                  |
//! |-------------------|------------------------------------------------------------|--------------------------------------------|
//! | **Control**       | Start, stop and wait for runs.                             | [`Monitor`], [`RunParameters`]             |
//! | **Process**       | Spawn, liveness, graceful stop with escalation.            | [`ProcessSupervisor`], [`ProcessHandle`]   |
//! | **Tailing**       | Locate and tail the log, complete lines only.              | [`LogLocator`], [`LogTailer`], [`LogCursor`] |
//! | **Parsing**       | Telemetry, status and phase extraction.                    | [`LineParser`], [`PhaseStateMachine`]      |
//! | **Events**        | Ordered fan-out with bounded, drop-oldest subscriptions.   | [`Event`], [`Bus`], [`Subscribe`]          |
//! | **Configuration** | Paths, poll interval, grace, capacities.                   | [`Config`]                                 |
//! | **Errors**        | Typed control-surface errors.                              | [`RuntimeError`]                           |
//!
//! ## Optional features
//! - `logging` (default): exports a built-in [`LogWriter`] that renders events through `tracing`.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use simvisor::{Config, EventKind, MissionTime, Monitor, RunParameters};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn simvisor::Subscribe>> = vec![Arc::new(simvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn simvisor::Subscribe>> = Vec::new();
//!
//!     let monitor = Monitor::builder(Config::default())
//!         .with_subscribers(subs)
//!         .build()?;
//!     let mut feed = monitor.subscribe();
//!
//!     monitor
//!         .start_run(RunParameters {
//!             mission_time: "t-60".parse::<MissionTime>()?,
//!             verbose: true,
//!         })
//!         .await?;
//!
//!     while let Some(ev) = feed.recv().await {
//!         if let EventKind::Telemetry(sample) = &ev.kind {
//!             println!("altitude={:?}", sample.altitude);
//!         }
//!         if ev.is_supervisor_stopped() {
//!             break;
//!         }
//!     }
//!     monitor.shutdown().await;
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod parser;
mod phase;
mod process;
mod subscribers;
mod tail;

// ---- Public re-exports ----

pub use config::Config;
pub use core::{wait_for_shutdown_signal, Monitor, MonitorBuilder, ERROR_COMPONENT};
pub use error::RuntimeError;
pub use events::{
    Bus, Event, EventKind, RawLogLine, RunId, Severity, StatusMessage, StopReason, StopReport,
    Subscription, TelemetrySample,
};
pub use parser::{Extracted, LineParser, DEFAULT_MAX_LINE_LEN};
pub use phase::{Phase, PhaseStateMachine, PhaseTransition, TransitionKind};
pub use process::{
    MissionTime, ProcessHandle, ProcessSupervisor, RunParameters, Termination, MAX_COUNTDOWN_SECS,
};
pub use subscribers::embedded::MissionSnapshot;
pub use subscribers::{MissionState, Subscribe, SubscriberLag, SubscriberSet};
pub use tail::{
    FileMark, LogCursor, LogLocator, LogPattern, LogTailer, TailState, MAX_READ_PER_POLL,
};

// Built-in logger subscriber.
// Disable with: `--no-default-features`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
