//! # Run loop: supervise one process, tail its log, publish what it says.
//!
//! One background task per run owns the [`ProcessHandle`], the [`LogTailer`]
//! (and with it the cursor) and the [`PhaseStateMachine`]. Nothing else mutates them.
//!
//! ## Event flow
//! ```text
//! loop {
//!   running = is_running(handle)      (checked first, so the poll below sees all output
//!                                      written before an exit)
//!   for line in tailer.poll():
//!       publish LogLine(line)          (if forward_raw_lines)
//!       for x in parser.parse(line):   (telemetry, status, phase; in that order)
//!           publish x                  (phase tokens go through the state machine)
//!   if tailer.observe_liveness(running) == CLOSED → exit(Exited)
//!   select { cancelled → exit(Requested) | sleep(poll_interval) }
//! }
//!
//! exit(Requested): stop(handle, grace) → final drain polls
//! exit(*):         publish SupervisorStopped(report)     exactly once, always last
//! ```
//!
//! ## Rules
//! - Events of line N are published before events of line N+1
//! - Empty lines are neither forwarded nor parsed
//! - No parse or read failure ends the loop

use std::sync::Arc;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    config::Config,
    events::{Bus, Event, EventKind, RawLogLine, RunId, StopReason, StopReport},
    parser::{Extracted, LineParser},
    phase::PhaseStateMachine,
    process::{ProcessHandle, ProcessSupervisor},
    tail::{LogTailer, TailState},
};

/// Bound on extra polls used to drain the log after a requested stop.
const MAX_FINAL_DRAIN_POLLS: usize = 16;

/// Everything a run task needs besides the state it owns.
pub(crate) struct RunContext {
    pub id: RunId,
    pub cfg: Arc<Config>,
    pub bus: Bus,
    pub parser: Arc<LineParser>,
    pub supervisor: ProcessSupervisor,
}

/// Drives one run to completion and returns its report.
///
/// Publishes exactly one `SupervisorStopped` event, after every drained line.
pub(crate) async fn run(
    ctx: RunContext,
    mut handle: ProcessHandle,
    mut tailer: LogTailer,
    token: CancellationToken,
) -> StopReport {
    let mut phases = PhaseStateMachine::new();
    let poll = ctx.cfg.poll_interval_clamped();

    let requested = loop {
        let running = ctx.supervisor.is_running(&mut handle);
        ctx.drain_once(&mut tailer, &mut phases).await;
        if tailer.observe_liveness(running) == TailState::Closed {
            break false;
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => break true,
            _ = sleep(poll) => {}
        }
    };

    let report = if requested {
        info!(run = ctx.id, "stop requested");
        let term = ctx.supervisor.stop(&mut handle, ctx.cfg.grace).await;
        ctx.final_drain(&mut tailer, &mut phases).await;
        StopReport {
            run: ctx.id,
            reason: StopReason::Requested,
            exit_code: term.exit_code,
            signal: term.signal,
            forced: term.forced,
        }
    } else {
        let term = ctx.supervisor.termination(&handle);
        StopReport {
            run: ctx.id,
            reason: StopReason::Exited,
            exit_code: term.exit_code,
            signal: term.signal,
            forced: false,
        }
    };

    info!(
        run = ctx.id,
        reason = ?report.reason,
        exit_code = ?report.exit_code,
        forced = report.forced,
        "run finished"
    );
    let stopped = EventKind::SupervisorStopped(report.clone());
    ctx.bus.publish(Event::new(stopped).with_run(ctx.id));
    report
}

impl RunContext {
    /// One tail poll. Returns the number of lines read.
    async fn drain_once(&self, tailer: &mut LogTailer, phases: &mut PhaseStateMachine) -> usize {
        let lines = tailer.poll().await;
        if !lines.is_empty() {
            debug!(run = self.id, lines = lines.len(), "poll");
        }
        for line in &lines {
            self.publish_line(line, phases);
        }
        lines.len()
    }

    /// Polls until the log stops growing (the process is already gone).
    async fn final_drain(&self, tailer: &mut LogTailer, phases: &mut PhaseStateMachine) {
        for _ in 0..MAX_FINAL_DRAIN_POLLS {
            let before = tailer.cursor().map(|c| c.read_position());
            self.drain_once(tailer, phases).await;
            if tailer.cursor().map(|c| c.read_position()) == before {
                break;
            }
        }
    }

    fn publish_line(&self, line: &RawLogLine, phases: &mut PhaseStateMachine) {
        if line.as_str().trim().is_empty() {
            return;
        }
        if self.cfg.forward_raw_lines {
            self.publish(EventKind::LogLine(line.clone()));
        }
        for extracted in self.parser.parse(line.as_str()) {
            let kind = match extracted {
                Extracted::Telemetry(sample) => EventKind::Telemetry(sample),
                Extracted::Status(msg) => EventKind::Status(msg),
                Extracted::Phase { token, observed_at } => {
                    EventKind::Phase(phases.apply(&token, observed_at))
                }
            };
            self.publish(kind);
        }
    }

    #[inline]
    fn publish(&self, kind: EventKind) {
        self.bus.publish(Event::new(kind).with_run(self.id));
    }
}
