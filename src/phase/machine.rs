//! # Phase state machine.
//!
//! Tracks the last accepted phase of a run and turns each raw phase token into a
//! [`PhaseTransition`]. The upstream process is the source of truth, so every
//! token is accepted; out-of-order moves are tagged, never blocked.
//!
//! ## Tagging
//! ```text
//! to == ABORT                      → Abort
//! from == UNKNOWN                  → Initial
//! to == from                       → Repeated
//! rank(to) > rank(from)            → Forward
//! rank(to) < rank(from)            → Regressive
//! either side has no rank          → Unranked
//! ```

use std::time::SystemTime;

use serde::Serialize;

use super::Phase;

/// Classification attached to every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// First phase observed in the run.
    Initial,
    /// Moves forward in the expected progression (possibly skipping phases).
    Forward,
    /// Same phase reported again.
    Repeated,
    /// Moves backwards in the expected progression.
    Regressive,
    /// Transition into `ABORT`.
    Abort,
    /// One side is `ABORT` or a pass-through token; no ordering applies.
    Unranked,
}

/// A phase change observed in the log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseTransition {
    /// Last accepted phase before this one (`UNKNOWN` if none yet).
    pub from: Phase,
    /// Phase reported by the log line.
    pub to: Phase,
    /// Ordering tag.
    pub kind: TransitionKind,
    /// Capture time of the line that reported it.
    pub observed_at: SystemTime,
}

impl PhaseTransition {
    /// True when the transition goes backwards in the expected progression.
    #[inline]
    pub fn is_regressive(&self) -> bool {
        matches!(self.kind, TransitionKind::Regressive)
    }
}

/// Per-run phase tracker.
#[derive(Debug, Default)]
pub struct PhaseStateMachine {
    current: Phase,
    applied: u64,
}

impl PhaseStateMachine {
    /// Creates a tracker positioned at `UNKNOWN`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last accepted phase.
    pub fn current(&self) -> &Phase {
        &self.current
    }

    /// Number of transitions applied so far.
    pub fn applied(&self) -> u64 {
        self.applied
    }

    /// Resolves `raw` through the canonical table and records it as the current phase.
    pub fn apply(&mut self, raw: &str, observed_at: SystemTime) -> PhaseTransition {
        let to = Phase::lookup(raw);
        let from = std::mem::replace(&mut self.current, to.clone());
        let kind = classify(&from, &to);
        self.applied += 1;

        PhaseTransition {
            from,
            to,
            kind,
            observed_at,
        }
    }
}

fn classify(from: &Phase, to: &Phase) -> TransitionKind {
    if *to == Phase::Abort {
        return TransitionKind::Abort;
    }
    if *from == Phase::Unknown {
        return TransitionKind::Initial;
    }
    if from == to {
        return TransitionKind::Repeated;
    }
    match (from.rank(), to.rank()) {
        (Some(a), Some(b)) if b > a => TransitionKind::Forward,
        (Some(_), Some(_)) => TransitionKind::Regressive,
        _ => TransitionKind::Unranked,
    }
}
