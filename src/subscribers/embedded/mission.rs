//! # Latest-known mission state, for live displays.
//!
//! ```text
//! Bus ──► worker ──► MissionState::update(&Event)
//!                          │
//!                          ▼
//!                RwLock<MissionSnapshot>  ◄── snapshot() (copy)
//! ```
//!
//! ## Rules
//! - Telemetry fields are merged: a sample only overwrites the fields it carries
//! - An event of a newer run resets the snapshot before it is applied
//! - Events with `seq <= last_seq` are **rejected** (stale)

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::events::{Event, EventKind, RunId, StatusMessage, StopReport};
use crate::phase::Phase;
use crate::subscribers::Subscribe;

/// Point-in-time copy of the tracked state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MissionSnapshot {
    pub run: Option<RunId>,
    pub altitude: Option<f64>,
    pub velocity: Option<f64>,
    pub fuel_remaining: Option<f64>,
    pub phase: Phase,
    pub last_status: Option<StatusMessage>,
    /// Set once the run's `SupervisorStopped` arrived.
    pub stopped: Option<StopReport>,
    /// Raw lines seen for this run.
    pub lines: u64,
    /// Regressive phase transitions seen for this run.
    pub regressions: u64,
}

impl MissionSnapshot {
    pub fn is_live(&self) -> bool {
        self.run.is_some() && self.stopped.is_none()
    }
}

#[derive(Default)]
struct Inner {
    last_seq: Option<u64>,
    snap: MissionSnapshot,
}

/// Thread-safe tracker of the latest mission values.
#[derive(Default)]
pub struct MissionState {
    state: RwLock<Inner>,
}

impl MissionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `ev` if it is newer than the last applied event.
    ///
    /// Returns `true` when the snapshot changed.
    pub async fn update(&self, ev: &Event) -> bool {
        let mut state = self.state.write().await;
        if state.last_seq.is_some_and(|last| ev.seq <= last) {
            return false;
        }
        state.last_seq = Some(ev.seq);

        let snap = &mut state.snap;
        if let Some(run) = ev.run {
            if snap.run.map_or(true, |cur| run > cur) {
                *snap = MissionSnapshot {
                    run: Some(run),
                    ..MissionSnapshot::default()
                };
            } else if snap.run != Some(run) {
                return false;
            }
        }

        match &ev.kind {
            EventKind::LogLine(_) => snap.lines += 1,
            EventKind::Telemetry(s) => {
                snap.altitude = s.altitude.or(snap.altitude);
                snap.velocity = s.velocity.or(snap.velocity);
                snap.fuel_remaining = s.fuel_remaining.or(snap.fuel_remaining);
            }
            EventKind::Status(m) => snap.last_status = Some(m.clone()),
            EventKind::Phase(t) => {
                if t.is_regressive() {
                    snap.regressions += 1;
                }
                snap.phase = t.to.clone();
            }
            EventKind::SupervisorStopped(r) => snap.stopped = Some(r.clone()),
            EventKind::SubscriberPanicked { .. } => return false,
        }
        true
    }

    /// Returns a copy of the current state.
    pub async fn snapshot(&self) -> MissionSnapshot {
        self.state.read().await.snap.clone()
    }
}

#[async_trait]
impl Subscribe for MissionState {
    async fn on_event(&self, event: &Event) {
        self.update(event).await;
    }

    fn name(&self) -> &'static str {
        "MissionState"
    }
}
