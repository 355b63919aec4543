//! Run events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by a supervised run.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and envelope
//! - payload values ([`TelemetrySample`], [`StatusMessage`], [`RawLogLine`], [`StopReport`])
//! - [`Bus`], [`Subscription`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the run task (log events, `SupervisorStopped`), `Monitor`
//!   (spawn failures), `SubscriberSet` workers (panics).
//! - **Consumers**: [`Monitor::subscribe`](crate::Monitor::subscribe) callers and
//!   [`SubscriberSet`](crate::SubscriberSet) workers.

mod bus;
mod event;
mod payload;

pub use bus::{Bus, Subscription};
pub use event::{Event, EventKind};
pub use payload::{
    RawLogLine, RunId, Severity, StatusMessage, StopReason, StopReport, TelemetrySample,
};
