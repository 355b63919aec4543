//! # Built-in subscribers
//!
//! - [`MissionState`]: keeps the latest telemetry, phase and status for a live display.
//! - [`LogWriter`]: renders events through `tracing` (feature `logging`).

#[cfg(feature = "logging")]
mod log;
mod mission;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use mission::{MissionSnapshot, MissionState};
