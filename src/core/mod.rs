//! Runtime core: control surface and run loop.
//!
//! The public API of this module is [`Monitor`] (built with [`MonitorBuilder`]).
//!
//! Internal modules:
//! - [`runner`]: one run task, tailing, parsing and publishing until the run ends;
//! - [`monitor`]: start/stop/wait control surface, owns bus and subscribers,
//!   and stops the run on host termination signals.

mod builder;
mod monitor;
mod runner;

pub use builder::MonitorBuilder;
pub use monitor::{wait_for_shutdown_signal, Monitor, ERROR_COMPONENT};
