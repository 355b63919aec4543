//! External process lifecycle.
//!
//! - [`ProcessSupervisor`] spawns the simulator, checks liveness and stops it
//!   (SIGTERM, then SIGKILL after the grace period)
//! - [`ProcessHandle`] the live child, owned by the run task
//! - [`RunParameters`] operator options validated into command-line flags

mod handle;
mod params;
mod supervisor;

pub use handle::{ProcessHandle, Termination};
pub use params::{MissionTime, RunParameters, MAX_COUNTDOWN_SECS};
pub use supervisor::ProcessSupervisor;
