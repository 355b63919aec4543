//! Mission phases and the phase state machine.
//!
//! - [`Phase`] canonical phase set plus pass-through tokens
//! - [`PhaseStateMachine`] tracks the last accepted phase and tags transitions
//! - [`PhaseTransition`], [`TransitionKind`] the values it produces

mod machine;
mod table;

pub use machine::{PhaseStateMachine, PhaseTransition, TransitionKind};
pub use table::Phase;
