//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and built-in implementations in [`embedded`].
//!
//! ## Architecture
//! ```text
//! run task ── publish(Event) ──► Bus ──► one Subscription per subscriber
//!                                              │
//!                                   ┌──────────┼──────────┬────────┐
//!                                   ▼          ▼          ▼        ▼
//!                              MissionState LogWriter  Custom     ...
//! ```

pub mod embedded;
mod set;
mod subscribe;

pub use embedded::MissionState;
#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use set::{SubscriberLag, SubscriberSet};
pub use subscribe::Subscribe;
