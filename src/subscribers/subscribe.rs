//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging event consumers (a live
//! numeric display, a history plot, a status console) into the monitor. Each
//! subscriber is driven by a dedicated worker that owns its own bus
//! [`Subscription`](crate::events::Subscription).
//!
//! ## Contract
//! - Implementations may be slow; they do **not** block the run loop nor other subscribers.
//! - A subscriber that falls more than `Config::bus_capacity` events behind loses
//!   the oldest ones (counted and logged by its worker).
//! - Events arrive in publish order. Bursts are expected; there is no rate limit.
//!
//! ## Example
//! ```rust
//! use simvisor::{Event, EventKind, Subscribe};
//!
//! struct AltitudeLog;
//!
//! #[async_trait::async_trait]
//! impl Subscribe for AltitudeLog {
//!     async fn on_event(&self, ev: &Event) {
//!         if let EventKind::Telemetry(sample) = &ev.kind {
//!             if let Some(alt) = sample.altitude {
//!                 println!("alt={alt}");
//!             }
//!         }
//!     }
//!     fn name(&self) -> &'static str { "altitude-log" }
//! }
//! ```

use crate::events::Event;
use async_trait::async_trait;

/// Contract for event subscribers.
///
/// Called from a subscriber-dedicated worker task. Implementations should avoid
/// blocking the async runtime (prefer async I/O and cooperative waits).
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event for this subscriber.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
