//! # Event bus for fanning out run events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`]. Every call to
//! [`Bus::subscribe`] returns an independent [`Subscription`] that observes all
//! events published after it was created, in publish order.
//!
//! ## Architecture
//! ```text
//! Publishers:                          Subscriptions (many, independent):
//!   run task ──┐                         ┌──► Subscription 1 (live display)
//!   Monitor  ──┼──────► Bus ─────────────┼──► Subscription 2 (plot history)
//!   workers  ──┘  (broadcast ring)       └──► Subscription N (status console)
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never waits on a subscriber.
//! - **Bounded per subscriber**: each subscription may fall at most `capacity`
//!   events behind the producer.
//! - **Drop oldest**: a subscription that falls further behind skips the oldest
//!   events; the number skipped is added to [`Subscription::dropped`].
//! - **No persistence**: events published while nobody listens are lost.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::debug;

use super::event::Event;

/// Broadcast channel for run events.
///
/// ### Properties
/// - **Non-blocking**: `publish()` returns immediately.
/// - **Fire-and-forget**: no delivery or durability guarantees.
/// - **Cloneable**: cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Arc<Event>>,
}

impl Bus {
    /// Creates a new bus with the given per-subscriber capacity.
    ///
    /// The minimum capacity is 1 (clamped).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Arc<Event>>(capacity);
        Self { tx }
    }

    /// Publishes an event to all current subscriptions.
    ///
    /// If there are no subscriptions, the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(Arc::new(ev));
    }

    /// Creates a new subscription that will observe subsequent events.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            dropped: 0,
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Independent, ordered view of the bus.
///
/// Lag is absorbed here: the oldest missed events are skipped and counted, and
/// receiving resumes with the oldest event still buffered.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<Arc<Event>>,
    dropped: u64,
}

impl Subscription {
    /// Waits for the next event.
    ///
    /// Returns `None` once every [`Bus`] handle has been dropped and the buffer is drained.
    pub async fn recv(&mut self) -> Option<Arc<Event>> {
        loop {
            match self.rx.recv().await {
                Ok(ev) => return Some(ev),
                Err(RecvError::Lagged(n)) => self.record_lag(n),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<Event>> {
        loop {
            match self.rx.try_recv() {
                Ok(ev) => return Some(ev),
                Err(TryRecvError::Lagged(n)) => self.record_lag(n),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Total number of events skipped because this subscription fell behind.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Number of events buffered and not yet received.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    fn record_lag(&mut self, n: u64) {
        self.dropped += n;
        debug!(skipped = n, total = self.dropped, "subscription lagged; dropped oldest events");
    }
}
