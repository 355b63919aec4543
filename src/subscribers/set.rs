//! # Non-blocking event fan-out to multiple subscribers.
//!
//! Provides [`SubscriberSet`]: one worker per subscriber, each reading its own
//! bus subscription, so a slow subscriber never delays the producer or its peers.
//!
//! ## Architecture
//! ```text
//! Bus::publish(event)
//!     │
//!     ├──► [subscription 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded ring)           └──────► panic → SubscriberPanicked
//!     ├──► [subscription 2] ──► worker 2 ──► subscriber2.on_event()
//!     └──► [subscription N] ──► worker N ──► subscriberN.on_event()
//! ```
//!
//! ## Rules
//! - **Per-subscriber FIFO**: each subscriber sees events in publish order
//! - **Same relative order everywhere**: all subscriptions read one broadcast stream
//! - **Overflow**: the lagging subscriber skips its oldest events; the count is logged
//!   and kept in [`SubscriberLag`]
//! - **Isolation**: a panicking subscriber is reported and keeps receiving
//!
//! ## Panic handling
//! Worker tasks use `catch_unwind`:
//! - Panic is caught and converted to a `SubscriberPanicked` event
//! - A panic while handling a `SubscriberPanicked` event is only logged (no feedback loop)
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if a subscriber panics while holding a lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::events::{Bus, Event, Subscription};
use crate::subscribers::Subscribe;

/// Per-subscriber count of events skipped because its worker fell behind.
///
/// Cloned handles share the counters, so they stay readable after shutdown.
#[derive(Clone, Debug, Default)]
pub struct SubscriberLag {
    entries: Arc<Vec<(&'static str, AtomicU64)>>,
}

impl SubscriberLag {
    fn new(names: &[&'static str]) -> Self {
        Self {
            entries: Arc::new(names.iter().map(|n| (*n, AtomicU64::new(0))).collect()),
        }
    }

    /// `(subscriber name, dropped events)` in registration order.
    pub fn snapshot(&self) -> Vec<(&'static str, u64)> {
        self.entries
            .iter()
            .map(|(name, n)| (*name, n.load(Ordering::Relaxed)))
            .collect()
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, n)| n.load(Ordering::Relaxed)).sum()
    }

    fn record(&self, idx: usize, dropped: u64) {
        if let Some((_, n)) = self.entries.get(idx) {
            n.store(dropped, Ordering::Relaxed);
        }
    }
}

/// Fan-out coordinator for event subscribers.
pub struct SubscriberSet {
    names: Vec<&'static str>,
    workers: Vec<JoinHandle<()>>,
    token: CancellationToken,
    lag: SubscriberLag,
}

impl SubscriberSet {
    /// Subscribes every subscriber to `bus` and spawns its worker.
    ///
    /// Only events published after this call are delivered.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: &Bus) -> Self {
        let token = CancellationToken::new();
        let names: Vec<_> = subs.iter().map(|s| s.name()).collect();
        let lag = SubscriberLag::new(&names);

        let workers = subs
            .into_iter()
            .enumerate()
            .map(|(idx, sub)| {
                let rx = bus.subscribe();
                let slot = LagSlot {
                    idx,
                    counters: lag.clone(),
                };
                tokio::spawn(worker(sub, rx, bus.clone(), slot, token.clone()))
            })
            .collect();
        Self {
            names,
            workers,
            token,
            lag,
        }
    }

    /// Stops the workers after they have delivered everything already published.
    pub async fn shutdown(self) {
        self.token.cancel();
        for (name, h) in self.names.iter().zip(self.workers) {
            if let Err(e) = h.await {
                warn!(subscriber = name, error = %e, "subscriber worker did not finish cleanly");
            }
        }
    }

    /// Shared handle to the per-subscriber drop counters.
    pub fn lag(&self) -> SubscriberLag {
        self.lag.clone()
    }

    /// Names of the registered subscribers, in registration order.
    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }
}

struct LagSlot {
    idx: usize,
    counters: SubscriberLag,
}

async fn worker(
    sub: Arc<dyn Subscribe>,
    mut rx: Subscription,
    bus: Bus,
    lag: LagSlot,
    token: CancellationToken,
) {
    let mut reported_dropped = 0;
    loop {
        let next = tokio::select! {
            biased;
            ev = rx.recv() => ev,
            _ = token.cancelled() => break,
        };
        let Some(ev) = next else { return };
        report_lag(sub.name(), &rx, &lag, &mut reported_dropped);
        deliver(sub.as_ref(), &ev, &bus).await;
    }

    // Cancelled: flush what was published before shutdown.
    while let Some(ev) = rx.try_recv() {
        report_lag(sub.name(), &rx, &lag, &mut reported_dropped);
        deliver(sub.as_ref(), &ev, &bus).await;
    }
    debug!(subscriber = sub.name(), dropped = rx.dropped(), "subscriber worker stopped");
}

fn report_lag(name: &'static str, rx: &Subscription, lag: &LagSlot, reported: &mut u64) {
    let dropped = rx.dropped();
    if dropped > *reported {
        warn!(
            subscriber = name,
            skipped = dropped - *reported,
            total = dropped,
            "subscriber lagged; oldest events dropped"
        );
        *reported = dropped;
        lag.counters.record(lag.idx, dropped);
    }
}

async fn deliver(sub: &dyn Subscribe, ev: &Event, bus: &Bus) {
    let fut = sub.on_event(ev);
    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
        let info = {
            let any = &*panic_err;
            if let Some(msg) = any.downcast_ref::<&'static str>() {
                (*msg).to_string()
            } else if let Some(msg) = any.downcast_ref::<String>() {
                msg.clone()
            } else {
                "unknown panic".to_string()
            }
        };
        if ev.is_subscriber_panic() {
            warn!(subscriber = sub.name(), %info, "subscriber panicked on a panic report");
        } else {
            bus.publish(Event::subscriber_panicked(sub.name(), info));
        }
    }
}
