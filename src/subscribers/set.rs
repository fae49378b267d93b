//! # Subscribers and their fan-out.
//!
//! [`Subscribe`] is the extension point for observing lifecycle events;
//! [`SubscriberSet`] delivers every [`Event`] to each subscriber through its own
//! bounded queue and worker task, **without awaiting** their processing.
//!
//! ## Delivery contract
//! - `emit(&Event)` never blocks the unit or the orchestrator.
//! - Per-subscriber FIFO: a subscriber sees events in emission order, one at a time.
//! - A full queue drops the event for that subscriber only; the first drop is
//!   logged, the total is reported when the set shuts down.
//! - A panic in `on_event` is caught and logged; the worker keeps going.
//! - Shutdown drains: every event emitted before [`SubscriberSet::shutdown`]
//!   (up to and including [`EventKind::Bye`](crate::EventKind::Bye)) is handed to
//!   its subscriber before the orchestrator applies its exit policy.
//!
//! ## Diagram
//! ```text
//!    emit(&Event)
//!        │                        (Arc-clone per subscriber)
//!        ├────────────────► [queue S1] ─► pump S1 ─► on_event()
//!        ├────────────────► [queue S2] ─► pump S2 ─► on_event()
//!        └────────────────► [queue SN] ─► pump SN ─► on_event()
//! ```
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use gracevisor::{Event, EventKind, Subscribe};
//!
//! struct Audit;
//!
//! #[async_trait]
//! impl Subscribe for Audit {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::UnitFailed {
//!             // page someone
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "audit" }
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::error::panic_info;
use crate::events::Event;

/// Lifecycle event subscriber.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event. Never called concurrently with itself.
    ///
    /// Slow handlers only delay their own queue, but the final drain waits for
    /// them, so keep the work after [`EventKind::Bye`](crate::EventKind::Bye) short.
    async fn on_event(&self, event: &Event);

    /// Name used in diagnostics. Defaults to the type name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Queue capacity for this subscriber (minimum 1). Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}

struct Lane {
    name: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
    dropped: AtomicU64,
}

/// Fan-out over subscribers, one bounded queue and worker task each.
pub struct SubscriberSet {
    lanes: Vec<Lane>,
    pumps: Vec<JoinHandle<()>>,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker per subscriber.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        let (lanes, pumps): (Vec<Lane>, Vec<JoinHandle<()>>) = subs
            .into_iter()
            .map(|sub| {
                let (tx, rx) = mpsc::channel(sub.queue_capacity().max(1));
                let lane = Lane {
                    name: sub.name(),
                    tx,
                    dropped: AtomicU64::new(0),
                };
                (lane, tokio::spawn(pump(sub, rx)))
            })
            .unzip();

        Self { lanes, pumps }
    }

    /// Queues `event` for every subscriber without waiting.
    pub fn emit(&self, event: &Event) {
        let ev = Arc::new(event.clone());
        for lane in &self.lanes {
            if lane.tx.try_send(Arc::clone(&ev)).is_err()
                && lane.dropped.fetch_add(1, Ordering::Relaxed) == 0
            {
                tracing::warn!(
                    subscriber = lane.name,
                    kind = ?ev.kind,
                    "subscriber lagging; dropping events"
                );
            }
        }
    }

    /// Closes every queue and waits until each subscriber handled what was queued.
    pub async fn shutdown(self) {
        for lane in &self.lanes {
            let dropped = lane.dropped.load(Ordering::Relaxed);
            if dropped > 0 {
                tracing::warn!(subscriber = lane.name, dropped, "events dropped for subscriber");
            }
        }
        drop(self.lanes);
        for pump in self.pumps {
            let _ = pump.await;
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.len()
    }
}

/// Feeds one subscriber until its queue is closed and empty.
async fn pump(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>) {
    while let Some(ev) = rx.recv().await {
        let handled = std::panic::AssertUnwindSafe(sub.on_event(&ev))
            .catch_unwind()
            .await;
        if let Err(panic) = handled {
            tracing::warn!(
                subscriber = sub.name(),
                info = %panic_info(panic.as_ref()),
                "subscriber panicked"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Collect(Mutex<Vec<u64>>);

    #[async_trait]
    impl Subscribe for Collect {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().unwrap().push(ev.seq);
        }
    }

    struct Explode;

    #[async_trait]
    impl Subscribe for Explode {
        async fn on_event(&self, _ev: &Event) {
            panic!("subscriber bug");
        }

        fn name(&self) -> &'static str {
            "explode"
        }
    }

    #[derive(Default)]
    struct Slow(Mutex<usize>);

    #[async_trait]
    impl Subscribe for Slow {
        async fn on_event(&self, _ev: &Event) {
            tokio::time::sleep(Duration::from_millis(50)).await;
            *self.0.lock().unwrap() += 1;
        }

        fn queue_capacity(&self) -> usize {
            0
        }
    }

    #[tokio::test]
    async fn shutdown_delivers_queued_events_in_order() {
        let sink = Arc::new(Collect::default());
        let set = SubscriberSet::new(vec![
            sink.clone() as Arc<dyn Subscribe>,
            Arc::new(Explode) as Arc<dyn Subscribe>,
        ]);
        assert_eq!(set.len(), 2);

        let events: Vec<Event> = (0..5).map(|_| Event::new(EventKind::UnitReady)).collect();
        for ev in &events {
            set.emit(ev);
        }
        set.shutdown().await;

        let seen = sink.0.lock().unwrap().clone();
        let expected: Vec<u64> = events.iter().map(|e| e.seq).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_drops_for_that_subscriber_only() {
        let slow = Arc::new(Slow::default());
        let sink = Arc::new(Collect::default());
        let set = SubscriberSet::new(vec![
            slow.clone() as Arc<dyn Subscribe>,
            sink.clone() as Arc<dyn Subscribe>,
        ]);

        // Capacity clamps to 1: the second and third events overflow the slow lane.
        for _ in 0..3 {
            set.emit(&Event::new(EventKind::UnitStopped));
        }
        set.shutdown().await;

        assert_eq!(*slow.0.lock().unwrap(), 1);
        assert_eq!(sink.0.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn empty_set_is_noop() {
        let set = SubscriberSet::new(Vec::new());
        assert!(set.is_empty());
        set.emit(&Event::new(EventKind::Bye));
        set.shutdown().await;
    }
}
