//! # SubscriberSet: per-subscriber delivery of guild events.
//!
//! A busy guild can publish a burst of events (every queued command produces
//! at least two). The set keeps that burst away from the publisher: `emit`
//! only pushes into bounded per-subscriber outboxes, and each subscriber drains
//! its own outbox on a dedicated worker.
//!
//! ```text
//!                      ┌─► outbox "log-writer"  ──► worker ──► LogWriter::on_event
//! emit(TaskCompleted) ─┤
//!                      └─► outbox "audit"       ──► worker ──► Audit::on_event
//!                                   │ full                         │ panic
//!                                   ▼                              ▼
//!                           SubscriberOverflow             SubscriberPanicked
//! ```
//!
//! A subscriber sees events in emit order. Two subscribers are not kept in
//! step with each other. Panics are caught with `AssertUnwindSafe`, so a
//! subscriber that panics while holding its own lock may leave that state
//! poisoned.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use guildvisor::{Bus, Event, EventKind, Subscribe, SubscriberSet, TenantId};
//!
//! struct Audit;
//!
//! #[async_trait]
//! impl Subscribe for Audit {
//!     async fn on_event(&self, event: &Event) {
//!         if let (EventKind::TaskFailed, Some(guild)) = (event.kind, event.tenant) {
//!             println!("guild {guild}: {:?} failed", event.task);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "audit"
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let set = SubscriberSet::new(vec![Arc::new(Audit)], Bus::new(64));
//! set.emit(&Event::new(EventKind::TaskFailed).with_tenant(TenantId(42)).with_task("play"));
//! set.shutdown().await;
//! # }
//! ```

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::events::{Bus, Event};
use crate::panic::panic_message;
use crate::subscribers::Subscribe;

struct Outbox {
    subscriber: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
}

/// Fans events out to a fixed list of [`Subscribe`] implementations.
pub struct SubscriberSet {
    outboxes: Vec<Outbox>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Starts one worker per subscriber.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let (outboxes, workers) = subs
            .into_iter()
            .map(|sub| {
                let (tx, rx) = mpsc::channel(sub.queue_capacity().max(1));
                let outbox = Outbox {
                    subscriber: sub.name(),
                    tx,
                };
                (outbox, tokio::spawn(deliver(sub, rx, bus.clone())))
            })
            .unzip();
        Self {
            outboxes,
            workers,
            bus,
        }
    }

    /// Queues a copy of `event` for every subscriber.
    pub fn emit(&self, event: &Event) {
        self.emit_arc(Arc::new(event.clone()));
    }

    /// Queues `event` for every subscriber without copying it.
    ///
    /// A subscriber whose outbox is full or closed misses the event, and a
    /// `SubscriberOverflow` is published for it unless `event` is itself an
    /// overflow report.
    pub fn emit_arc(&self, event: Arc<Event>) {
        let report = !event.is_subscriber_overflow();
        for outbox in &self.outboxes {
            let reason = match outbox.tx.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(TrySendError::Full(_)) => "full",
                Err(TrySendError::Closed(_)) => "closed",
            };
            if report {
                self.bus
                    .publish(Event::subscriber_overflow(outbox.subscriber, reason));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.outboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outboxes.is_empty()
    }

    /// Closes every outbox and waits until each worker has handled what was queued.
    pub async fn shutdown(self) {
        drop(self.outboxes);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

async fn deliver(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>, bus: Bus) {
    while let Some(event) = rx.recv().await {
        let handled = std::panic::AssertUnwindSafe(sub.on_event(&event))
            .catch_unwind()
            .await;
        if let Err(payload) = handled {
            bus.publish(Event::subscriber_panicked(sub.name(), panic_message(&*payload)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::model::TenantId;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recorder {
        seen: Arc<Mutex<Vec<EventKind>>>,
        capacity: usize,
    }

    impl Recorder {
        fn new(capacity: usize) -> (Arc<Self>, Arc<Mutex<Vec<EventKind>>>) {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let rec = Arc::new(Self {
                seen: seen.clone(),
                capacity,
            });
            (rec, seen)
        }
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.seen.lock().unwrap().push(event.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }

        fn queue_capacity(&self) -> usize {
            self.capacity
        }
    }

    struct Panicker;

    #[async_trait]
    impl Subscribe for Panicker {
        async fn on_event(&self, _event: &Event) {
            panic!("subscriber exploded");
        }

        fn name(&self) -> &'static str {
            "panicker"
        }
    }

    struct Tiny;

    #[async_trait]
    impl Subscribe for Tiny {
        async fn on_event(&self, _event: &Event) {}

        fn name(&self) -> &'static str {
            "tiny"
        }

        fn queue_capacity(&self) -> usize {
            0
        }
    }

    #[tokio::test]
    async fn test_panicking_subscriber_does_not_starve_others() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let (recorder, seen) = Recorder::new(16);
        let set = SubscriberSet::new(vec![Arc::new(Panicker), recorder], bus.clone());

        set.emit(&Event::new(EventKind::QueueCreated));
        set.emit(&Event::new(EventKind::QueuesClosed));
        set.shutdown().await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![EventKind::QueueCreated, EventKind::QueuesClosed]
        );
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.task.as_deref(), Some("panicker"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber exploded"));
    }

    #[tokio::test]
    async fn test_full_outbox_drops_for_that_subscriber_only() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let (roomy, seen) = Recorder::new(16);
        let set = SubscriberSet::new(vec![Arc::new(Tiny), roomy], bus.clone());

        // Workers cannot run before the first await on this runtime.
        for _ in 0..3 {
            set.emit(&Event::new(EventKind::TaskCompleted).with_tenant(TenantId(9)));
        }
        set.shutdown().await;

        assert_eq!(seen.lock().unwrap().len(), 3);
        let mut overflowed = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::SubscriberOverflow {
                overflowed.push(ev.task.clone());
            }
        }
        assert_eq!(overflowed, vec![Some(Arc::<str>::from("tiny")); 2]);
    }
}
