//! # Shutdown registry.
//!
//! Explicit set of components notified at shutdown. Built once at startup and
//! handed to every component that needs to register itself.
//!
//! ## Rules
//! - Membership only: registering the same instance twice is a no-op; no ordering
//! - `shutdown_all` snapshots the set first, so late registrations cannot race the iteration
//! - Every shutdownable runs concurrently with its own bounded wait; a slow or
//!   panicking one never blocks the others
//! - Every member is reported exactly once, as completed or failed

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::task::JoinSet;

use crate::events::{Bus, Event, EventKind};
use crate::panic::panic_message;

/// Component needing a bounded-time notification at process shutdown.
#[async_trait]
pub trait Shutdownable: Send + Sync + 'static {
    /// Name used in logs and shutdown events.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Stops the component, taking no longer than `remaining`.
    async fn shutdown(&self, remaining: Duration);
}

/// Set of registered [`Shutdownable`]s.
#[derive(Default)]
pub struct ShutdownRegistry {
    members: Mutex<Vec<Arc<dyn Shutdownable>>>,
}

impl ShutdownRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `member`; returns false if this instance was already registered.
    pub fn register(&self, member: Arc<dyn Shutdownable>) -> bool {
        let mut members = self.lock();
        let present = members
            .iter()
            .any(|m| std::ptr::addr_eq(Arc::as_ptr(m), Arc::as_ptr(&member)));
        if present {
            return false;
        }
        members.push(member);
        true
    }

    /// Returns a copy of the current members.
    pub fn snapshot(&self) -> Vec<Arc<dyn Shutdownable>> {
        self.lock().clone()
    }

    /// Number of registered members.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Shuts down every member concurrently, each bounded by `remaining`.
    ///
    /// Returns the names of members that panicked, overran or were lost, sorted.
    pub async fn shutdown_all(&self, remaining: Duration, bus: &Bus) -> Vec<String> {
        let mut set = JoinSet::new();
        let mut names = HashMap::new();
        for member in self.snapshot() {
            let name = member_name(&*member);
            let handle = set.spawn(async move {
                let stop = AssertUnwindSafe(async { member.shutdown(remaining).await }).catch_unwind();
                match tokio::time::timeout(remaining, stop).await {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(payload)) => Err(format!("panic: {}", panic_message(&*payload))),
                    Err(_elapsed) => Err("timeout".to_string()),
                }
            });
            names.insert(handle.id(), name);
        }

        let mut failed = Vec::new();
        while let Some(joined) = set.join_next_with_id().await {
            let (id, outcome) = match joined {
                Ok((id, outcome)) => (id, outcome),
                Err(join_err) => (join_err.id(), Err(join_err.to_string())),
            };
            let name = names.remove(&id).unwrap_or_else(|| UNNAMED.to_string());
            match outcome {
                Ok(()) => {
                    bus.publish(Event::new(EventKind::ShutdownableCompleted).with_task(name));
                }
                Err(reason) => {
                    bus.publish(
                        Event::new(EventKind::ShutdownableFailed)
                            .with_task(name.as_str())
                            .with_reason(reason),
                    );
                    failed.push(name);
                }
            }
        }
        failed.sort_unstable();
        failed
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<dyn Shutdownable>>> {
        self.members
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Reported in place of a name that could not be read.
const UNNAMED: &str = "<unnamed>";

fn member_name(member: &dyn Shutdownable) -> String {
    std::panic::catch_unwind(AssertUnwindSafe(|| member.name().to_string()))
        .unwrap_or_else(|_| UNNAMED.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    struct Counting {
        calls: AtomicUsize,
        delay: Duration,
    }

    impl Counting {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
            })
        }
    }

    #[async_trait]
    impl Shutdownable for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn shutdown(&self, _remaining: Duration) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
        }
    }

    struct Exploding;

    #[async_trait]
    impl Shutdownable for Exploding {
        fn name(&self) -> &str {
            "exploding"
        }

        async fn shutdown(&self, _remaining: Duration) {
            panic!("cannot stop");
        }
    }

    struct Nameless {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Shutdownable for Nameless {
        fn name(&self) -> &str {
            panic!("name lookup failed");
        }

        async fn shutdown(&self, _remaining: Duration) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            panic!("cannot stop either");
        }
    }

    #[test]
    fn test_register_is_set_membership() {
        let reg = ShutdownRegistry::new();
        let a = Counting::new(Duration::ZERO);
        assert!(reg.register(a.clone()));
        assert!(!reg.register(a.clone()));
        assert!(reg.register(Counting::new(Duration::ZERO)));
        assert_eq!(reg.len(), 2);
    }

    #[tokio::test]
    async fn test_slow_or_panicking_member_does_not_block_others() {
        let bus = Bus::new(16);
        let reg = ShutdownRegistry::new();
        let fast = Counting::new(Duration::ZERO);
        let slow = Counting::new(Duration::from_secs(10));
        reg.register(fast.clone());
        reg.register(slow.clone());
        reg.register(Arc::new(Exploding));

        let started = Instant::now();
        let failed = reg.shutdown_all(Duration::from_millis(50), &bus).await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(fast.calls.load(Ordering::SeqCst), 1);
        assert_eq!(slow.calls.load(Ordering::SeqCst), 1);
        assert_eq!(failed, vec!["counting".to_string(), "exploding".to_string()]);
    }

    #[tokio::test]
    async fn test_member_with_broken_name_is_still_reported() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let reg = ShutdownRegistry::new();
        let nameless = Arc::new(Nameless {
            calls: AtomicUsize::new(0),
        });
        reg.register(nameless.clone());
        reg.register(Counting::new(Duration::ZERO));

        let failed = reg.shutdown_all(Duration::from_secs(1), &bus).await;

        assert_eq!(nameless.calls.load(Ordering::SeqCst), 1);
        assert_eq!(failed, vec![UNNAMED.to_string()]);

        let (mut completed, mut failures) = (0, Vec::new());
        while let Ok(ev) = rx.try_recv() {
            match ev.kind {
                EventKind::ShutdownableCompleted => completed += 1,
                EventKind::ShutdownableFailed => failures.push(ev.task.clone()),
                _ => {}
            }
        }
        assert_eq!(completed, 1);
        assert_eq!(failures, vec![Some(Arc::<str>::from(UNNAMED))]);
    }
}
