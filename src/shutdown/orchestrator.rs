//! # ShutdownOrchestrator: the process-wide shutdown sequence.
//!
//! ## State machine
//! ```text
//! Running ──shutdown()──► Draining ──queues drained──► StoppingListeners ──► Complete
//!                             │
//!                             ├─ deadline exceeded ─► stays Draining, forced exit fires
//!                             └─ aborted           ─► stays Draining, forced exit cancelled
//! ```
//!
//! ## Rules
//! - Only the first `shutdown` call runs the sequence; later or concurrent calls are no-ops
//! - The forced-exit timer is armed before anything else and cancelled only after
//!   the persistence resource is closed or the drain is aborted. The orchestrator
//!   owns it, so dropping a `shutdown` future mid-drain leaves it armed
//! - Shutdownables receive whatever is left of the deadline after draining
//! - Must not be called from inside a guild command (the drain would wait on itself)

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::{RuntimeError, SchedulerError};
use crate::events::{Bus, Event, EventKind};
use crate::scheduler::CommandScheduler;
use crate::shutdown::registry::ShutdownRegistry;
use crate::shutdown::source::{EventSource, Listener, OnlineStatus, Persistence};
use crate::shutdown::timer::{ExitHook, ForcedExitTimer};

/// Phase of the shutdown sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ShutdownState {
    Running = 0,
    Draining = 1,
    StoppingListeners = 2,
    Complete = 3,
}

impl ShutdownState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ShutdownState::Running,
            1 => ShutdownState::Draining,
            2 => ShutdownState::StoppingListeners,
            _ => ShutdownState::Complete,
        }
    }
}

/// Runs the ordered shutdown sequence exactly once.
pub struct ShutdownOrchestrator {
    state: AtomicU8,
    scheduler: Arc<CommandScheduler>,
    registry: Arc<ShutdownRegistry>,
    event_source: Arc<dyn EventSource>,
    persistence: Arc<dyn Persistence>,
    listeners: Vec<Arc<dyn Listener>>,
    bus: Bus,
    exit_code: i32,
    exit_hook: ExitHook,
    /// Forced-exit timer of the running sequence.
    armed: Mutex<Option<ForcedExitTimer>>,
}

impl ShutdownOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scheduler: Arc<CommandScheduler>,
        registry: Arc<ShutdownRegistry>,
        event_source: Arc<dyn EventSource>,
        persistence: Arc<dyn Persistence>,
        listeners: Vec<Arc<dyn Listener>>,
        bus: Bus,
        exit_code: i32,
        exit_hook: ExitHook,
    ) -> Self {
        Self {
            state: AtomicU8::new(ShutdownState::Running as u8),
            scheduler,
            registry,
            event_source,
            persistence,
            listeners,
            bus,
            exit_code,
            exit_hook,
            armed: Mutex::new(None),
        }
    }

    /// Current phase.
    pub fn state(&self) -> ShutdownState {
        ShutdownState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Attaches all listeners to the event source and sets the status online.
    ///
    /// No-op once shutdown has started.
    pub fn register_listeners(&self) {
        let state = self.state();
        if state != ShutdownState::Running {
            tracing::debug!(?state, "listeners not registered, shutdown already started");
            return;
        }
        for listener in &self.listeners {
            self.event_source.add_listener(Arc::clone(listener));
        }
        self.event_source.set_status(OnlineStatus::Online);
        self.bus.publish(Event::new(EventKind::ListenersRegistered));
    }

    /// Sets the status idle and detaches all listeners from the event source.
    pub fn shutdown_listeners(&self) {
        self.event_source.set_status(OnlineStatus::Idle);
        for listener in &self.listeners {
            self.event_source.remove_listener(listener);
        }
        self.bus.publish(Event::new(EventKind::ListenersRemoved));
    }

    /// Runs the shutdown sequence within `deadline`.
    ///
    /// Returns [`RuntimeError::DrainTimeout`] if guild queues did not drain in
    /// time; the forced-exit timer then stays armed and terminates the process.
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), RuntimeError> {
        self.shutdown_with_abort(deadline, CancellationToken::new())
            .await
    }

    /// Like [`shutdown`](Self::shutdown), but gives up while draining once `abort` is cancelled.
    ///
    /// Abandoning cancels the forced-exit timer and leaves the orchestrator in
    /// `Draining`; the scheduler stays closed and further shutdown calls are no-ops.
    pub async fn shutdown_with_abort(
        &self,
        deadline: Duration,
        abort: CancellationToken,
    ) -> Result<(), RuntimeError> {
        if self
            .state
            .compare_exchange(
                ShutdownState::Running as u8,
                ShutdownState::Draining as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            self.bus.publish(Event::new(EventKind::ShutdownIgnored));
            return Ok(());
        }

        let started = Instant::now();
        self.bus
            .publish(Event::new(EventKind::ShutdownRequested).with_deadline(deadline));
        *self.timer_slot() = Some(ForcedExitTimer::arm(
            deadline,
            self.exit_code,
            Arc::clone(&self.exit_hook),
            self.bus.clone(),
        ));

        self.shutdown_listeners();
        self.scheduler.close_all();

        let drained = tokio::select! {
            res = self.scheduler.join_all(deadline) => res,
            _ = abort.cancelled() => {
                self.disarm();
                return Err(RuntimeError::ShutdownAbandoned);
            }
        };
        if let Err(SchedulerError::JoinTimeout { pending, .. }) = drained {
            self.bus
                .publish(Event::new(EventKind::DrainTimedOut).with_pending(pending));
            return Err(RuntimeError::DrainTimeout { deadline, pending });
        }
        self.bus.publish(Event::new(EventKind::DrainCompleted));

        self.state
            .store(ShutdownState::StoppingListeners as u8, Ordering::Release);
        let remaining = deadline.saturating_sub(started.elapsed());
        self.registry.shutdown_all(remaining, &self.bus).await;

        self.event_source.disconnect().await;
        self.bus.publish(Event::new(EventKind::EventSourceStopped));
        self.persistence.close().await;
        self.bus.publish(Event::new(EventKind::PersistenceClosed));

        self.disarm();
        self.state
            .store(ShutdownState::Complete as u8, Ordering::Release);
        self.bus.publish(Event::new(EventKind::ShutdownCompleted));
        Ok(())
    }

    fn disarm(&self) {
        let timer = self.timer_slot().take();
        if let Some(timer) = timer {
            timer.cancel();
        }
    }

    fn timer_slot(&self) -> std::sync::MutexGuard<'_, Option<ForcedExitTimer>> {
        self.armed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TenantId;
    use crate::shutdown::Shutdownable;
    use crate::tasks::{CommandContext, CommandFn};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicI32, AtomicUsize};

    #[derive(Default)]
    struct FakeSource {
        calls: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventSource for FakeSource {
        fn add_listener(&self, listener: Arc<dyn Listener>) {
            self.calls.lock().unwrap().push(format!("add {}", listener.name()));
        }

        fn remove_listener(&self, listener: &Arc<dyn Listener>) {
            self.calls.lock().unwrap().push(format!("remove {}", listener.name()));
        }

        fn set_status(&self, status: OnlineStatus) {
            self.calls.lock().unwrap().push(format!("status {status:?}"));
        }

        async fn disconnect(&self) {
            self.calls.lock().unwrap().push("disconnect".into());
        }
    }

    #[derive(Default)]
    struct FakePersistence {
        closed: AtomicUsize,
    }

    #[async_trait]
    impl Persistence for FakePersistence {
        async fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Named(&'static str);

    impl Listener for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[derive(Default)]
    struct CountingShutdownable {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Shutdownable for CountingShutdownable {
        async fn shutdown(&self, _remaining: Duration) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Fixture {
        orchestrator: Arc<ShutdownOrchestrator>,
        scheduler: Arc<CommandScheduler>,
        source: Arc<FakeSource>,
        persistence: Arc<FakePersistence>,
        member: Arc<CountingShutdownable>,
        exit_code: Arc<AtomicI32>,
    }

    fn fixture() -> Fixture {
        let bus = Bus::new(256);
        let scheduler = Arc::new(CommandScheduler::new(bus.clone()));
        let registry = Arc::new(ShutdownRegistry::new());
        let member = Arc::new(CountingShutdownable::default());
        registry.register(member.clone());
        let source = Arc::new(FakeSource::default());
        let persistence = Arc::new(FakePersistence::default());
        let exit_code = Arc::new(AtomicI32::new(-1));
        let seen = exit_code.clone();
        let orchestrator = Arc::new(ShutdownOrchestrator::new(
            scheduler.clone(),
            registry,
            source.clone(),
            persistence.clone(),
            vec![Arc::new(Named("commands"))],
            bus,
            7,
            Arc::new(move |code| seen.store(code, Ordering::SeqCst)),
        ));
        Fixture {
            orchestrator,
            scheduler,
            source,
            persistence,
            member,
            exit_code,
        }
    }

    #[tokio::test]
    async fn test_full_sequence_runs_in_order() {
        let f = fixture();
        f.orchestrator.register_listeners();
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = finished.clone();
        f.scheduler
            .submit(TenantId(1), CommandFn::arc("queued", move |_ctx: CommandContext| {
                let counter = counter.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }))
            .unwrap();

        f.orchestrator.shutdown(Duration::from_secs(5)).await.unwrap();

        assert_eq!(f.orchestrator.state(), ShutdownState::Complete);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(f.member.calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.persistence.closed.load(Ordering::SeqCst), 1);
        assert_eq!(
            f.source.calls(),
            vec![
                "add commands",
                "status Online",
                "status Idle",
                "remove commands",
                "disconnect"
            ]
        );
        assert!(f.scheduler.submit(TenantId(1), CommandFn::arc("late", |_ctx: CommandContext| async { Ok(()) })).is_err());
        assert_eq!(f.exit_code.load(Ordering::SeqCst), -1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_calls_drain_once() {
        let f = fixture();
        let a = {
            let o = f.orchestrator.clone();
            tokio::spawn(async move { o.shutdown(Duration::from_secs(5)).await })
        };
        let b = {
            let o = f.orchestrator.clone();
            tokio::spawn(async move { o.shutdown(Duration::from_secs(5)).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();
        // The losing call returns immediately; give the winner time to finish.
        f.orchestrator.shutdown(Duration::from_secs(5)).await.unwrap();
        for _ in 0..100 {
            if f.orchestrator.state() == ShutdownState::Complete {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(f.member.calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.persistence.closed.load(Ordering::SeqCst), 1);
        assert_eq!(
            f.source.calls().iter().filter(|c| *c == "disconnect").count(),
            1
        );
    }

    #[tokio::test]
    async fn test_stuck_drain_forces_exit() {
        let f = fixture();
        f.scheduler
            .submit(TenantId(2), CommandFn::arc("stuck", |_ctx: CommandContext| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            }))
            .unwrap();

        let err = f
            .orchestrator
            .shutdown(Duration::from_millis(50))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RuntimeError::DrainTimeout {
                deadline: Duration::from_millis(50),
                pending: 1
            }
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(f.exit_code.load(Ordering::SeqCst), 7);
        assert_eq!(f.persistence.closed.load(Ordering::SeqCst), 0);
        assert_eq!(f.orchestrator.state(), ShutdownState::Draining);
    }

    #[tokio::test]
    async fn test_dropped_shutdown_future_keeps_forced_exit_armed() {
        let f = fixture();
        f.scheduler
            .submit(TenantId(4), CommandFn::arc("stuck", |_ctx: CommandContext| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            }))
            .unwrap();

        let gave_up = tokio::time::timeout(
            Duration::from_millis(20),
            f.orchestrator.shutdown(Duration::from_millis(100)),
        )
        .await;
        assert!(gave_up.is_err());
        assert_eq!(f.orchestrator.state(), ShutdownState::Draining);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(f.exit_code.load(Ordering::SeqCst), 7);

        f.exit_code.store(-1, Ordering::SeqCst);
        f.orchestrator.shutdown(Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(f.exit_code.load(Ordering::SeqCst), -1);
    }

    #[tokio::test]
    async fn test_listeners_stay_detached_after_shutdown() {
        let f = fixture();
        f.orchestrator.shutdown(Duration::from_secs(1)).await.unwrap();
        let before = f.source.calls();

        f.orchestrator.register_listeners();

        assert_eq!(f.source.calls(), before);
        assert!(!before.iter().any(|c| c == "status Online"));
    }

    #[tokio::test]
    async fn test_abort_abandons_and_cancels_forced_exit() {
        let f = fixture();
        f.scheduler
            .submit(TenantId(3), CommandFn::arc("stuck", |_ctx: CommandContext| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            }))
            .unwrap();

        let abort = CancellationToken::new();
        let trigger = abort.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = f
            .orchestrator
            .shutdown_with_abort(Duration::from_millis(150), abort)
            .await
            .unwrap_err();
        assert_eq!(err, RuntimeError::ShutdownAbandoned);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(f.exit_code.load(Ordering::SeqCst), -1);
        assert_eq!(f.orchestrator.state(), ShutdownState::Draining);
    }
}
