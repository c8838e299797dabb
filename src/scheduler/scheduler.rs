//! # CommandScheduler: one serial worker per guild.
//!
//! ## Rules
//! - `submit` never blocks and never waits for the command to run; it may be
//!   called from any thread, workers run on the runtime the scheduler was built in
//! - Commands of one guild complete in submission order, one at a time
//! - Commands of different guilds run concurrently
//! - After `close_all`, every `submit` fails with [`SchedulerError::Closed`];
//!   already queued commands still run to completion
//! - `join_all` never cancels anything; on timeout it only releases the caller
//!
//! Calling `join_all` from inside a guild command waits on that command's own
//! worker and never completes; shutdown must not be triggered from a command.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::Notify;

use crate::error::SchedulerError;
use crate::events::{Bus, Event, EventKind};
use crate::model::TenantId;
use crate::scheduler::CommandInterceptor;
use crate::scheduler::queue::{CURRENT_GUILD, Shared, TenantQueue};
use crate::tasks::{CommandRef, CommandTask};

struct State {
    closed: bool,
    queues: HashMap<TenantId, TenantQueue>,
}

/// Per-guild command scheduler.
pub struct CommandScheduler {
    state: Mutex<State>,
    shared: Arc<Shared>,
}

impl CommandScheduler {
    /// Creates a scheduler without interceptors.
    ///
    /// Must be called from within a tokio runtime; guild workers are spawned on it.
    pub fn new(bus: Bus) -> Self {
        Self::with_interceptors(bus, Vec::new())
    }

    /// Creates a scheduler running `interceptors` (in order) before every command.
    pub fn with_interceptors(bus: Bus, interceptors: Vec<Arc<dyn CommandInterceptor>>) -> Self {
        Self::on_runtime(Handle::current(), bus, interceptors)
    }

    /// Creates a scheduler whose guild workers are spawned on `runtime`.
    pub fn on_runtime(
        runtime: Handle,
        bus: Bus,
        interceptors: Vec<Arc<dyn CommandInterceptor>>,
    ) -> Self {
        Self {
            state: Mutex::new(State {
                closed: false,
                queues: HashMap::new(),
            }),
            shared: Arc::new(Shared {
                bus,
                interceptors,
                pending: Default::default(),
                idle: Notify::new(),
                runtime,
            }),
        }
    }

    /// Enqueues `command` on the queue of `tenant`, creating the queue on first use.
    ///
    /// Returns immediately. Safe to call from threads outside the runtime,
    /// such as a synchronous gateway callback.
    pub fn submit(&self, tenant: TenantId, command: CommandRef) -> Result<(), SchedulerError> {
        self.submit_task(CommandTask::new(tenant, command))
    }

    /// Enqueues an already built [`CommandTask`].
    pub fn submit_task(&self, task: CommandTask) -> Result<(), SchedulerError> {
        let tenant = task.tenant();
        let mut state = self.lock();
        if state.closed {
            drop(state);
            self.shared.bus.publish(
                Event::new(EventKind::SubmissionRejected)
                    .with_tenant(tenant)
                    .with_task(task.name()),
            );
            return Err(SchedulerError::Closed);
        }

        let queue = state.queues.entry(tenant).or_insert_with(|| {
            self.shared
                .bus
                .publish(Event::new(EventKind::QueueCreated).with_tenant(tenant));
            TenantQueue::spawn(tenant, Arc::clone(&self.shared))
        });
        let Some(sender) = &queue.sender else {
            return Err(SchedulerError::Closed);
        };

        self.shared.pending.fetch_add(1, Ordering::AcqRel);
        if sender.send(task).is_err() {
            // Worker is gone; undo the reservation.
            self.finish_one();
            return Err(SchedulerError::Closed);
        }
        Ok(())
    }

    /// Closes every guild queue for new submissions. Idempotent.
    ///
    /// Queued commands keep running; each worker exits once its queue is empty.
    pub fn close_all(&self) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        for queue in state.queues.values_mut() {
            queue.sender = None;
        }
        drop(state);
        self.shared.bus.publish(Event::new(EventKind::QueuesClosed));
    }

    /// Waits until every queued and running command has finished, or `deadline` elapses.
    ///
    /// Once the scheduler is closed, also waits for the guild workers to exit.
    /// On timeout returns [`SchedulerError::JoinTimeout`]; running commands are
    /// left alone.
    pub async fn join_all(&self, deadline: Duration) -> Result<(), SchedulerError> {
        debug_assert!(
            CURRENT_GUILD.try_with(|_| ()).is_err(),
            "join_all called from inside a guild command would wait on itself"
        );

        let drained = async {
            self.wait_idle().await;
            for worker in self.take_workers() {
                let _ = worker.await;
            }
        };

        tokio::time::timeout(deadline, drained)
            .await
            .map_err(|_| SchedulerError::JoinTimeout {
                deadline,
                pending: self.pending(),
            })
    }

    /// Number of commands submitted but not yet finished.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::Acquire)
    }

    /// Returns true once [`close_all`](Self::close_all) was called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Returns the sorted list of guilds that have a queue.
    pub fn tenants(&self) -> Vec<TenantId> {
        let mut tenants: Vec<TenantId> = self.lock().queues.keys().copied().collect();
        tenants.sort_unstable();
        tenants
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Takes the worker handles of closed queues.
    fn take_workers(&self) -> Vec<tokio::task::JoinHandle<()>> {
        let mut state = self.lock();
        if !state.closed {
            return Vec::new();
        }
        state
            .queues
            .values_mut()
            .filter_map(|q| q.worker.take())
            .collect()
    }

    fn finish_one(&self) {
        if self.shared.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.shared.idle.notify_waiters();
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
