//! # Guild worker: drains one guild queue, one command at a time.
//!
//! ## Rules
//! - Commands are pulled in FIFO order and awaited to completion before the next one
//! - A command error or panic is reported and the worker moves on
//! - The worker exits once its sender is dropped (`close_all`) and the queue is empty
//! - Every finished command decrements the shared pending counter; reaching zero wakes `join_all`

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::error::TaskError;
use crate::events::{Bus, Event, EventKind};
use crate::model::TenantId;
use crate::panic::panic_message;
use crate::scheduler::CommandInterceptor;
use crate::tasks::CommandTask;

tokio::task_local! {
    /// Guild whose worker is executing the current task, if any.
    pub(crate) static CURRENT_GUILD: TenantId;
}

/// State shared between the scheduler and all guild workers.
pub(crate) struct Shared {
    pub bus: Bus,
    pub interceptors: Vec<Arc<dyn CommandInterceptor>>,
    /// Commands submitted but not yet finished, across all guilds.
    pub pending: AtomicUsize,
    /// Notified whenever `pending` drops to zero.
    pub idle: Notify,
    /// Runtime the guild workers are spawned on.
    pub runtime: Handle,
}

/// Handle to one guild's queue.
pub(crate) struct TenantQueue {
    /// `None` once the queue was closed for new submissions.
    pub sender: Option<mpsc::UnboundedSender<CommandTask>>,
    pub worker: Option<JoinHandle<()>>,
}

impl TenantQueue {
    /// Creates the queue and spawns its worker on the scheduler's runtime.
    pub fn spawn(tenant: TenantId, shared: Arc<Shared>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let runtime = shared.runtime.clone();
        let worker = runtime.spawn(CURRENT_GUILD.scope(tenant, run_worker(tenant, rx, shared)));
        Self {
            sender: Some(tx),
            worker: Some(worker),
        }
    }
}

async fn run_worker(
    tenant: TenantId,
    mut rx: mpsc::UnboundedReceiver<CommandTask>,
    shared: Arc<Shared>,
) {
    while let Some(task) = rx.recv().await {
        let span = tracing::info_span!("command", guild = tenant.0, command = task.name());
        execute(&task, &shared).instrument(span).await;

        if shared.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            shared.idle.notify_waiters();
        }
    }
    shared
        .bus
        .publish(Event::new(EventKind::QueueDrained).with_tenant(tenant));
}

/// Runs interceptors and the command, publishing exactly one terminal event.
async fn execute(task: &CommandTask, shared: &Shared) {
    let tenant = task.tenant();
    let name = task.name();
    shared.bus.publish(
        Event::new(EventKind::TaskStarting)
            .with_tenant(tenant)
            .with_task(name)
            .with_waited(task.waited()),
    );

    let attempt = async {
        for interceptor in &shared.interceptors {
            interceptor.intercept(task).await?;
        }
        task.command().run(task.context()).await
    };

    let res = match std::panic::AssertUnwindSafe(attempt).catch_unwind().await {
        Ok(res) => res,
        Err(payload) => Err(TaskError::Panicked {
            info: panic_message(&*payload),
        }),
    };

    let ev = match res {
        Ok(()) => Event::new(EventKind::TaskCompleted),
        Err(e @ TaskError::Panicked { .. }) => {
            Event::new(EventKind::TaskPanicked).with_reason(e.to_string())
        }
        Err(e) => Event::new(EventKind::TaskFailed).with_reason(e.to_string()),
    };
    shared.bus.publish(ev.with_tenant(tenant).with_task(name));
}
