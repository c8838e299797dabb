//! # Runtime events emitted by the scheduler, shutdown sequence and listeners.
//!
//! The [`EventKind`] enum classifies event types across these categories:
//! - **Scheduler events**: guild queues and command execution
//! - **Shutdown events**: the orchestrated shutdown sequence and forced exit
//! - **Listener events**: presence handling and widget actions
//! - **Subscriber events**: subscriber worker failures
//!
//! The [`Event`] struct carries additional metadata such as timestamps, guild,
//! command/component name, reasons and durations.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use guildvisor::{Event, EventKind, TenantId};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_tenant(TenantId(7))
//!     .with_task("play")
//!     .with_reason("boom")
//!     .with_waited(Duration::from_millis(12));
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.tenant, Some(TenantId(7)));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::model::TenantId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Scheduler events ===
    /// First submission for a guild created its queue and worker.
    ///
    /// Sets:
    /// - `tenant`: guild
    QueueCreated,

    /// A command was rejected because the scheduler is closed.
    ///
    /// Sets:
    /// - `tenant`: guild
    /// - `task`: command name
    SubmissionRejected,

    /// A guild worker picked up a command.
    ///
    /// Sets:
    /// - `tenant`: guild
    /// - `task`: command name
    /// - `waited_ms`: time spent queued
    TaskStarting,

    /// Command finished successfully.
    ///
    /// Sets:
    /// - `tenant`: guild
    /// - `task`: command name
    TaskCompleted,

    /// Command returned an error or was rejected by an interceptor.
    ///
    /// Sets:
    /// - `tenant`: guild
    /// - `task`: command name
    /// - `reason`: failure message
    TaskFailed,

    /// Command panicked; the worker survived and continues.
    ///
    /// Sets:
    /// - `tenant`: guild
    /// - `task`: command name
    /// - `reason`: panic info
    TaskPanicked,

    /// All queues were closed for new submissions.
    QueuesClosed,

    /// A closed guild queue ran out of commands and its worker exited.
    ///
    /// Sets:
    /// - `tenant`: guild
    QueueDrained,

    // === Shutdown events ===
    /// Shutdown sequence started.
    ///
    /// Sets:
    /// - `deadline_ms`: overall deadline
    ShutdownRequested,

    /// Shutdown was requested again while already in progress; ignored.
    ShutdownIgnored,

    /// Every guild queue drained within the deadline.
    DrainCompleted,

    /// Guild queues were still busy when the deadline elapsed.
    ///
    /// Sets:
    /// - `pending`: commands still queued or in flight
    DrainTimedOut,

    /// A registered shutdownable finished.
    ///
    /// Sets:
    /// - `task`: shutdownable name
    ShutdownableCompleted,

    /// A registered shutdownable panicked or exceeded the remaining deadline.
    ///
    /// Sets:
    /// - `task`: shutdownable name
    /// - `reason`: "panic: ..." or "timeout"
    ShutdownableFailed,

    /// The external event source was disconnected.
    EventSourceStopped,

    /// The persistence resource was closed.
    PersistenceClosed,

    /// Shutdown sequence finished cleanly.
    ShutdownCompleted,

    /// Forced-exit timer started.
    ///
    /// Sets:
    /// - `deadline_ms`: time until forced exit
    ForcedExitArmed,

    /// Forced-exit timer cancelled after a clean (or abandoned) shutdown.
    ForcedExitCancelled,

    /// Forced-exit timer fired; the process is terminating.
    ForcedExitFired,

    // === Listener events ===
    /// Listeners were attached to the event source and status set online.
    ListenersRegistered,

    /// Listeners were detached from the event source and status set idle.
    ListenersRemoved,

    /// The last human left the playing channel and playback was paused.
    ///
    /// Sets:
    /// - `tenant`: guild
    PlaybackPaused,

    /// The last human left the playing channel; the alone marker was set.
    ///
    /// Sets:
    /// - `tenant`: guild
    AloneMarked,

    /// A human joined the playing channel; the alone marker was cleared.
    ///
    /// Sets:
    /// - `tenant`: guild
    AloneCleared,

    /// A widget action was refused for lack of permission.
    ///
    /// Sets:
    /// - `tenant`: guild
    /// - `task`: emoji
    /// - `reason`: permission name
    WidgetDenied,

    /// A widget action handler failed.
    ///
    /// Sets:
    /// - `tenant`: guild
    /// - `task`: emoji
    /// - `reason`: error message
    WidgetFailed,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Guild the event concerns, if any.
    pub tenant: Option<TenantId>,
    /// Command, shutdownable, subscriber or emoji name.
    pub task: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Time a command spent queued in milliseconds (compact).
    pub waited_ms: Option<u32>,
    /// Deadline in milliseconds (compact).
    pub deadline_ms: Option<u32>,
    /// Number of pending commands.
    pub pending: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            tenant: None,
            task: None,
            reason: None,
            waited_ms: None,
            deadline_ms: None,
            pending: None,
        }
    }

    /// Attaches a guild.
    #[inline]
    pub fn with_tenant(mut self, tenant: TenantId) -> Self {
        self.tenant = Some(tenant);
        self
    }

    /// Attaches a command/component name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches the time spent queued (stored as milliseconds).
    #[inline]
    pub fn with_waited(mut self, d: Duration) -> Self {
        self.waited_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a deadline (stored as milliseconds).
    #[inline]
    pub fn with_deadline(mut self, d: Duration) -> Self {
        self.deadline_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a pending command count.
    #[inline]
    pub fn with_pending(mut self, n: usize) -> Self {
        self.pending = Some(n.min(u32::MAX as usize) as u32);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}

fn compact_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}
