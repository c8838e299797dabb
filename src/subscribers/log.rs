//! # LogWriter - forwards runtime events to `tracing`
//!
//! A subscriber that turns each [`Event`] into a structured `tracing` record.
//! Install a tracing subscriber first (see [`telemetry::init`](crate::telemetry::init)).
//!
//! ## Levels
//! - `error`: task panics, forced exit, shutdownable failures, subscriber panics
//! - `warn`: task failures, drain timeouts, overflow, widget failures
//! - `info`: shutdown sequence milestones, listener registration, presence changes
//! - `debug`: per-command start/finish, queue creation, permission denials

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let tenant = e.tenant.map(|t| t.0);
        let task = e.task.as_deref();
        let reason = e.reason.as_deref();

        match e.kind {
            EventKind::QueueCreated => {
                tracing::debug!(?tenant, "guild queue created");
            }
            EventKind::SubmissionRejected => {
                tracing::debug!(?tenant, ?task, "submission rejected, scheduler closed");
            }
            EventKind::TaskStarting => {
                tracing::debug!(?tenant, ?task, waited_ms = ?e.waited_ms, "command starting");
            }
            EventKind::TaskCompleted => {
                tracing::debug!(?tenant, ?task, "command completed");
            }
            EventKind::TaskFailed => {
                tracing::warn!(?tenant, ?task, ?reason, "command failed");
            }
            EventKind::TaskPanicked => {
                tracing::error!(?tenant, ?task, ?reason, "command panicked");
            }
            EventKind::QueuesClosed => {
                tracing::info!("guild queues closed for new submissions");
            }
            EventKind::QueueDrained => {
                tracing::debug!(?tenant, "guild queue drained");
            }
            EventKind::ShutdownRequested => {
                tracing::info!(deadline_ms = ?e.deadline_ms, "shutting down");
            }
            EventKind::ShutdownIgnored => {
                tracing::info!("shutdown already in progress");
            }
            EventKind::DrainCompleted => {
                tracing::info!("all commands finished");
            }
            EventKind::DrainTimedOut => {
                tracing::warn!(pending = ?e.pending, "commands still pending at shutdown deadline");
            }
            EventKind::ShutdownableCompleted => {
                tracing::debug!(?task, "shutdownable finished");
            }
            EventKind::ShutdownableFailed => {
                tracing::error!(?task, ?reason, "shutdownable failed");
            }
            EventKind::EventSourceStopped => {
                tracing::info!("event source disconnected");
            }
            EventKind::PersistenceClosed => {
                tracing::info!("persistence closed");
            }
            EventKind::ShutdownCompleted => {
                tracing::info!("shutdown complete");
            }
            EventKind::ForcedExitArmed => {
                tracing::debug!(deadline_ms = ?e.deadline_ms, "forced exit armed");
            }
            EventKind::ForcedExitCancelled => {
                tracing::debug!("forced exit cancelled");
            }
            EventKind::ForcedExitFired => {
                tracing::error!(deadline_ms = ?e.deadline_ms, "shutdown deadline exceeded, forcing exit");
            }
            EventKind::ListenersRegistered => {
                tracing::info!("registered listeners");
            }
            EventKind::ListenersRemoved => {
                tracing::info!("removed listeners");
            }
            EventKind::PlaybackPaused => {
                tracing::info!(?tenant, "channel empty, playback paused");
            }
            EventKind::AloneMarked => {
                tracing::debug!(?tenant, "channel empty, alone marker set");
            }
            EventKind::AloneCleared => {
                tracing::debug!(?tenant, "member joined, alone marker cleared");
            }
            EventKind::WidgetDenied => {
                tracing::debug!(?tenant, emoji = ?task, permission = ?reason, "widget action denied");
            }
            EventKind::WidgetFailed => {
                tracing::warn!(?tenant, emoji = ?task, ?reason, "widget action failed");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(subscriber = ?task, ?reason, "subscriber dropped event");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(subscriber = ?task, ?reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
