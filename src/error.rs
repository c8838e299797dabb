//! Error types used by the guildvisor runtime, commands and widgets.
//!
//! - [`SchedulerError`] - submission and drain failures of the per-guild scheduler.
//! - [`TaskError`] - the outcome of one command execution inside a guild worker.
//! - [`PermissionDenied`] - a member lacks a permission required by a widget action.
//! - [`WidgetError`] - failures surfaced by widget action dispatch.
//! - [`BulkLoadError`] - misuse of a [`BulkLoader`](crate::BulkLoader).
//! - [`RuntimeError`] - shutdown sequence outcomes.
//!
//! All enums provide `as_label` for logs/metrics.

use std::time::Duration;
use thiserror::Error;

use crate::model::MemberId;

/// # Errors produced by the per-guild scheduler.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// The scheduler was closed for new submissions (shutdown in progress).
    ///
    /// Recoverable: the caller should drop or redirect the command.
    #[error("scheduler closed for new submissions")]
    Closed,

    /// Queued or running commands did not finish before the deadline.
    #[error("commands still pending after {deadline:?}: {pending} left")]
    JoinTimeout {
        /// The deadline that elapsed.
        deadline: Duration,
        /// Commands queued or in flight when the deadline elapsed.
        pending: usize,
    },
}

impl SchedulerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use guildvisor::SchedulerError;
    ///
    /// assert_eq!(SchedulerError::Closed.as_label(), "scheduler_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SchedulerError::Closed => "scheduler_closed",
            SchedulerError::JoinTimeout { .. } => "scheduler_join_timeout",
        }
    }
}

/// # Errors produced by command execution.
///
/// A failing command never stops its guild worker; the error is reported
/// and the worker moves on to the next queued command.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// Command failed (business logic error).
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// An interceptor refused to let the command run.
    #[error("rejected by {interceptor}: {reason}")]
    Rejected {
        /// Name of the rejecting interceptor.
        interceptor: &'static str,
        /// Why the command was rejected.
        reason: String,
    },

    /// Command panicked; the panic was caught at the task boundary.
    #[error("panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use guildvisor::TaskError;
    ///
    /// let err = TaskError::Fail { error: "boom".into() };
    /// assert_eq!(err.as_label(), "task_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Rejected { .. } => "task_rejected",
            TaskError::Panicked { .. } => "task_panicked",
        }
    }

    /// Wraps any displayable error as [`TaskError::Fail`].
    pub fn fail(error: impl std::fmt::Display) -> Self {
        TaskError::Fail {
            error: error.to_string(),
        }
    }
}

impl From<anyhow::Error> for TaskError {
    fn from(err: anyhow::Error) -> Self {
        TaskError::Fail {
            error: format!("{err:#}"),
        }
    }
}

/// A member lacks a permission.
///
/// This is ordinary control flow (a user-visible rejection), not a fault.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{member} lacks permission '{permission}'")]
pub struct PermissionDenied {
    /// The required permission.
    pub permission: String,
    /// The acting member.
    pub member: MemberId,
}

/// # Errors produced by widget action dispatch.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WidgetError {
    /// The acting member lacks the permission the action requires.
    #[error(transparent)]
    PermissionDenied(#[from] PermissionDenied),

    /// No action of the widget is bound to the reacted emoji.
    #[error("no action bound to '{emoji}'")]
    UnknownAction {
        /// The emoji that was reacted with.
        emoji: String,
    },

    /// The action handler returned an error.
    #[error("widget action failed: {0:#}")]
    Handler(#[source] anyhow::Error),
}

impl WidgetError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WidgetError::PermissionDenied(_) => "widget_permission_denied",
            WidgetError::UnknownAction { .. } => "widget_unknown_action",
            WidgetError::Handler(_) => "widget_handler_failed",
        }
    }
}

/// # Errors produced by bulk loaders.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BulkLoadError {
    /// The key was already registered; each key carries exactly one callback.
    ///
    /// Programmer error, not expected at runtime.
    #[error("key registered twice")]
    DuplicateKey,
}

impl BulkLoadError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BulkLoadError::DuplicateKey => "bulk_duplicate_key",
        }
    }
}

/// # Errors produced by the shutdown sequence.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Guild queues did not drain within the deadline.
    ///
    /// The forced-exit timer stays armed and terminates the process.
    #[error("shutdown deadline {deadline:?} exceeded; {pending} commands pending; forcing termination")]
    DrainTimeout {
        /// The deadline passed to shutdown.
        deadline: Duration,
        /// Commands queued or in flight at the deadline.
        pending: usize,
    },

    /// The drain was aborted by the caller; the forced-exit timer was cancelled.
    #[error("shutdown abandoned while draining")]
    ShutdownAbandoned,
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use guildvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::DrainTimeout { deadline: Duration::from_secs(5), pending: 2 };
    /// assert_eq!(err.as_label(), "runtime_drain_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::DrainTimeout { .. } => "runtime_drain_timeout",
            RuntimeError::ShutdownAbandoned => "runtime_shutdown_abandoned",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_error_labels_cover_every_outcome() {
        let outcomes = [
            TaskError::fail("boom"),
            TaskError::Rejected {
                interceptor: "maintenance",
                reason: "guild locked".into(),
            },
            TaskError::Panicked {
                info: "index out of bounds".into(),
            },
        ];
        let labels: Vec<_> = outcomes
            .iter()
            .map(|err| match err {
                TaskError::Fail { .. } | TaskError::Rejected { .. } | TaskError::Panicked { .. } => {
                    err.as_label()
                }
            })
            .collect();
        assert_eq!(labels, vec!["task_failed", "task_rejected", "task_panicked"]);
    }

    #[test]
    fn test_anyhow_errors_become_failures() {
        let err: TaskError = anyhow::anyhow!("queue full").context("enqueue").into();
        assert_eq!(err.as_label(), "task_failed");
        assert_eq!(err.to_string(), "execution failed: enqueue: queue full");
    }
}
