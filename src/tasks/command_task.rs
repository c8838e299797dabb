//! # Queued command.
//!
//! A [`CommandTask`] binds a [`CommandRef`] to exactly one guild together with
//! its submission time. It is owned by the guild queue it was submitted to
//! until it completes.

use std::time::{Duration, Instant};

use crate::model::TenantId;
use crate::tasks::task::{CommandContext, CommandRef};

/// A command bound to a guild.
#[derive(Clone)]
pub struct CommandTask {
    tenant: TenantId,
    command: CommandRef,
    submitted_at: Instant,
}

impl CommandTask {
    /// Binds `command` to `tenant`, stamped with the current time.
    pub fn new(tenant: TenantId, command: CommandRef) -> Self {
        Self {
            tenant,
            command,
            submitted_at: Instant::now(),
        }
    }

    /// Guild this command belongs to.
    pub fn tenant(&self) -> TenantId {
        self.tenant
    }

    /// The command itself.
    pub fn command(&self) -> &CommandRef {
        &self.command
    }

    /// Command name.
    pub fn name(&self) -> &str {
        self.command.name()
    }

    /// When the command was submitted.
    pub fn submitted_at(&self) -> Instant {
        self.submitted_at
    }

    /// Time elapsed since submission.
    pub fn waited(&self) -> Duration {
        self.submitted_at.elapsed()
    }

    pub(crate) fn context(&self) -> CommandContext {
        CommandContext {
            tenant: self.tenant,
            submitted_at: self.submitted_at,
        }
    }
}

impl std::fmt::Debug for CommandTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandTask")
            .field("tenant", &self.tenant)
            .field("command", &self.command.name())
            .finish()
    }
}
