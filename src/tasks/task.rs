//! # Command abstraction.
//!
//! This module defines the [`Command`] trait: the opaque executable action a
//! [`CommandScheduler`](crate::CommandScheduler) runs on a guild's worker.
//! The common handle type is [`CommandRef`], an `Arc<dyn Command>`.
//!
//! What a command *does* is business logic and lives outside this crate; the
//! runtime only guarantees *when* and *where* it runs.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use crate::error::TaskError;
use crate::model::TenantId;

/// Boxed future returned by [`Command::run`].
pub type BoxCommandFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send + 'static>>;

/// Shared handle to a command.
pub type CommandRef = Arc<dyn Command>;

/// Execution context handed to a command by its guild worker.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext {
    /// Guild the command was submitted for.
    pub tenant: TenantId,
    /// When the command was submitted.
    pub submitted_at: Instant,
}

/// # Asynchronous guild command.
///
/// # Example
/// ```
/// use guildvisor::{BoxCommandFuture, Command, CommandContext};
///
/// struct Skip;
///
/// impl Command for Skip {
///     fn name(&self) -> &str { "skip" }
///
///     fn run(&self, ctx: CommandContext) -> BoxCommandFuture {
///         Box::pin(async move {
///             let _guild = ctx.tenant;
///             // advance the queue...
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Command: Send + Sync + 'static {
    /// Returns a stable, human-readable command name.
    fn name(&self) -> &str;

    /// Creates the future executing the command once.
    ///
    /// The future runs on the guild's worker; no other command of the same
    /// guild runs until it completes.
    fn run(&self, ctx: CommandContext) -> BoxCommandFuture;
}
