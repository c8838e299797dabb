//! # Command interceptors.
//!
//! Interceptors run on the guild worker right before a command, in the order
//! they were registered. The first interceptor returning an error vetoes the
//! command; the veto is reported like any other command failure and the
//! worker continues with the next queued command.

use async_trait::async_trait;

use crate::error::TaskError;
use crate::tasks::CommandTask;

/// Hook invoked before every command execution.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use guildvisor::{CommandInterceptor, CommandTask, TaskError, TenantId};
///
/// struct Maintenance {
///     guild: TenantId,
/// }
///
/// #[async_trait]
/// impl CommandInterceptor for Maintenance {
///     fn name(&self) -> &'static str { "maintenance" }
///
///     async fn intercept(&self, task: &CommandTask) -> Result<(), TaskError> {
///         if task.tenant() == self.guild {
///             return Err(TaskError::Rejected {
///                 interceptor: self.name(),
///                 reason: "guild under maintenance".into(),
///             });
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait CommandInterceptor: Send + Sync + 'static {
    /// Name used in rejection reasons and logs.
    fn name(&self) -> &'static str;

    /// Inspects the command; an error prevents it from running.
    async fn intercept(&self, task: &CommandTask) -> Result<(), TaskError>;
}
