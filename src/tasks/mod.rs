//! # Command abstractions.
//!
//! This module provides the command-related types:
//! - [`Command`] - trait for implementing async guild commands
//! - [`CommandFn`] - function-based command implementation
//! - [`CommandRef`] - shared reference to a command (`Arc<dyn Command>`)
//! - [`CommandTask`] - a command bound to a guild, as queued by the scheduler

mod command_task;
mod task;
mod task_fn;

pub use command_task::CommandTask;
pub use task::{BoxCommandFuture, Command, CommandContext, CommandRef};
pub use task_fn::CommandFn;
