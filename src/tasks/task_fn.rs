//! # Function-backed command (`CommandFn`)
//!
//! [`CommandFn`] wraps a closure `F: Fn(CommandContext) -> Fut`, producing a fresh
//! future per run. Shared state belongs in an explicit `Arc<...>` captured by the closure.
//!
//! ## Example
//! ```rust
//! use guildvisor::{CommandContext, CommandFn, CommandRef, TaskError};
//!
//! let c: CommandRef = CommandFn::arc("pause", |ctx: CommandContext| async move {
//!     let _guild = ctx.tenant;
//!     Ok::<_, TaskError>(())
//! });
//!
//! assert_eq!(c.name(), "pause");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use crate::error::TaskError;
use crate::tasks::task::{BoxCommandFuture, Command, CommandContext};

/// Function-backed command implementation.
#[derive(Debug)]
pub struct CommandFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F, Fut> CommandFn<F>
where
    F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    /// Creates a new function-backed command.
    ///
    /// Prefer [`CommandFn::arc`] when you immediately need a [`CommandRef`](crate::CommandRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { name: name.into(), f }
    }

    /// Creates the command and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, Fut> Command for CommandFn<F>
where
    F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: CommandContext) -> BoxCommandFuture {
        Box::pin((self.f)(ctx))
    }
}
