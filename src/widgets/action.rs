//! # Widget actions.
//!
//! A [`WidgetAction`] is a fixed descriptor (emoji, optional permission, reset
//! flag) holding a [`WidgetHandler`]. A [`Widget`] owns its actions for its
//! whole lifetime.
//!
//! ## Example
//! ```rust
//! use guildvisor::{ReactionEvent, Widget, WidgetAction, WidgetHandlerFn};
//!
//! let skip = WidgetAction::new(
//!     "⏭",
//!     WidgetHandlerFn::arc(|_ev: ReactionEvent| async { Ok(()) }),
//! )
//! .require_permission("dj")
//! .reset_required();
//!
//! let widget = Widget::new("now-playing", vec![skip]);
//! assert!(widget.action("⏭").is_ok());
//! assert!(widget.action("❌").is_err());
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::WidgetError;
use crate::model::{Member, TenantId};

/// A reaction added to a widget message.
#[derive(Debug, Clone)]
pub struct ReactionEvent {
    pub tenant: TenantId,
    /// Member who reacted.
    pub member: Member,
    /// Unicode emoji of the reaction.
    pub emoji: String,
}

/// Business logic behind a widget action.
#[async_trait]
pub trait WidgetHandler: Send + Sync + 'static {
    async fn handle(&self, event: &ReactionEvent) -> anyhow::Result<()>;
}

/// Closure-backed [`WidgetHandler`].
pub struct WidgetHandlerFn<F> {
    f: F,
}

impl<F, Fut> WidgetHandlerFn<F>
where
    F: Fn(ReactionEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }

    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> WidgetHandler for WidgetHandlerFn<F>
where
    F: Fn(ReactionEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, event: &ReactionEvent) -> anyhow::Result<()> {
        (self.f)(event.clone()).await
    }
}

/// One permission-gated action of a widget.
#[derive(Clone)]
pub struct WidgetAction {
    emoji: String,
    required_permission: Option<String>,
    reset_required: bool,
    handler: Arc<dyn WidgetHandler>,
}

impl WidgetAction {
    /// Creates an action bound to `emoji` with no permission requirement.
    pub fn new(emoji: impl Into<String>, handler: Arc<dyn WidgetHandler>) -> Self {
        Self {
            emoji: emoji.into(),
            required_permission: None,
            reset_required: false,
            handler,
        }
    }

    /// Requires the acting member to hold `permission`.
    pub fn require_permission(mut self, permission: impl Into<String>) -> Self {
        self.required_permission = Some(permission.into());
        self
    }

    /// Marks the widget for re-rendering after this action ran.
    pub fn reset_required(mut self) -> Self {
        self.reset_required = true;
        self
    }

    pub fn emoji(&self) -> &str {
        &self.emoji
    }

    pub fn required_permission(&self) -> Option<&str> {
        self.required_permission.as_deref()
    }

    pub fn is_reset_required(&self) -> bool {
        self.reset_required
    }

    pub(crate) fn handler(&self) -> &dyn WidgetHandler {
        self.handler.as_ref()
    }
}

impl std::fmt::Debug for WidgetAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetAction")
            .field("emoji", &self.emoji)
            .field("required_permission", &self.required_permission)
            .field("reset_required", &self.reset_required)
            .finish_non_exhaustive()
    }
}

/// Interactive message exposing a fixed set of actions.
#[derive(Debug, Clone)]
pub struct Widget {
    name: String,
    actions: Vec<WidgetAction>,
}

impl Widget {
    pub fn new(name: impl Into<String>, actions: Vec<WidgetAction>) -> Self {
        Self {
            name: name.into(),
            actions,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn actions(&self) -> &[WidgetAction] {
        &self.actions
    }

    /// Finds the action bound to `emoji`.
    pub fn action(&self, emoji: &str) -> Result<&WidgetAction, WidgetError> {
        self.actions
            .iter()
            .find(|a| a.emoji == emoji)
            .ok_or_else(|| WidgetError::UnknownAction {
                emoji: emoji.to_string(),
            })
    }
}
