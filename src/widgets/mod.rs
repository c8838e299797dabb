//! # Reaction widgets.
//!
//! - [`Widget`] interactive message with a fixed list of [`WidgetAction`]s
//! - [`WidgetAction`] emoji trigger, optional permission, reset flag and handler
//! - [`WidgetActionDispatcher`] permission check and fault-isolated dispatch
//!
//! ## Flow
//! ```text
//! ReactionEvent ──► dispatch(widget, ev) ──► widget.action(emoji) ──► run(action, ev)
//!                                                                        │
//!                                              SecurityManager::ensure_permission
//!                                                                        │
//!                                                             WidgetHandler::handle
//! ```

mod action;
mod dispatcher;

pub use action::{ReactionEvent, Widget, WidgetAction, WidgetHandler, WidgetHandlerFn};
pub use dispatcher::{DispatchOutcome, SecurityManager, WidgetActionDispatcher};
