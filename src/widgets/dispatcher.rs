//! # WidgetActionDispatcher: permission check, then handler.
//!
//! - [`run`](WidgetActionDispatcher::run) checks the required permission and
//!   invokes the handler; every failure goes back to the caller
//! - [`dispatch`](WidgetActionDispatcher::dispatch) is the reaction pipeline
//!   entry point: finds the action, runs it, and turns every failure
//!   (including a panic) into a [`DispatchOutcome`] so one broken action
//!   never takes the pipeline down

use std::sync::Arc;

use futures::FutureExt;

use crate::error::{PermissionDenied, WidgetError};
use crate::events::{Bus, Event, EventKind};
use crate::model::Member;
use crate::panic::panic_message;
use crate::widgets::action::{ReactionEvent, Widget, WidgetAction};

/// Permission lookup.
pub trait SecurityManager: Send + Sync + 'static {
    /// Fails if `member` does not hold `permission`.
    fn ensure_permission(&self, permission: &str, member: &Member) -> Result<(), PermissionDenied>;
}

/// Result of dispatching one reaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler ran; re-render the widget if `reset_required`.
    Completed { reset_required: bool },
    /// The member lacks the action's permission.
    Denied(PermissionDenied),
    /// The handler returned an error or panicked.
    Failed { reason: String },
    /// No action is bound to the emoji.
    Ignored,
}

/// Runs widget actions on behalf of reacting members.
pub struct WidgetActionDispatcher {
    security: Arc<dyn SecurityManager>,
    bus: Bus,
}

impl WidgetActionDispatcher {
    pub fn new(security: Arc<dyn SecurityManager>, bus: Bus) -> Self {
        Self { security, bus }
    }

    /// Runs `action` for `event`.
    ///
    /// The handler is never invoked when the permission check fails. Handler
    /// errors are returned as [`WidgetError::Handler`]; panics are not caught.
    pub async fn run(&self, action: &WidgetAction, event: &ReactionEvent) -> Result<(), WidgetError> {
        if let Some(permission) = action.required_permission() {
            self.security.ensure_permission(permission, &event.member)?;
        }
        action
            .handler()
            .handle(event)
            .await
            .map_err(WidgetError::Handler)
    }

    /// Finds and runs the action of `widget` bound to the reacted emoji.
    pub async fn dispatch(&self, widget: &Widget, event: &ReactionEvent) -> DispatchOutcome {
        let action = match widget.action(&event.emoji) {
            Ok(action) => action,
            Err(error) => {
                tracing::trace!(widget = widget.name(), %error, "reaction ignored");
                return DispatchOutcome::Ignored;
            }
        };

        let res = match std::panic::AssertUnwindSafe(self.run(action, event))
            .catch_unwind()
            .await
        {
            Ok(res) => res,
            Err(payload) => Err(WidgetError::Handler(anyhow::anyhow!(
                "panicked: {}",
                panic_message(&*payload)
            ))),
        };

        match res {
            Ok(()) => DispatchOutcome::Completed {
                reset_required: action.is_reset_required(),
            },
            Err(WidgetError::PermissionDenied(denied)) => {
                self.bus.publish(
                    Event::new(EventKind::WidgetDenied)
                        .with_tenant(event.tenant)
                        .with_task(action.emoji())
                        .with_reason(denied.permission.as_str()),
                );
                DispatchOutcome::Denied(denied)
            }
            Err(error) => {
                let reason = error.to_string();
                self.bus.publish(
                    Event::new(EventKind::WidgetFailed)
                        .with_tenant(event.tenant)
                        .with_task(action.emoji())
                        .with_reason(reason.as_str()),
                );
                DispatchOutcome::Failed { reason }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MemberId, TenantId};
    use crate::widgets::WidgetHandlerFn;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Roles {
        djs: HashSet<MemberId>,
    }

    impl SecurityManager for Roles {
        fn ensure_permission(&self, permission: &str, member: &Member) -> Result<(), PermissionDenied> {
            if permission == "dj" && self.djs.contains(&member.id) {
                Ok(())
            } else {
                Err(PermissionDenied {
                    permission: permission.to_string(),
                    member: member.id,
                })
            }
        }
    }

    fn dispatcher() -> WidgetActionDispatcher {
        let roles = Roles {
            djs: HashSet::from([MemberId(1)]),
        };
        WidgetActionDispatcher::new(Arc::new(roles), Bus::new(16))
    }

    fn counting(calls: &Arc<AtomicUsize>, emoji: &str) -> WidgetAction {
        let calls = calls.clone();
        WidgetAction::new(
            emoji,
            WidgetHandlerFn::arc(move |_ev: ReactionEvent| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        )
    }

    fn reaction(member: u64, emoji: &str) -> ReactionEvent {
        ReactionEvent {
            tenant: TenantId(1),
            member: Member::user(member),
            emoji: emoji.to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_permission_never_runs_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let action = counting(&calls, "⏭").require_permission("dj");

        let err = dispatcher().run(&action, &reaction(2, "⏭")).await.unwrap_err();
        assert!(matches!(err, WidgetError::PermissionDenied(ref d) if d.permission == "dj"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        dispatcher().run(&action, &reaction(1, "⏭")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unrestricted_action_always_runs() {
        let calls = Arc::new(AtomicUsize::new(0));
        let action = counting(&calls, "⏯");
        dispatcher().run(&action, &reaction(2, "⏯")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handler_error_propagates_from_run() {
        let action = WidgetAction::new(
            "⏹",
            WidgetHandlerFn::arc(|_ev: ReactionEvent| async { Err(anyhow::anyhow!("nothing playing")) }),
        );
        let err = dispatcher().run(&action, &reaction(1, "⏹")).await.unwrap_err();
        assert_eq!(err.as_label(), "widget_handler_failed");
    }

    #[tokio::test]
    async fn test_dispatch_isolates_faults() {
        let calls = Arc::new(AtomicUsize::new(0));
        let widget = Widget::new(
            "queue",
            vec![
                counting(&calls, "🔀").reset_required(),
                counting(&calls, "⏭").require_permission("dj"),
                WidgetAction::new(
                    "💥",
                    WidgetHandlerFn::arc(|_ev: ReactionEvent| async {
                        if true {
                            panic!("broken action");
                        }
                        Ok(())
                    }),
                ),
            ],
        );
        let d = dispatcher();

        assert_eq!(
            d.dispatch(&widget, &reaction(2, "🔀")).await,
            DispatchOutcome::Completed { reset_required: true }
        );
        assert!(matches!(
            d.dispatch(&widget, &reaction(2, "⏭")).await,
            DispatchOutcome::Denied(_)
        ));
        assert!(matches!(
            d.dispatch(&widget, &reaction(2, "💥")).await,
            DispatchOutcome::Failed { ref reason } if reason.contains("broken action")
        ));
        assert_eq!(d.dispatch(&widget, &reaction(2, "❓")).await, DispatchOutcome::Ignored);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
