//! # guildvisor
//!
//! **Guildvisor** is the concurrency and lifecycle layer of a multi-tenant chat
//! bot: every guild gets its own serial command queue, guilds run concurrently,
//! and the process shuts down in a fixed order within a bounded deadline.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   gateway events                reactions                 voice join/leave
//!        │                            │                            │
//!        ▼                            ▼                            ▼
//! ┌──────────────────┐   ┌──────────────────────────┐   ┌──────────────────────┐
//! │ CommandScheduler │   │  WidgetActionDispatcher  │   │ VoicePresenceTracker │
//! │ one worker/guild │   │ permission ─► handler    │   │ pause / alone marker │
//! └───────┬──────────┘   └────────────┬─────────────┘   └──────────┬───────────┘
//!         │ publish                   │ publish                    │ publish
//!         ▼                           ▼                            ▼
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                         Bus (broadcast channel)                          │
//! │                     (capacity: Config::bus_capacity)                     │
//! └───────────────────────────────────┬──────────────────────────────────────┘
//!                                     ▼
//!                          ┌─────────────────────┐
//!                          │ subscriber_listener │
//!                          │   (in BotContext)   │
//!                          └──────────┬──────────┘
//!                                     ▼
//!                               SubscriberSet
//!                              (per-sub queues)
//!                          ┌──────────┼──────────┐
//!                          ▼          ▼          ▼
//!                      LogWriter    sub2       subN
//! ```
//!
//! ### Shutdown
//! ```text
//! ShutdownOrchestrator::shutdown(deadline)
//!   ├─► arm ForcedExitTimer(deadline)
//!   ├─► listeners removed, status idle, scheduler.close_all()
//!   ├─► scheduler.join_all(deadline)         ── timeout ─► DrainTimeout, timer fires, process exits
//!   ├─► ShutdownRegistry::shutdown_all(remaining)
//!   ├─► event source disconnected, persistence closed
//!   └─► timer cancelled
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                                   |
//! |-------------------|---------------------------------------------------------------|------------------------------------------------------|
//! | **Scheduling**    | Ordered per-guild command execution with interceptors.        | [`CommandScheduler`], [`Command`], [`CommandFn`]     |
//! | **Shutdown**      | Ordered shutdown with a forced-exit safety net.               | [`ShutdownOrchestrator`], [`ShutdownRegistry`]       |
//! | **Presence**      | Auto pause when the bot is left alone in voice.               | [`VoicePresenceTracker`], [`Playback`]               |
//! | **Widgets**       | Permission-gated reaction actions.                            | [`WidgetActionDispatcher`], [`Widget`]               |
//! | **Bulk loading**  | Bounded-size batched key fetches.                             | [`BulkLoader`]                                       |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, custom).        | [`Subscribe`]                                        |
//! | **Errors**        | Typed errors with stable labels.                              | [`SchedulerError`], [`TaskError`], [`RuntimeError`]  |
//! | **Configuration** | Centralize runtime settings.                                  | [`Config`]                                           |
//!
//! ## Optional features
//! - `logging` (default): built-in [`LogWriter`] subscriber forwarding events to `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use guildvisor::{CommandContext, CommandFn, CommandScheduler, Bus, TaskError, TenantId};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scheduler = CommandScheduler::new(Bus::default());
//!
//!     for n in 0..3 {
//!         scheduler.submit(
//!             TenantId(1),
//!             CommandFn::arc(format!("queue-{n}"), |ctx: CommandContext| async move {
//!                 println!("running for {}", ctx.tenant);
//!                 Ok::<_, TaskError>(())
//!             }),
//!         )?;
//!     }
//!
//!     scheduler.close_all();
//!     scheduler.join_all(Duration::from_secs(5)).await?;
//!     Ok(())
//! }
//! ```
mod bulk;
mod config;
mod context;
mod error;
mod events;
mod model;
mod panic;
mod presence;
mod scheduler;
mod shutdown;
mod subscribers;
mod tasks;
mod widgets;

pub mod telemetry;

// ---- Public re-exports ----

pub use bulk::BulkLoader;
pub use config::Config;
pub use context::{BotContext, ContextBuilder};
pub use error::{BulkLoadError, PermissionDenied, RuntimeError, SchedulerError, TaskError, WidgetError};
pub use events::{Bus, Event, EventKind};
pub use model::{ChannelId, Member, MemberId, TenantId};
pub use presence::{
    AudioManager, Playback, PlaybackState, Player, TenantConfig, VoiceEvent, VoicePresenceTracker,
};
pub use scheduler::{CommandInterceptor, CommandScheduler};
pub use shutdown::{
    EventSource, ExitHook, ForcedExitTimer, Listener, OnlineStatus, Persistence,
    ShutdownOrchestrator, ShutdownRegistry, ShutdownState, Shutdownable, process_exit,
    wait_for_shutdown_signal,
};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{BoxCommandFuture, Command, CommandContext, CommandFn, CommandRef, CommandTask};
pub use widgets::{
    DispatchOutcome, ReactionEvent, SecurityManager, Widget, WidgetAction,
    WidgetActionDispatcher, WidgetHandler, WidgetHandlerFn,
};

// Optional: built-in logger subscriber.
// Enable with: `--features logging` (on by default)
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
