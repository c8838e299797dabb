//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the scheduler workers,
//! the shutdown orchestrator, the presence tracker and widget dispatch.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `CommandScheduler` workers, `ShutdownOrchestrator`,
//!   `ForcedExitTimer`, `VoicePresenceTracker`, `WidgetActionDispatcher`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the listener spawned by `ContextBuilder::build` that fans
//!   events out to the `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
