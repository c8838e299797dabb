//! # Subscribe: hooking into guild lifecycle events.
//!
//! Everything the bot does (a command queued for a guild, a widget denied, a
//! shutdownable overrunning its deadline) ends up as an [`Event`] on the bus.
//! A [`Subscribe`] implementation receives those events off the hot path: the
//! [`SubscriberSet`](crate::SubscriberSet) gives it a private queue and a
//! worker task of its own.
//!
//! ## Example
//! ```no_run
//! use std::collections::HashMap;
//! use std::sync::Mutex;
//!
//! use async_trait::async_trait;
//! use guildvisor::{Event, EventKind, Subscribe, TenantId};
//!
//! /// Counts rejected submissions per guild.
//! #[derive(Default)]
//! struct RejectedPerGuild(Mutex<HashMap<TenantId, u64>>);
//!
//! #[async_trait]
//! impl Subscribe for RejectedPerGuild {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind != EventKind::SubmissionRejected {
//!             return;
//!         }
//!         if let Some(guild) = event.tenant {
//!             *self.0.lock().unwrap().entry(guild).or_default() += 1;
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "rejected-per-guild"
//!     }
//!
//!     fn queue_capacity(&self) -> usize {
//!         64
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Receiver of lifecycle events.
///
/// `on_event` runs on the subscriber's own worker, one event at a time and in
/// publish order. A panic is caught and published as
/// `EventKind::SubscriberPanicked`; the worker keeps going with the next event.
/// When the queue is full the event is dropped for this subscriber alone and
/// `EventKind::SubscriberOverflow` is published.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event. Blocking here stalls only this subscriber's queue.
    async fn on_event(&self, event: &Event);

    /// Name carried by overflow and panic events. Defaults to the type name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Capacity of the private queue; values below 1 are raised to 1.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
