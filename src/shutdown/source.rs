//! # Collaborators stopped by the shutdown sequence.
//!
//! The gateway connection and the persistence layer live outside this crate;
//! the orchestrator only needs the narrow surface below.

use std::sync::Arc;

use async_trait::async_trait;

/// Presence status shown by the bot account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnlineStatus {
    Online,
    Idle,
}

/// An event handler attached to the [`EventSource`].
pub trait Listener: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str;
}

/// Connection delivering guild events (gateway/shard manager).
#[async_trait]
pub trait EventSource: Send + Sync + 'static {
    fn add_listener(&self, listener: Arc<dyn Listener>);

    fn remove_listener(&self, listener: &Arc<dyn Listener>);

    fn set_status(&self, status: OnlineStatus);

    /// Closes the connection. Called once, near the end of shutdown.
    async fn disconnect(&self);
}

/// Persistence/session resource.
#[async_trait]
pub trait Persistence: Send + Sync + 'static {
    /// Releases the resource. Called exactly once, at the end of shutdown.
    async fn close(&self);
}
