//! # Per-guild playback state and the collaborators that own it.
//!
//! [`Playback`] is owned by the audio layer ([`AudioManager`]); the presence
//! tracker and guild commands both mutate it, always through [`Playback::lock`].

use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};

use crate::model::{ChannelId, TenantId};

/// Audio player operations used by the presence tracker.
#[async_trait]
pub trait Player: Send + Sync + 'static {
    /// Pauses the current track.
    async fn pause(&self);

    /// Releases the voice connection.
    async fn leave_channel(&self);
}

/// Mutable voice-session fields of one guild.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PlaybackState {
    /// Voice channel the bot is connected to.
    pub channel: Option<ChannelId>,
    /// Set when the last human left the bot's channel.
    pub alone_since: Option<SystemTime>,
}

/// Voice-session state of one guild, guarded by a per-guild mutex.
pub struct Playback {
    state: Mutex<PlaybackState>,
    player: Arc<dyn Player>,
}

impl Playback {
    pub fn new(player: Arc<dyn Player>) -> Self {
        Self {
            state: Mutex::new(PlaybackState::default()),
            player,
        }
    }

    /// Creates a playback already connected to `channel`.
    pub fn connected(player: Arc<dyn Player>, channel: ChannelId) -> Self {
        Self {
            state: Mutex::new(PlaybackState {
                channel: Some(channel),
                alone_since: None,
            }),
            player,
        }
    }

    /// Locks the state for an atomic read-modify-write.
    pub async fn lock(&self) -> MutexGuard<'_, PlaybackState> {
        self.state.lock().await
    }

    /// Voice channel the bot is connected to.
    pub async fn voice_channel(&self) -> Option<ChannelId> {
        self.state.lock().await.channel
    }

    pub async fn alone_since(&self) -> Option<SystemTime> {
        self.state.lock().await.alone_since
    }

    pub async fn set_alone_since(&self, at: Option<SystemTime>) {
        self.state.lock().await.alone_since = at;
    }

    /// Pauses the player.
    pub async fn pause(&self) {
        self.player.pause().await;
    }

    /// Leaves the voice channel and forgets it.
    ///
    /// Takes the caller's guard so the player call and the state change are
    /// one critical section.
    pub async fn leave_channel(&self, state: &mut PlaybackState) {
        self.player.leave_channel().await;
        state.channel = None;
        state.alone_since = None;
    }
}

/// Owner of every guild's [`Playback`].
pub trait AudioManager: Send + Sync + 'static {
    /// Playback of `tenant`, if the guild has one.
    fn playback(&self, tenant: TenantId) -> Option<Arc<Playback>>;
}

/// Per-guild configuration lookup.
pub trait TenantConfig: Send + Sync + 'static {
    /// Returns the boolean property `name` of `tenant`, or `default` when unset.
    fn boolean_property(&self, tenant: TenantId, name: &str, default: bool) -> bool;
}
