//! # Voice presence.
//!
//! - [`Playback`] per-guild voice-session state, owned by an [`AudioManager`]
//! - [`VoicePresenceTracker`] pauses or marks playback when the bot is left alone
//!
//! The tracker is both a [`Listener`](crate::shutdown::Listener) attached to the
//! event source and a [`Shutdownable`](crate::shutdown::Shutdownable) that waits
//! for its running handlers at shutdown.

mod playback;
mod tracker;

pub use playback::{AudioManager, Playback, PlaybackState, Player, TenantConfig};
pub use tracker::{VoiceEvent, VoicePresenceTracker};
