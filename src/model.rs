//! # Identifiers shared across the runtime.
//!
//! Guilds, members and voice channels are created and owned by the external
//! event source; the runtime only ever sees their ids.

use std::fmt;

/// Identifies one tenant (a guild).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TenantId(pub u64);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "guild:{}", self.0)
    }
}

/// Identifies a voice channel inside a guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel:{}", self.0)
    }
}

/// Identifies a member (user) of a guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberId(pub u64);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "member:{}", self.0)
    }
}

/// A guild member as seen in an incoming event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: MemberId,
    pub bot: bool,
}

impl Member {
    pub fn user(id: u64) -> Self {
        Self {
            id: MemberId(id),
            bot: false,
        }
    }

    pub fn bot(id: u64) -> Self {
        Self {
            id: MemberId(id),
            bot: true,
        }
    }
}
