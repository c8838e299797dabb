//! # VoicePresenceTracker: pauses playback when the bot is left alone.
//!
//! ## Rules
//! - Events caused by bot accounts are ignored
//! - Leave: if the bot's channel now holds no humans, either pause + leave
//!   (auto pause enabled, the default) or mark the playback as alone
//! - Join into the bot's channel clears the alone marker
//! - Handlers are not serialized per guild; each one holds the guild's
//!   playback lock for its whole read-modify-write
//!
//! ## Dispatch
//! ```text
//! on_left(ev) / on_joined(ev) ──► TaskTracker::spawn_on ──► [permit] ──► handle_left / handle_joined
//!                                                                           │
//!                                                                           └─► Playback::lock()
//! ```

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;

use crate::config::Config;
use crate::events::{Bus, Event, EventKind};
use crate::model::{ChannelId, Member, TenantId};
use crate::presence::playback::{AudioManager, TenantConfig};
use crate::shutdown::{Listener, Shutdownable};

/// A member joined or left a voice channel.
#[derive(Debug, Clone)]
pub struct VoiceEvent {
    pub tenant: TenantId,
    /// Channel joined or left.
    pub channel: ChannelId,
    /// Member who moved.
    pub member: Member,
    /// Members present in `channel` after the move.
    pub channel_members: Vec<Member>,
}

struct Inner {
    audio: Arc<dyn AudioManager>,
    config: Arc<dyn TenantConfig>,
    auto_pause_property: String,
    bus: Bus,
}

/// Reacts to voice join/leave events on behalf of every guild.
pub struct VoicePresenceTracker {
    inner: Arc<Inner>,
    tracker: TaskTracker,
    limit: Option<Arc<Semaphore>>,
    runtime: Handle,
}

impl VoicePresenceTracker {
    /// Must be called from within a tokio runtime; background handlers run on it.
    pub fn new(
        audio: Arc<dyn AudioManager>,
        tenant_config: Arc<dyn TenantConfig>,
        cfg: &Config,
        bus: Bus,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                audio,
                config: tenant_config,
                auto_pause_property: cfg.auto_pause_property.clone(),
                bus,
            }),
            tracker: TaskTracker::new(),
            limit: cfg.presence_limit().map(|n| Arc::new(Semaphore::new(n))),
            runtime: Handle::current(),
        }
    }

    /// Handles a leave event in the background.
    ///
    /// Returns false if the tracker was shut down and the event was dropped.
    pub fn on_left(&self, event: VoiceEvent) -> bool {
        let inner = Arc::clone(&self.inner);
        self.spawn(async move { inner.handle_left(&event).await })
    }

    /// Handles a join event in the background.
    ///
    /// Returns false if the tracker was shut down and the event was dropped.
    pub fn on_joined(&self, event: VoiceEvent) -> bool {
        let inner = Arc::clone(&self.inner);
        self.spawn(async move { inner.handle_joined(&event).await })
    }

    /// Handles a leave event on the caller's task.
    pub async fn handle_left(&self, event: &VoiceEvent) {
        self.inner.handle_left(event).await;
    }

    /// Handles a join event on the caller's task.
    pub async fn handle_joined(&self, event: &VoiceEvent) {
        self.inner.handle_joined(event).await;
    }

    /// Number of handlers spawned and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    fn spawn<F>(&self, handler: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.tracker.is_closed() {
            return false;
        }
        let limit = self.limit.clone();
        let task = async move {
            let _permit = match limit {
                Some(sem) => match sem.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => return,
                },
                None => None,
            };
            handler.await;
        };
        self.tracker.spawn_on(task, &self.runtime);
        true
    }
}

impl Inner {
    async fn handle_left(&self, event: &VoiceEvent) {
        if event.member.bot {
            return;
        }
        let Some(playback) = self.audio.playback(event.tenant) else {
            return;
        };

        let mut state = playback.lock().await;
        if state.channel != Some(event.channel) {
            return;
        }
        if event.channel_members.iter().any(|m| !m.bot) {
            return;
        }

        let auto_pause = self
            .config
            .boolean_property(event.tenant, &self.auto_pause_property, true);
        if auto_pause {
            playback.pause().await;
            playback.leave_channel(&mut state).await;
            self.bus
                .publish(Event::new(EventKind::PlaybackPaused).with_tenant(event.tenant));
        } else {
            state.alone_since = Some(SystemTime::now());
            self.bus
                .publish(Event::new(EventKind::AloneMarked).with_tenant(event.tenant));
        }
    }

    async fn handle_joined(&self, event: &VoiceEvent) {
        if event.member.bot {
            return;
        }
        let Some(playback) = self.audio.playback(event.tenant) else {
            return;
        };

        let mut state = playback.lock().await;
        if state.channel == Some(event.channel) && state.alone_since.take().is_some() {
            self.bus
                .publish(Event::new(EventKind::AloneCleared).with_tenant(event.tenant));
        }
    }
}

impl Listener for VoicePresenceTracker {
    fn name(&self) -> &str {
        "voice-presence"
    }
}

#[async_trait]
impl Shutdownable for VoicePresenceTracker {
    fn name(&self) -> &str {
        "voice-presence"
    }

    /// Stops accepting events and waits up to `remaining` for running handlers.
    async fn shutdown(&self, remaining: Duration) {
        self.tracker.close();
        if tokio::time::timeout(remaining, self.tracker.wait()).await.is_err() {
            tracing::warn!(
                in_flight = self.tracker.len(),
                ?remaining,
                "presence handlers still running at shutdown"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::{Playback, Player};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingPlayer {
        paused: AtomicUsize,
        left: AtomicUsize,
    }

    #[async_trait]
    impl Player for RecordingPlayer {
        async fn pause(&self) {
            self.paused.fetch_add(1, Ordering::SeqCst);
        }

        async fn leave_channel(&self) {
            self.left.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct Audio {
        playbacks: Mutex<HashMap<TenantId, Arc<Playback>>>,
    }

    impl AudioManager for Audio {
        fn playback(&self, tenant: TenantId) -> Option<Arc<Playback>> {
            self.playbacks.lock().unwrap().get(&tenant).cloned()
        }
    }

    struct Properties {
        auto_pause: Option<bool>,
    }

    impl TenantConfig for Properties {
        fn boolean_property(&self, _tenant: TenantId, name: &str, default: bool) -> bool {
            assert_eq!(name, "enableAutoPause");
            self.auto_pause.unwrap_or(default)
        }
    }

    const GUILD: TenantId = TenantId(10);
    const MUSIC: ChannelId = ChannelId(100);

    fn setup(auto_pause: Option<bool>) -> (VoicePresenceTracker, Arc<Playback>, Arc<RecordingPlayer>) {
        let player = Arc::new(RecordingPlayer::default());
        let playback = Arc::new(Playback::connected(player.clone(), MUSIC));
        let audio = Audio::default();
        audio.playbacks.lock().unwrap().insert(GUILD, playback.clone());
        let tracker = VoicePresenceTracker::new(
            Arc::new(audio),
            Arc::new(Properties { auto_pause }),
            &Config::default(),
            Bus::new(64),
        );
        (tracker, playback, player)
    }

    fn left(channel: ChannelId, remaining: Vec<Member>) -> VoiceEvent {
        VoiceEvent {
            tenant: GUILD,
            channel,
            member: Member::user(1),
            channel_members: remaining,
        }
    }

    #[tokio::test]
    async fn test_auto_pause_when_left_alone() {
        let (tracker, playback, player) = setup(Some(true));
        tracker.handle_left(&left(MUSIC, vec![Member::bot(99)])).await;

        assert_eq!(player.paused.load(Ordering::SeqCst), 1);
        assert_eq!(player.left.load(Ordering::SeqCst), 1);
        assert_eq!(playback.alone_since().await, None);
        assert_eq!(playback.voice_channel().await, None);
    }

    #[tokio::test]
    async fn test_auto_pause_defaults_to_enabled() {
        let (tracker, _playback, player) = setup(None);
        tracker.handle_left(&left(MUSIC, Vec::new())).await;
        assert_eq!(player.paused.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_alone_marker_set_then_cleared() {
        let (tracker, playback, player) = setup(Some(false));
        tracker.handle_left(&left(MUSIC, vec![Member::bot(99)])).await;

        assert_eq!(player.paused.load(Ordering::SeqCst), 0);
        assert!(playback.alone_since().await.is_some());
        assert_eq!(playback.voice_channel().await, Some(MUSIC));

        tracker
            .handle_joined(&VoiceEvent {
                tenant: GUILD,
                channel: MUSIC,
                member: Member::user(2),
                channel_members: vec![Member::bot(99), Member::user(2)],
            })
            .await;
        assert_eq!(playback.alone_since().await, None);
    }

    #[tokio::test]
    async fn test_ignores_bots_other_channels_and_remaining_humans() {
        let (tracker, playback, player) = setup(Some(false));

        let mut by_bot = left(MUSIC, Vec::new());
        by_bot.member = Member::bot(7);
        tracker.handle_left(&by_bot).await;
        tracker.handle_left(&left(ChannelId(5), Vec::new())).await;
        tracker.handle_left(&left(MUSIC, vec![Member::user(3)])).await;

        assert_eq!(player.paused.load(Ordering::SeqCst), 0);
        assert_eq!(playback.alone_since().await, None);
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_spawned_handlers_then_rejects() {
        let (tracker, playback, _player) = setup(Some(false));
        assert!(tracker.on_left(left(MUSIC, Vec::new())));

        tracker.shutdown(Duration::from_secs(1)).await;
        assert_eq!(tracker.in_flight(), 0);
        assert!(playback.alone_since().await.is_some());

        assert!(!tracker.on_joined(left(MUSIC, Vec::new())));
        assert!(playback.alone_since().await.is_some());
    }

    #[tokio::test]
    async fn test_events_from_gateway_thread_are_handled() {
        let (tracker, playback, _player) = setup(Some(false));
        let tracker = Arc::new(tracker);

        let from_thread = Arc::clone(&tracker);
        let accepted = std::thread::spawn(move || from_thread.on_left(left(MUSIC, Vec::new())))
            .join()
            .unwrap();
        assert!(accepted);

        tracker.shutdown(Duration::from_secs(1)).await;
        assert!(playback.alone_since().await.is_some());
    }
}
