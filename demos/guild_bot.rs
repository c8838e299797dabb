//! # Example: Guild Bot
//!
//! Wires a [`BotContext`] against in-memory collaborators, then:
//! - queues commands for two guilds (ordered per guild, concurrent across guilds)
//! - reacts to a widget with and without the required permission
//! - lets the last listener leave the voice channel (auto pause)
//! - shuts down within a 5s deadline
//!
//! Run with `RUST_LOG=debug cargo run --example guild_bot` to see every lifecycle event.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use guildvisor::{
    AudioManager, ChannelId, CommandContext, CommandFn, CommandRef, Config, ContextBuilder, EventSource,
    Listener, Member, MemberId, OnlineStatus, PermissionDenied, Persistence, Playback, Player,
    ReactionEvent, SecurityManager, TaskError, TenantConfig, TenantId, VoiceEvent, Widget,
    WidgetAction, WidgetHandlerFn,
};

struct Gateway;

#[async_trait]
impl EventSource for Gateway {
    fn add_listener(&self, listener: Arc<dyn Listener>) {
        println!("[gateway] listener added: {}", listener.name());
    }

    fn remove_listener(&self, listener: &Arc<dyn Listener>) {
        println!("[gateway] listener removed: {}", listener.name());
    }

    fn set_status(&self, status: OnlineStatus) {
        println!("[gateway] status {status:?}");
    }

    async fn disconnect(&self) {
        println!("[gateway] disconnected");
    }
}

struct Database;

#[async_trait]
impl Persistence for Database {
    async fn close(&self) {
        println!("[db] session factory closed");
    }
}

struct ConsolePlayer(TenantId);

#[async_trait]
impl Player for ConsolePlayer {
    async fn pause(&self) {
        println!("[{}] playback paused", self.0);
    }

    async fn leave_channel(&self) {
        println!("[{}] left voice channel", self.0);
    }
}

#[derive(Default)]
struct Audio {
    playbacks: Mutex<Vec<(TenantId, Arc<Playback>)>>,
}

impl AudioManager for Audio {
    fn playback(&self, tenant: TenantId) -> Option<Arc<Playback>> {
        let playbacks = self.playbacks.lock().unwrap_or_else(|p| p.into_inner());
        playbacks
            .iter()
            .find(|(t, _)| *t == tenant)
            .map(|(_, p)| Arc::clone(p))
    }
}

/// Every property falls back to its default.
struct Defaults;

impl TenantConfig for Defaults {
    fn boolean_property(&self, _tenant: TenantId, _name: &str, default: bool) -> bool {
        default
    }
}

struct Roles {
    djs: HashSet<MemberId>,
}

impl SecurityManager for Roles {
    fn ensure_permission(&self, permission: &str, member: &Member) -> Result<(), PermissionDenied> {
        if self.djs.contains(&member.id) {
            return Ok(());
        }
        Err(PermissionDenied {
            permission: permission.to_string(),
            member: member.id,
        })
    }
}

fn command(name: &'static str, work_ms: u64) -> CommandRef {
    CommandFn::arc(name, move |ctx: CommandContext| async move {
        println!("[{}] {name} start", ctx.tenant);
        tokio::time::sleep(Duration::from_millis(work_ms)).await;
        println!("[{}] {name} done", ctx.tenant);
        Ok::<(), TaskError>(())
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    guildvisor::telemetry::init();

    let music = ChannelId(100);
    let guild_a = TenantId(1);
    let guild_b = TenantId(2);

    let audio = Arc::new(Audio::default());
    let playback = Arc::new(Playback::connected(Arc::new(ConsolePlayer(guild_a)), music));
    audio
        .playbacks
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .push((guild_a, Arc::clone(&playback)));

    let roles = Roles {
        djs: HashSet::from([MemberId(7)]),
    };

    let ctx = ContextBuilder::new(Config::default(), Arc::new(Gateway), Arc::new(Database))
        .with_presence(audio, Arc::new(Defaults))
        .with_security(Arc::new(roles))
        .build();
    ctx.start();

    // Commands: guild A runs play → skip in order, guild B runs alongside.
    ctx.scheduler.submit(guild_a, command("play", 300))?;
    ctx.scheduler.submit(guild_a, command("skip", 100))?;
    ctx.scheduler.submit(guild_b, command("queue", 200))?;

    // Widget: only DJs may skip.
    let widget = Widget::new(
        "now-playing",
        vec![
            WidgetAction::new(
                "⏭",
                WidgetHandlerFn::arc(|ev: ReactionEvent| async move {
                    println!("[{}] widget skip by {}", ev.tenant, ev.member.id);
                    Ok(())
                }),
            )
            .require_permission("dj")
            .reset_required(),
        ],
    );
    if let Some(widgets) = &ctx.widgets {
        for member in [Member::user(7), Member::user(8)] {
            let outcome = widgets
                .dispatch(
                    &widget,
                    &ReactionEvent {
                        tenant: guild_a,
                        member,
                        emoji: "⏭".into(),
                    },
                )
                .await;
            println!("[widget] {outcome:?}");
        }
    }

    // Presence: the last human leaves the music channel.
    if let Some(presence) = &ctx.presence {
        presence.on_left(VoiceEvent {
            tenant: guild_a,
            channel: music,
            member: Member::user(7),
            channel_members: vec![Member::bot(1)],
        });
    }

    ctx.shutdown(Duration::from_secs(5)).await?;
    println!("[main] voice channel after shutdown: {:?}", playback.voice_channel().await);
    Ok(())
}
