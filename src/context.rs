//! # Bot context: the dependency bundle assembled once at startup.
//!
//! [`ContextBuilder`] wires the event bus, subscribers, scheduler, shutdown
//! registry, orchestrator and the optional presence/widget components from a
//! [`Config`] and the external collaborators. The resulting [`BotContext`] is
//! passed down explicitly; there is no global accessor.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use guildvisor::{Config, ContextBuilder, EventSource, Listener, OnlineStatus, Persistence};
//!
//! struct Gateway;
//!
//! #[async_trait::async_trait]
//! impl EventSource for Gateway {
//!     fn add_listener(&self, _l: Arc<dyn Listener>) {}
//!     fn remove_listener(&self, _l: &Arc<dyn Listener>) {}
//!     fn set_status(&self, _s: OnlineStatus) {}
//!     async fn disconnect(&self) {}
//! }
//!
//! struct Db;
//!
//! #[async_trait::async_trait]
//! impl Persistence for Db {
//!     async fn close(&self) {}
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let ctx = ContextBuilder::new(Config::default(), Arc::new(Gateway), Arc::new(Db)).build();
//!     ctx.start();
//!     ctx.run_until_signal().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;

use crate::bulk::BulkLoader;
use crate::config::Config;
use crate::error::RuntimeError;
use crate::events::Bus;
use crate::presence::{AudioManager, TenantConfig, VoicePresenceTracker};
use crate::scheduler::{CommandInterceptor, CommandScheduler};
use crate::shutdown::{
    EventSource, ExitHook, Listener, Persistence, ShutdownOrchestrator, ShutdownRegistry,
    process_exit, wait_for_shutdown_signal,
};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::widgets::{SecurityManager, WidgetActionDispatcher};

/// Builder for [`BotContext`].
pub struct ContextBuilder {
    cfg: Config,
    event_source: Arc<dyn EventSource>,
    persistence: Arc<dyn Persistence>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    interceptors: Vec<Arc<dyn CommandInterceptor>>,
    listeners: Vec<Arc<dyn Listener>>,
    presence: Option<(Arc<dyn AudioManager>, Arc<dyn TenantConfig>)>,
    security: Option<Arc<dyn SecurityManager>>,
    exit_hook: ExitHook,
}

impl ContextBuilder {
    pub fn new(
        cfg: Config,
        event_source: Arc<dyn EventSource>,
        persistence: Arc<dyn Persistence>,
    ) -> Self {
        Self {
            cfg,
            event_source,
            persistence,
            subscribers: Vec::new(),
            interceptors: Vec::new(),
            listeners: Vec::new(),
            presence: None,
            security: None,
            exit_hook: process_exit(),
        }
    }

    /// Sets event subscribers.
    ///
    /// With the `logging` feature a [`LogWriter`](crate::LogWriter) is always added.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sets the interceptors run before every command, in order.
    pub fn with_interceptors(mut self, interceptors: Vec<Arc<dyn CommandInterceptor>>) -> Self {
        self.interceptors = interceptors;
        self
    }

    /// Adds a listener attached to the event source by [`BotContext::start`].
    pub fn with_listener(mut self, listener: Arc<dyn Listener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Enables the voice presence tracker.
    pub fn with_presence(
        mut self,
        audio: Arc<dyn AudioManager>,
        tenant_config: Arc<dyn TenantConfig>,
    ) -> Self {
        self.presence = Some((audio, tenant_config));
        self
    }

    /// Enables widget dispatch backed by `security`.
    pub fn with_security(mut self, security: Arc<dyn SecurityManager>) -> Self {
        self.security = Some(security);
        self
    }

    /// Replaces the action taken when the forced-exit timer fires.
    pub fn with_exit_hook(mut self, hook: ExitHook) -> Self {
        self.exit_hook = hook;
        self
    }

    /// Builds the context.
    ///
    /// Must be called from within a tokio runtime (subscriber workers are spawned).
    pub fn build(self) -> Arc<BotContext> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());

        #[allow(unused_mut)]
        let mut subscribers = self.subscribers;
        #[cfg(feature = "logging")]
        subscribers.push(Arc::new(crate::subscribers::LogWriter::new()));
        let subs = Arc::new(SubscriberSet::new(subscribers, bus.clone()));

        let scheduler = Arc::new(CommandScheduler::with_interceptors(
            bus.clone(),
            self.interceptors,
        ));
        let registry = Arc::new(ShutdownRegistry::new());

        let mut listeners = self.listeners;
        let presence = self.presence.map(|(audio, tenant_config)| {
            let tracker = Arc::new(VoicePresenceTracker::new(
                audio,
                tenant_config,
                &self.cfg,
                bus.clone(),
            ));
            registry.register(tracker.clone());
            listeners.push(tracker.clone());
            tracker
        });
        let widgets = self
            .security
            .map(|security| Arc::new(WidgetActionDispatcher::new(security, bus.clone())));

        let orchestrator = Arc::new(ShutdownOrchestrator::new(
            Arc::clone(&scheduler),
            Arc::clone(&registry),
            self.event_source,
            self.persistence,
            listeners,
            bus.clone(),
            self.cfg.exit_code,
            self.exit_hook,
        ));

        let ctx = Arc::new(BotContext {
            cfg: self.cfg,
            bus,
            subs,
            scheduler,
            registry,
            orchestrator,
            presence,
            widgets,
        });
        ctx.subscriber_listener();
        ctx
    }
}

/// Everything a running bot needs, constructed once by [`ContextBuilder`].
pub struct BotContext {
    /// Runtime configuration.
    pub cfg: Config,
    /// Lifecycle event bus.
    pub bus: Bus,
    subs: Arc<SubscriberSet>,
    /// Per-guild command scheduler.
    pub scheduler: Arc<CommandScheduler>,
    /// Components notified at shutdown.
    pub registry: Arc<ShutdownRegistry>,
    pub orchestrator: Arc<ShutdownOrchestrator>,
    /// Present when built [`with_presence`](ContextBuilder::with_presence).
    pub presence: Option<Arc<VoicePresenceTracker>>,
    /// Present when built [`with_security`](ContextBuilder::with_security).
    pub widgets: Option<Arc<WidgetActionDispatcher>>,
}

impl BotContext {
    /// Attaches listeners to the event source and goes online.
    pub fn start(&self) {
        self.orchestrator.register_listeners();
    }

    /// Runs the shutdown sequence with an explicit deadline.
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), RuntimeError> {
        self.orchestrator.shutdown(deadline).await
    }

    /// Waits for a termination signal, then shuts down within `cfg.shutdown_deadline`.
    pub async fn run_until_signal(&self) -> anyhow::Result<()> {
        wait_for_shutdown_signal().await?;
        self.shutdown(self.cfg.shutdown_deadline).await?;
        Ok(())
    }

    /// Creates a bulk loader using the configured batch size.
    pub fn bulk_loader<'a, K, V, F>(&self, fetch: F) -> BulkLoader<'a, K, V, F>
    where
        K: Eq + std::hash::Hash + Clone,
        F: FnMut(&[K]) -> Vec<(K, V)>,
    {
        BulkLoader::new(self.cfg.bulk_batch_size_clamped(), fetch)
    }

    /// Number of event subscribers, including the built-in log writer.
    pub fn subscriber_count(&self) -> usize {
        self.subs.len()
    }

    /// Forwards bus events to the subscriber set (fire-and-forget).
    fn subscriber_listener(&self) {
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event listener lagged behind the bus");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }
}
