//! Session coordinator
//!
//! Wires the scheduler, the chat session and the persisted settings
//! together. One coordinator lives for the whole app; chat sessions come and
//! go underneath it.
//!
//! ```text
//!   PollScheduler ──PollRequested──▶ EventBus ──▶ dispatcher ──▶ manager.poll()
//!                                       ▲                            │
//!                                       └──── Messages / Feedback ───┘
//! ```

use std::sync::Arc;

use tokio::sync::{broadcast, oneshot, Mutex, RwLock};
use tokio::task::{JoinHandle, JoinSet};

use super::chat::{ApiEndpoints, ChatError, ChatSessionManager, ConnectionState, PollOutcome};
use super::classifier::ResponseClassifier;
use super::events::{ChatEvent, EventBus};
use super::fetcher::{Fetcher, HttpFetcher};
use super::quota::QuotaTracker;
use super::scheduler::PollScheduler;
use crate::config::{Settings, SettingsStore};
use crate::error::Result;

struct ActiveSession {
    manager: Arc<ChatSessionManager>,
    stop_tx: oneshot::Sender<()>,
    dispatcher: JoinHandle<()>,
}

impl ActiveSession {
    /// Stop the dispatcher and wait until none of its polls can publish
    async fn close(self) {
        let _ = self.stop_tx.send(());
        if let Err(e) = self.dispatcher.await {
            log::warn!("[chat:coordinator] Dispatcher did not exit cleanly: {}", e);
        }
    }
}

/// Owns the long-lived pieces of the chat pipeline
pub struct SessionCoordinator {
    bus: EventBus,
    scheduler: Arc<PollScheduler>,
    quota: QuotaTracker,
    fetcher: Arc<dyn Fetcher>,
    endpoints: ApiEndpoints,
    classifier: ResponseClassifier,
    settings: RwLock<Settings>,
    store: Option<SettingsStore>,
    session: Mutex<Option<ActiveSession>>,
}

impl SessionCoordinator {
    /// Build from already loaded settings; nothing is persisted
    pub fn new(settings: Settings) -> Self {
        let bus = EventBus::new();
        let scheduler = PollScheduler::new(bus.clone(), settings.yt.request_interval);
        let quota = QuotaTracker::with_usage(settings.yt.quota_usage);

        Self {
            bus,
            scheduler: Arc::new(scheduler),
            quota,
            fetcher: Arc::new(HttpFetcher::new()),
            endpoints: ApiEndpoints::default(),
            classifier: ResponseClassifier::new(),
            settings: RwLock::new(settings),
            store: None,
            session: Mutex::new(None),
        }
    }

    /// Load settings from `store` and save back into it on shutdown
    pub fn from_store(store: SettingsStore) -> Result<Self> {
        let settings = store.load()?;
        log::info!(
            "[chat:coordinator] Loaded settings from {}",
            store.path().display()
        );
        Ok(Self::new(settings).with_store(store))
    }

    pub fn with_store(mut self, store: SettingsStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_endpoints(mut self, endpoints: ApiEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_classifier(mut self, classifier: ResponseClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.bus.subscribe()
    }

    pub fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    pub fn quota(&self) -> &QuotaTracker {
        &self.quota
    }

    /// Current settings with live quota and interval folded in
    pub async fn settings(&self) -> Settings {
        let mut settings = self.settings.read().await.clone();
        settings.yt.quota_usage = self.quota.usage();
        settings.yt.request_interval = self.scheduler.interval_ms();
        settings
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    /// Replace the current chat session with one for `stream_id`
    ///
    /// The old session is closed first, including any poll still in flight.
    /// On failure no session is active.
    pub async fn connect_to_livestream_chat(
        &self,
        stream_id: &str,
        api_key: &str,
    ) -> std::result::Result<(), ChatError> {
        let previous = self.session.lock().await.take();
        if let Some(old) = previous {
            log::info!("[chat:coordinator] Dropping previous chat session");
            old.close().await;
        }

        let manager = ChatSessionManager::new(
            Arc::clone(&self.fetcher),
            self.quota.clone(),
            self.bus.clone(),
        )
        .with_classifier(self.classifier.clone())
        .with_endpoints(self.endpoints.clone());
        let manager = Arc::new(manager);

        // Subscribe before connecting so the first suggested interval is seen
        let events = self.bus.subscribe();
        manager.connect(stream_id, api_key).await?;

        let follow_provider = self.settings.read().await.yt.use_provider_interval;
        let (stop_tx, stop_rx) = oneshot::channel();
        let dispatcher = spawn_dispatcher(
            Arc::clone(&manager),
            Arc::clone(&self.scheduler),
            events,
            stop_rx,
            follow_provider,
        );
        let active = ActiveSession {
            manager,
            stop_tx,
            dispatcher,
        };

        // A concurrent connect may have finished first; the last one wins
        let replaced = self.session.lock().await.replace(active);
        if let Some(other) = replaced {
            other.close().await;
        }

        log::info!("[chat:coordinator] Connected to stream {}", stream_id);
        Ok(())
    }

    /// Connect using the key stored in settings
    pub async fn connect_with_saved_key(
        &self,
        stream_id: &str,
    ) -> std::result::Result<(), ChatError> {
        let api_key = self
            .settings
            .read()
            .await
            .yt
            .saved_api_key()
            .map(str::to_string);
        match api_key {
            Some(key) => self.connect_to_livestream_chat(stream_id, &key).await,
            None => Err(ChatError::MissingApiKey),
        }
    }

    /// Ask for a poll outside the timer
    pub fn request_poll(&self) -> usize {
        self.bus.publish(ChatEvent::PollRequested)
    }

    pub async fn connection_state(&self) -> ConnectionState {
        let manager = self
            .session
            .lock()
            .await
            .as_ref()
            .map(|s| Arc::clone(&s.manager));

        match manager {
            Some(manager) => manager.connection_state().await,
            None => ConnectionState::Disconnected,
        }
    }

    /// Unwire the active session, if any
    pub async fn disconnect(&self) {
        let previous = self.session.lock().await.take();
        if let Some(old) = previous {
            old.close().await;
            log::info!("[chat:coordinator] Chat session closed");
        }
    }

    /// Stop polling and persist quota usage and the request interval
    pub async fn shutdown(&self) -> Result<()> {
        self.scheduler.stop().await;
        self.disconnect().await;

        let snapshot = self.settings().await;
        *self.settings.write().await = snapshot.clone();

        if let Some(store) = &self.store {
            store.save(&snapshot)?;
            log::info!(
                "[chat:coordinator] Saved quota {} and interval {}ms",
                snapshot.yt.quota_usage,
                snapshot.yt.request_interval
            );
        }
        Ok(())
    }
}

fn spawn_dispatcher(
    manager: Arc<ChatSessionManager>,
    scheduler: Arc<PollScheduler>,
    mut events: broadcast::Receiver<ChatEvent>,
    mut stop_rx: oneshot::Receiver<()>,
    follow_provider: bool,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut polls = JoinSet::new();

        loop {
            tokio::select! {
                _ = &mut stop_rx => break,
                Some(joined) = polls.join_next(), if !polls.is_empty() => {
                    log_poll(joined);
                }
                event = events.recv() => match event {
                    Ok(ChatEvent::PollRequested) => {
                        let manager = Arc::clone(&manager);
                        polls.spawn(async move { manager.poll().await });
                    }
                    Ok(ChatEvent::SuggestedInterval(ms)) if follow_provider => {
                        if scheduler.interval_ms() != ms {
                            if let Err(e) = scheduler.set_interval(ms) {
                                log::warn!("[chat:coordinator] Ignoring suggested interval: {}", e);
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!("[chat:coordinator] Dispatcher lagged, {} events lost", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }

        // Aborts in-flight polls and waits for them to finish unwinding
        polls.shutdown().await;
        log::debug!("[chat:coordinator] Dispatcher stopped");
    })
}

fn log_poll(
    joined: std::result::Result<
        std::result::Result<PollOutcome, ChatError>,
        tokio::task::JoinError,
    >,
) {
    match joined {
        Ok(Ok(PollOutcome::Delivered(n))) => {
            log::debug!("[chat:coordinator] Delivered {} messages", n)
        }
        Ok(Ok(PollOutcome::Throttled)) => {
            log::debug!("[chat:coordinator] Provider asked us to slow down")
        }
        Ok(Ok(PollOutcome::Skipped)) => {}
        Ok(Err(e)) => log::warn!("[chat:coordinator] Poll failed: {}", e),
        Err(e) => log::warn!("[chat:coordinator] Poll task failed: {}", e),
    }
}
