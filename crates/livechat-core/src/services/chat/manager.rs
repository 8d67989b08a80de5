//! Chat session manager
//!
//! Owns one livestream chat connection: resolves the chat id from a stream
//! id, establishes a timestamp baseline, then pages through new messages.
//!
//! # Deduplication
//!
//! The provider pages overlap, so each poll scans the page from newest to
//! oldest and stops at the first message that is not newer than the
//! watermark. The batch is published first; the watermark only moves after.
//!
//! # Concurrency
//!
//! Session state sits behind an async mutex held for the whole request.
//! `poll` never waits for it: a tick that arrives while another poll is in
//! flight is dropped, so two polls can never reuse the same page token.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard};

use super::endpoints::ApiEndpoints;
use super::types::{
    ChatError, ChatMessage, ChatPage, ConnectionState, MessageListResponse, PollOutcome,
    VideoListResponse,
};
use crate::services::classifier::{ErrorStatus, ResponseClassifier};
use crate::services::events::{ChatEvent, EventBus};
use crate::services::fetcher::Fetcher;
use crate::services::quota::{QuotaTracker, MESSAGES_COST, RESOLVE_COST};

/// What a request produced once provider errors were sorted out
enum Reply {
    Body(String),
    Throttled,
}

#[derive(Debug)]
struct SessionState {
    api_key: String,
    chat_id: String,
    next_page_token: String,
    /// Newest timestamp already delivered
    last_accepted: DateTime<Utc>,
    /// Newest timestamp of the page being processed
    pending_newest: DateTime<Utc>,
    polls_completed: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            chat_id: String::new(),
            next_page_token: String::new(),
            last_accepted: DateTime::UNIX_EPOCH,
            pending_newest: DateTime::UNIX_EPOCH,
            polls_completed: 0,
        }
    }
}

impl SessionState {
    fn connection_state(&self) -> ConnectionState {
        if self.next_page_token.is_empty() {
            ConnectionState::Disconnected
        } else if self.polls_completed == 0 {
            ConnectionState::Initialized
        } else {
            ConnectionState::Polling
        }
    }
}

/// Select the messages of a page that are newer than `watermark`
///
/// `page` is in provider order (oldest to newest). Returns the new messages
/// newest first, plus the newest timestamp on the page.
pub fn select_new_messages(
    page: &[ChatMessage],
    watermark: DateTime<Utc>,
) -> (Vec<ChatMessage>, Option<DateTime<Utc>>) {
    let newest = page.iter().map(|m| m.published_at).max();

    let batch = page
        .iter()
        .rev()
        .take_while(|m| m.published_at > watermark)
        .cloned()
        .collect();

    (batch, newest)
}

/// Polls one livestream chat
pub struct ChatSessionManager {
    fetcher: Arc<dyn Fetcher>,
    classifier: ResponseClassifier,
    endpoints: ApiEndpoints,
    quota: QuotaTracker,
    bus: EventBus,
    state: Mutex<SessionState>,
}

impl ChatSessionManager {
    pub fn new(fetcher: Arc<dyn Fetcher>, quota: QuotaTracker, bus: EventBus) -> Self {
        Self {
            fetcher,
            classifier: ResponseClassifier::new(),
            endpoints: ApiEndpoints::default(),
            quota,
            bus,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn with_classifier(mut self, classifier: ResponseClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_endpoints(mut self, endpoints: ApiEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Resolve the chat id and establish the baseline
    ///
    /// A blank API key fails before any request is made.
    pub async fn connect(&self, stream_id: &str, api_key: &str) -> Result<(), ChatError> {
        if api_key.trim().is_empty() {
            log::warn!("[chat:manager] Connect refused: no API key");
            return Err(ChatError::MissingApiKey);
        }

        let mut state = self.state.lock().await;
        state.api_key = api_key.trim().to_string();
        state.next_page_token.clear();

        log::info!("[chat:manager] Resolving chat session for stream {}", stream_id);
        self.resolve_locked(&mut state, stream_id).await?;

        log::info!("[chat:manager] Initializing chat {}", state.chat_id);
        self.initialize_locked(&mut state).await
    }

    /// Look up the active chat id of a stream (1 quota point)
    pub async fn resolve(&self, stream_id: &str, api_key: &str) -> Result<String, ChatError> {
        if api_key.trim().is_empty() {
            return Err(ChatError::MissingApiKey);
        }

        let mut state = self.state.lock().await;
        state.api_key = api_key.trim().to_string();
        self.resolve_locked(&mut state, stream_id).await?;
        Ok(state.chat_id.clone())
    }

    /// Fetch the first page to set the baseline and page token (5 quota points)
    pub async fn initialize(&self) -> Result<(), ChatError> {
        let mut state = self.state.lock().await;
        self.initialize_locked(&mut state).await
    }

    /// Fetch the next page and publish what is new (5 quota points)
    ///
    /// Request failures publish an empty batch and leave the watermark alone.
    pub async fn poll(&self) -> Result<PollOutcome, ChatError> {
        let mut state = match self.state.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                log::debug!("[chat:manager] Poll still in flight, dropping tick");
                return Ok(PollOutcome::Skipped);
            }
        };

        if state.next_page_token.is_empty() {
            log::error!("[chat:manager] Poll called before the session was initialized");
            return Err(ChatError::NotInitialized);
        }

        let reply = match self.endpoints.messages_url(
            &state.api_key,
            &state.chat_id,
            Some(state.next_page_token.as_str()),
        ) {
            Ok(url) => self.request(&url, MESSAGES_COST).await,
            Err(e) => Err(e),
        };

        let body = match reply {
            Ok(Reply::Body(body)) => body,
            Ok(Reply::Throttled) => {
                self.bus.publish(ChatEvent::Messages(Vec::new()));
                return Ok(PollOutcome::Throttled);
            }
            Err(e) => {
                log::warn!("[chat:manager] Poll failed: {}", e);
                self.bus.publish(ChatEvent::Messages(Vec::new()));
                return Err(e);
            }
        };

        let page = Self::parse_page(&body)?;
        let delivered = self.deliver_page(&mut state, page);
        Ok(PollOutcome::Delivered(delivered))
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub async fn connection_state(&self) -> ConnectionState {
        self.state.lock().await.connection_state()
    }

    /// Newest timestamp already delivered
    pub async fn watermark(&self) -> DateTime<Utc> {
        self.state.lock().await.last_accepted
    }

    pub async fn chat_id(&self) -> String {
        self.state.lock().await.chat_id.clone()
    }

    pub async fn page_token(&self) -> String {
        self.state.lock().await.next_page_token.clone()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn resolve_locked(
        &self,
        state: &mut MutexGuard<'_, SessionState>,
        stream_id: &str,
    ) -> Result<(), ChatError> {
        state.chat_id.clear();

        let url = self.endpoints.videos_url(&state.api_key, stream_id)?;
        let body = match self.request(&url, RESOLVE_COST).await? {
            Reply::Body(body) => body,
            Reply::Throttled => return Err(ChatError::Throttled),
        };

        let response: VideoListResponse = serde_json::from_str(&body)?;
        let chat_id = response.active_chat_id().ok_or(ChatError::NoActiveChat)?;

        log::info!("[chat:manager] Stream {} has chat {}", stream_id, chat_id);
        state.chat_id = chat_id;
        Ok(())
    }

    async fn initialize_locked(
        &self,
        state: &mut MutexGuard<'_, SessionState>,
    ) -> Result<(), ChatError> {
        if state.chat_id.is_empty() {
            return Err(ChatError::MissingChatId);
        }

        state.next_page_token.clear();

        let url = self
            .endpoints
            .messages_url(&state.api_key, &state.chat_id, None)?;
        let body = match self.request(&url, MESSAGES_COST).await? {
            Reply::Body(body) => body,
            Reply::Throttled => return Err(ChatError::Throttled),
        };

        let page = Self::parse_page(&body)?;

        // Provider order is oldest to newest; an empty chat accepts everything
        let baseline = page
            .messages
            .last()
            .map(|m| m.published_at)
            .unwrap_or(DateTime::UNIX_EPOCH);

        state.last_accepted = baseline;
        state.pending_newest = baseline;
        state.next_page_token = page.next_page_token;
        state.polls_completed = 0;

        if let Some(interval) = page.polling_interval_ms {
            self.bus.publish(ChatEvent::SuggestedInterval(interval));
        }

        log::info!("[chat:manager] Chat initialized, baseline {}", baseline);
        Ok(())
    }

    fn deliver_page(&self, state: &mut MutexGuard<'_, SessionState>, page: ChatPage) -> usize {
        state.next_page_token = page.next_page_token;

        if let Some(interval) = page.polling_interval_ms {
            self.bus.publish(ChatEvent::SuggestedInterval(interval));
        }

        let previous = state.last_accepted;
        let (batch, newest) = select_new_messages(&page.messages, previous);
        if let Some(newest) = newest {
            state.pending_newest = newest.max(previous);
        }

        let delivered = batch.len();
        log::debug!("[chat:manager] {} new messages", delivered);
        self.bus.publish(ChatEvent::Messages(batch));

        state.last_accepted = state.pending_newest;
        state.polls_completed += 1;
        delivered
    }

    fn parse_page(body: &str) -> Result<ChatPage, ChatError> {
        let response: MessageListResponse = serde_json::from_str(body)?;
        response.into_page().map_err(|e| {
            log::error!("[chat:manager] Malformed message page: {}", e);
            e
        })
    }

    /// Charge quota, GET, and sort out embedded provider errors
    async fn request(&self, url: &str, cost: u64) -> Result<Reply, ChatError> {
        self.quota.add_quota(cost);

        let body = match self.fetcher.get(url).await {
            Ok(body) => body,
            Err(e) => {
                // Error replies still carry the provider's explanation
                if let Some(body) = e.body() {
                    match self.classifier.classify(body) {
                        ErrorStatus::HardError { message } => {
                            return Err(self.hard_error(message));
                        }
                        ErrorStatus::IgnorableError => return Ok(Reply::Throttled),
                        ErrorStatus::NoError => {}
                    }
                }
                return Err(ChatError::Fetch(e));
            }
        };

        match self.classifier.classify(&body) {
            ErrorStatus::NoError => Ok(Reply::Body(body)),
            ErrorStatus::IgnorableError => Ok(Reply::Throttled),
            ErrorStatus::HardError { message } => Err(self.hard_error(message)),
        }
    }

    fn hard_error(&self, message: String) -> ChatError {
        let err = ChatError::Provider(message);
        log::warn!("[chat:manager] {}", err);
        self.bus.publish(ChatEvent::Feedback(err.to_string()));
        err
    }
}
