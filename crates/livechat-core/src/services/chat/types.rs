//! Chat types
//!
//! Public message type plus the subset of the YouTube Data API payloads the
//! engine reads.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::fetcher::FetchError;

/// Provider timestamps are cut to this many characters before parsing
const TIMESTAMP_LEN: usize = 22;

/// `yyyy-MM-ddTHH:mm:ss.ff`
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

// ============================================================================
// Error Types
// ============================================================================

/// Errors from the chat session manager
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("No valid API Key provided.")]
    MissingApiKey,

    #[error("No Chat ID detected to initialize. Resolve the chat session first.")]
    MissingChatId,

    /// Polling before a successful connect is a caller bug
    #[error("Next page token should not be empty. Connect to a livestream before polling.")]
    NotInitialized,

    #[error("No active chat session found for this identifier. Check the stream id and that the stream is live.")]
    NoActiveChat,

    #[error("{0}")]
    Fetch(#[from] FetchError),

    #[error("Error, cause - {0}")]
    Provider(String),

    #[error("The provider asked to slow down, try again shortly.")]
    Throttled,

    #[error("Unexpected provider payload: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::Parse(err.to_string())
    }
}

// ============================================================================
// Public Types
// ============================================================================

/// One chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author display name
    pub author: String,
    /// Message text
    pub text: String,
    /// When the provider published the message
    pub published_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(
        author: impl Into<String>,
        text: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
            published_at,
        }
    }
}

/// Where a chat session manager is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    /// Baseline established, no poll completed yet
    Initialized,
    Polling,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Initialized => write!(f, "initialized"),
            ConnectionState::Polling => write!(f, "polling"),
        }
    }
}

/// Result of a single poll call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The page was processed; this many new messages were delivered
    Delivered(usize),
    /// The provider said "too soon"; an empty batch was delivered
    Throttled,
    /// Another poll was still running, nothing was requested
    Skipped,
}

/// Parse a provider timestamp
///
/// Only the first 22 characters (`yyyy-MM-ddTHH:mm:ss.ff`) are significant.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ChatError> {
    let truncated: String = raw.chars().take(TIMESTAMP_LEN).collect();
    let trimmed = truncated.trim_end_matches('Z');

    NaiveDateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| ChatError::Parse(format!("invalid timestamp '{}': {}", raw, e)))
}

// ============================================================================
// API Response Types
// ============================================================================

/// Response from `videos?part=liveStreamingDetails`
#[derive(Debug, Deserialize)]
pub(crate) struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    live_streaming_details: Option<LiveStreamingDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveStreamingDetails {
    active_live_chat_id: Option<String>,
}

impl VideoListResponse {
    /// `items[0].liveStreamingDetails.activeLiveChatId`, if non-blank
    pub(crate) fn active_chat_id(&self) -> Option<String> {
        self.items
            .first()
            .and_then(|item| item.live_streaming_details.as_ref())
            .and_then(|details| details.active_live_chat_id.clone())
            .filter(|id| !id.trim().is_empty())
    }
}

/// Response from `liveChat/messages?part=snippet,authorDetails`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessageListResponse {
    #[serde(default)]
    items: Vec<MessageItem>,
    next_page_token: Option<String>,
    polling_interval_millis: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageItem {
    snippet: Option<MessageSnippet>,
    author_details: Option<AuthorDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageSnippet {
    published_at: Option<String>,
    display_message: Option<String>,
    text_message_details: Option<TextMessageDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextMessageDetails {
    message_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorDetails {
    display_name: Option<String>,
}

impl MessageItem {
    fn into_message(self) -> Result<ChatMessage, ChatError> {
        let snippet = self
            .snippet
            .ok_or_else(|| ChatError::Parse("message item without snippet".to_string()))?;

        let raw = snippet
            .published_at
            .as_deref()
            .ok_or_else(|| ChatError::Parse("message item without publishedAt".to_string()))?;
        let published_at = parse_timestamp(raw)?;

        let text = snippet
            .display_message
            .or_else(|| snippet.text_message_details.and_then(|d| d.message_text))
            .unwrap_or_default();

        let author = self
            .author_details
            .and_then(|a| a.display_name)
            .unwrap_or_default();

        Ok(ChatMessage {
            author,
            text,
            published_at,
        })
    }
}

/// A fully parsed page of chat messages
#[derive(Debug, Clone)]
pub(crate) struct ChatPage {
    /// Messages in provider order (oldest to newest)
    pub messages: Vec<ChatMessage>,
    pub next_page_token: String,
    pub polling_interval_ms: Option<u64>,
}

impl MessageListResponse {
    /// Convert into a [`ChatPage`], failing on any malformed item
    pub(crate) fn into_page(self) -> Result<ChatPage, ChatError> {
        let next_page_token = self
            .next_page_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ChatError::Parse("response without nextPageToken".to_string()))?;

        let messages = self
            .items
            .into_iter()
            .map(MessageItem::into_message)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ChatPage {
            messages,
            next_page_token,
            polling_interval_ms: self.polling_interval_millis,
        })
    }
}
