//! # livechat-core
//!
//! Polling engine for livestream chat - shared by the CLI and any other
//! frontend.
//!
//! This crate provides:
//! - Persisted settings (`config` module)
//! - Chat session, scheduler and coordinator (`services` module)
//! - Unified error handling (`error` module)

pub mod config;
pub mod error;
pub mod services;

// Re-exports for convenience
pub use config::{
    get_settings_path, Settings, SettingsStore, YoutubeSettings, CONFIG_PATH_ENV,
    DEFAULT_REQUEST_INTERVAL_MS,
};
pub use error::{Error, Result};

pub use services::{
    parse_timestamp, select_new_messages, ApiEndpoints, ChatError, ChatEvent, ChatMessage,
    ChatSessionManager, ConnectionState, ErrorStatus, EventBus, FetchError, Fetcher,
    HttpFetcher, PollOutcome, PollScheduler, QuotaTracker, ResponseClassifier,
    SessionCoordinator,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the library version
pub fn version() -> &'static str {
    VERSION
}
