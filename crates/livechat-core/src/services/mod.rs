//! Services module

pub mod chat;
pub mod classifier;
pub mod coordinator;
pub mod events;
pub mod fetcher;
pub mod quota;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod test_support;

pub use chat::{
    parse_timestamp, select_new_messages, ApiEndpoints, ChatError, ChatMessage,
    ChatSessionManager, ConnectionState, PollOutcome, DEFAULT_BASE_URL,
};
pub use classifier::{ErrorStatus, ResponseClassifier, TOO_SOON_SIGNATURE};
pub use coordinator::SessionCoordinator;
pub use events::{ChatEvent, EventBus};
pub use fetcher::{FetchError, Fetcher, HttpFetcher, REQUEST_TIMEOUT_SECS};
pub use quota::{QuotaTracker, MESSAGES_COST, RESOLVE_COST};
pub use scheduler::{PollScheduler, DUPLICATE_RISK_INTERVAL_MS, MIN_INTERVAL_MS};
