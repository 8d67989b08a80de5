//! Livestream chat polling
//!
//! ```text
//!  connect(stream_id, key)
//!     │
//!     ├── resolve     videos?part=liveStreamingDetails      (1 point)
//!     └── initialize  liveChat/messages                     (5 points)
//!
//!  poll()             liveChat/messages&pageToken=..        (5 points)
//!     └── ChatEvent::Messages(new messages, newest first)
//! ```

pub mod endpoints;
pub mod manager;
pub mod types;

pub use endpoints::{ApiEndpoints, DEFAULT_BASE_URL};
pub use manager::{select_new_messages, ChatSessionManager};
pub use types::{parse_timestamp, ChatError, ChatMessage, ConnectionState, PollOutcome};
