//! Listener events
//!
//! Every callback the engine exposes goes through an [`EventBus`]. Each
//! coordinator owns its own bus; components receive a clone of it instead
//! of reaching for shared global state.

use tokio::sync::broadcast;

use super::chat::ChatMessage;

/// Default channel capacity
const DEFAULT_CAPACITY: usize = 256;

/// Notification published by the engine
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// New messages from one poll, newest first (possibly empty)
    Messages(Vec<ChatMessage>),
    /// Polling interval suggested by the provider, in milliseconds
    SuggestedInterval(u64),
    /// The scheduler's own interval changed, in milliseconds
    RequestIntervalChanged(u64),
    /// The scheduler was started (`true`) or stopped (`false`)
    PlayStateChanged(bool),
    /// Human-readable provider error
    Feedback(String),
    /// Every active feature should make its request now
    PollRequested,
}

/// Broadcast fan-out of [`ChatEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ChatEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Register a new listener
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.sender.subscribe()
    }

    /// Publish to all current listeners and return how many received it
    pub fn publish(&self, event: ChatEvent) -> usize {
        match self.sender.send(event) {
            Ok(count) => count,
            Err(_) => {
                log::trace!("[chat:events] No listeners for event");
                0
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
