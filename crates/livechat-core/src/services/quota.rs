//! Quota tracking
//!
//! Local accounting of YouTube Data API cost points. The provider enforces
//! the real daily limit; this counter only mirrors what we have spent so it
//! can be shown to the user and persisted between runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cost of a `videos.list` call (chat id lookup)
pub const RESOLVE_COST: u64 = 1;

/// Cost of a `liveChatMessages.list` call (initialize and every poll)
pub const MESSAGES_COST: u64 = 5;

/// Running total of consumed quota points
///
/// Cloning shares the same counter, so every request path can charge it.
#[derive(Debug, Clone, Default)]
pub struct QuotaTracker {
    used: Arc<AtomicU64>,
}

impl QuotaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a previously persisted total
    pub fn with_usage(used: u64) -> Self {
        Self {
            used: Arc::new(AtomicU64::new(used)),
        }
    }

    /// Charge `cost` points and return the new total
    pub fn add_quota(&self, cost: u64) -> u64 {
        let total = self.used.fetch_add(cost, Ordering::SeqCst) + cost;
        log::debug!("[chat:quota] Charged {} points, total {}", cost, total);
        total
    }

    pub fn usage(&self) -> u64 {
        self.used.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.used.store(0, Ordering::SeqCst);
    }
}
