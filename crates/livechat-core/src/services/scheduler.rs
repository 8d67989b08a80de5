//! Poll scheduler
//!
//! Background timer that asks every listener to make its request.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                 PollScheduler                 │
//! │                                               │
//! │  ┌──────────────┐        ┌────────────────┐   │
//! │  │ interval_ms  │ ─────▶ │  Timer Loop    │   │
//! │  │ (atomic)     │        │  - sleep()     │   │
//! │  └──────────────┘        │  - publish()   │   │
//! │                          └────────────────┘   │
//! └───────────────────────────────────────────────┘
//!                                 │
//!                                 ▼
//!                   EventBus: PollRequested, PlayStateChanged,
//!                             RequestIntervalChanged
//! ```
//!
//! Ticks are broadcast, not queued. The loop re-reads the interval before
//! every wait, so a change applies from the next tick on.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use super::events::{ChatEvent, EventBus};
use crate::config::DEFAULT_REQUEST_INTERVAL_MS;
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Anything faster wastes quota and returns unreliable pages
pub const MIN_INTERVAL_MS: u64 = 500;

/// Below this the provider may re-stamp messages and cause duplicates
pub const DUPLICATE_RISK_INTERVAL_MS: u64 = 700;

struct Runner {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Periodic "poll now" signal
pub struct PollScheduler {
    interval_ms: Arc<AtomicU64>,
    bus: EventBus,
    runner: Mutex<Option<Runner>>,
}

impl PollScheduler {
    /// Create a stopped scheduler
    ///
    /// Intervals below [`MIN_INTERVAL_MS`] fall back to the default.
    pub fn new(bus: EventBus, interval_ms: u64) -> Self {
        let interval_ms = if interval_ms < MIN_INTERVAL_MS {
            log::warn!(
                "[chat:scheduler] Interval {}ms is too short, using {}ms",
                interval_ms,
                DEFAULT_REQUEST_INTERVAL_MS
            );
            DEFAULT_REQUEST_INTERVAL_MS
        } else {
            interval_ms
        };

        Self {
            interval_ms: Arc::new(AtomicU64::new(interval_ms)),
            bus,
            runner: Mutex::new(None),
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms.load(Ordering::SeqCst)
    }

    pub async fn is_running(&self) -> bool {
        self.runner.lock().await.is_some()
    }

    /// Change the interval by hand
    pub fn set_interval(&self, interval_ms: u64) -> Result<u64> {
        if interval_ms == 0 {
            log::warn!("[chat:scheduler] Request delay can't be 0");
            return Err(Error::validation("request interval must be positive"));
        }

        if interval_ms < MIN_INTERVAL_MS {
            log::warn!(
                "[chat:scheduler] Going below {}ms is wasteful on quota and volatile at fetching messages",
                MIN_INTERVAL_MS
            );
            return Err(Error::validation(format!(
                "request interval must be at least {}ms",
                MIN_INTERVAL_MS
            )));
        }

        if interval_ms < DUPLICATE_RISK_INTERVAL_MS {
            log::warn!(
                "[chat:scheduler] Intervals below {}ms can cause duplicate messages as the provider corrects timestamps",
                DUPLICATE_RISK_INTERVAL_MS
            );
        }

        self.interval_ms.store(interval_ms, Ordering::SeqCst);
        self.bus.publish(ChatEvent::RequestIntervalChanged(interval_ms));
        log::info!("[chat:scheduler] Request interval set to {}ms", interval_ms);
        Ok(interval_ms)
    }

    /// Start firing; does nothing if already running
    pub async fn start(&self) {
        let mut runner = self.runner.lock().await;
        if runner.is_some() {
            log::info!("[chat:scheduler] Timer already running");
            return;
        }

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let interval_ms = Arc::clone(&self.interval_ms);
        let bus = self.bus.clone();

        let task = tokio::spawn(async move {
            log::debug!("[chat:scheduler] Timer loop started");

            loop {
                let wait = Duration::from_millis(interval_ms.load(Ordering::SeqCst));

                tokio::select! {
                    _ = tokio::time::sleep(wait) => {
                        bus.publish(ChatEvent::PollRequested);
                    }
                    _ = &mut stop_rx => {
                        log::debug!("[chat:scheduler] Received stop signal");
                        break;
                    }
                }
            }

            log::debug!("[chat:scheduler] Timer loop exited");
        });

        *runner = Some(Runner { stop_tx, task });
        drop(runner);

        self.bus.publish(ChatEvent::PlayStateChanged(true));
        log::info!("[chat:scheduler] Timer started ({}ms)", self.interval_ms());
    }

    /// Stop firing and wait for the loop to exit
    pub async fn stop(&self) {
        let runner = self.runner.lock().await.take();

        if let Some(runner) = runner {
            let _ = runner.stop_tx.send(());
            if let Err(e) = runner.task.await {
                log::warn!("[chat:scheduler] Timer task did not exit cleanly: {}", e);
            }
        }

        self.bus.publish(ChatEvent::PlayStateChanged(false));
        log::info!("[chat:scheduler] Timer stopped");
    }
}
