//! Watch command
//!
//! Connects to a livestream chat and prints new messages until Ctrl-C.

use std::future::Future;

use anyhow::Result;
use clap::Args;
use livechat_core::{ChatEvent, SessionCoordinator};
use tokio::sync::broadcast::{self, error::RecvError};

use super::Context;
use crate::output::{print_batch, print_error, print_info, print_success, print_warning};

#[derive(Args)]
pub struct WatchArgs {
    /// Livestream (video) id
    pub stream_id: String,

    /// API key; falls back to the saved key
    #[arg(long, env = "LIVECHAT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Poll interval in milliseconds
    #[arg(long)]
    pub interval: Option<u64>,
}

pub async fn execute(ctx: &Context, args: WatchArgs) -> Result<()> {
    let coordinator = SessionCoordinator::from_store(ctx.store.clone())?;

    if let Some(interval) = args.interval {
        coordinator.scheduler().set_interval(interval)?;
    }

    let mut events = coordinator.subscribe();

    print_info(&format!("Connecting to {}...", args.stream_id), ctx.quiet);
    let connected = match args.api_key.as_deref() {
        Some(key) => {
            coordinator
                .connect_to_livestream_chat(&args.stream_id, key)
                .await
        }
        None => coordinator.connect_with_saved_key(&args.stream_id).await,
    };

    if let Err(e) = connected {
        // Quota spent on the attempt still counts
        coordinator.shutdown().await?;
        print_error(&format!("Could not connect: {}", e));
        return Err(e.into());
    }

    coordinator.scheduler().start().await;
    print_success(
        &format!(
            "Connected, polling every {}ms. Press Ctrl-C to stop.",
            coordinator.scheduler().interval_ms()
        ),
        ctx.quiet,
    );

    stream_events(ctx, &mut events, tokio::signal::ctrl_c()).await?;
    log::info!("[cli:watch] Stopping, saving settings");

    coordinator.shutdown().await?;
    let settings = coordinator.settings().await;
    print_success(
        &format!("Stopped. Quota used so far: {}", settings.yt.quota_usage),
        ctx.quiet,
    );
    Ok(())
}

/// Print bus events until `shutdown` resolves or the bus closes
async fn stream_events<F>(
    ctx: &Context,
    events: &mut broadcast::Receiver<ChatEvent>,
    shutdown: F,
) -> Result<()>
where
    F: Future,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = events.recv() => match event {
                Ok(ChatEvent::Messages(batch)) => print_batch(&batch, ctx.format)?,
                Ok(ChatEvent::Feedback(message)) => print_error(&message),
                Ok(ChatEvent::RequestIntervalChanged(ms)) => {
                    print_info(&format!("Request interval is now {}ms", ms), ctx.quiet)
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("[cli:watch] Output lagged, {} events dropped", skipped);
                    print_warning(
                        &format!("Output fell behind, {} events dropped", skipped),
                        ctx.quiet,
                    )
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    Ok(())
}
