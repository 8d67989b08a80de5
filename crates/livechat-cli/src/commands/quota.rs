//! Quota commands

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;

use super::Context;
use crate::output::{print_single, print_success};

#[derive(Subcommand)]
pub enum QuotaAction {
    /// Show quota points used so far
    Show,

    /// Reset the quota counter to zero
    Reset,
}

/// Quota row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct QuotaRow {
    #[tabled(rename = "Quota Used")]
    pub quota_usage: u64,
    #[tabled(rename = "Request Interval (ms)")]
    pub request_interval: u64,
}

pub async fn execute(ctx: &Context, action: QuotaAction) -> Result<()> {
    match action {
        QuotaAction::Show => show_quota(ctx),
        QuotaAction::Reset => reset_quota(ctx),
    }
}

fn show_quota(ctx: &Context) -> Result<()> {
    let settings = ctx.store.load()?;
    let row = QuotaRow {
        quota_usage: settings.yt.quota_usage,
        request_interval: settings.yt.request_interval,
    };
    print_single(&row, ctx.format)
}

fn reset_quota(ctx: &Context) -> Result<()> {
    let mut settings = ctx.store.load()?;
    let previous = settings.yt.quota_usage;
    settings.yt.quota_usage = 0;
    ctx.store.save(&settings)?;

    print_success(&format!("Quota reset (was {})", previous), ctx.quiet);
    Ok(())
}
