//! Config commands
//!
//! Commands for reading and editing the settings file.

use anyhow::{bail, Result};
use clap::Subcommand;
use livechat_core::services::{DUPLICATE_RISK_INTERVAL_MS, MIN_INTERVAL_MS};
use livechat_core::{Settings, CONFIG_PATH_ENV};
use serde::Serialize;
use tabled::Tabled;

use super::Context;
use crate::output::{print_error, print_info, print_output, print_success, print_warning};

/// Keys accepted by `config set`
const SETTABLE_KEYS: &str = "request_interval, api_key, use_provider_interval";

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// Configuration value
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
}

/// Config row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct ConfigRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Source")]
    pub source: String,
}

pub async fn execute(ctx: &Context, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => show_config(ctx),
        ConfigAction::Set { key, value } => set_config(ctx, key, value),
        ConfigAction::Get { key } => get_config(ctx, key),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    let rows = get_all_config(ctx)?;
    print_output(&rows, ctx.format)?;
    Ok(())
}

fn get_config(ctx: &Context, key: String) -> Result<()> {
    let rows = get_all_config(ctx)?;

    if let Some(row) = rows.iter().find(|r| r.key.eq_ignore_ascii_case(&key)) {
        print_info(&format!("{} = {}", row.key, row.value), ctx.quiet);
    } else {
        print_error(&format!("Config key not found: {}", key));
    }

    Ok(())
}

fn set_config(ctx: &Context, key: String, value: String) -> Result<()> {
    let mut settings = ctx.store.load()?;

    match key.to_lowercase().as_str() {
        "request_interval" => {
            let interval = parse_interval(&value)?;
            if interval < DUPLICATE_RISK_INTERVAL_MS {
                print_warning(
                    &format!(
                        "Intervals below {}ms can cause duplicate messages",
                        DUPLICATE_RISK_INTERVAL_MS
                    ),
                    ctx.quiet,
                );
            }
            settings.yt.request_interval = interval;
            ctx.store.save(&settings)?;
            print_success(&format!("Set request_interval = {}", interval), ctx.quiet);
        }
        "api_key" => {
            let trimmed = value.trim();
            settings.yt.api_key = (!trimmed.is_empty()).then(|| trimmed.to_string());
            ctx.store.save(&settings)?;
            print_success("Set api_key = ****", ctx.quiet);
        }
        "use_provider_interval" => {
            let enabled = parse_bool(&value)?;
            settings.yt.use_provider_interval = enabled;
            ctx.store.save(&settings)?;
            print_success(&format!("Set use_provider_interval = {}", enabled), ctx.quiet);
        }
        _ => {
            print_error(&format!("Unknown config key: {}", key));
            print_info(&format!("Available keys: {}", SETTABLE_KEYS), ctx.quiet);
        }
    }

    Ok(())
}

fn get_all_config(ctx: &Context) -> Result<Vec<ConfigRow>> {
    let settings: Settings = ctx.store.load()?;
    let file_source = if ctx.store.path().exists() { "file" } else { "default" };

    Ok(vec![
        ConfigRow {
            key: CONFIG_PATH_ENV.to_string(),
            value: ctx.store.path().to_string_lossy().to_string(),
            source: if std::env::var(CONFIG_PATH_ENV).is_ok() { "env" } else { "default" }
                .to_string(),
        },
        ConfigRow {
            key: "request_interval".to_string(),
            value: settings.yt.request_interval.to_string(),
            source: file_source.to_string(),
        },
        ConfigRow {
            key: "quota_usage".to_string(),
            value: settings.yt.quota_usage.to_string(),
            source: file_source.to_string(),
        },
        ConfigRow {
            key: "api_key".to_string(),
            value: mask_token(&settings.yt.api_key),
            source: file_source.to_string(),
        },
        ConfigRow {
            key: "use_provider_interval".to_string(),
            value: settings.yt.use_provider_interval.to_string(),
            source: file_source.to_string(),
        },
    ])
}

fn parse_interval(value: &str) -> Result<u64> {
    let interval: u64 = match value.trim().parse() {
        Ok(v) => v,
        Err(_) => bail!("request_interval must be a number of milliseconds, got '{}'", value),
    };
    if interval < MIN_INTERVAL_MS {
        bail!("request_interval must be at least {}ms", MIN_INTERVAL_MS);
    }
    Ok(interval)
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => bail!("expected true or false, got '{}'", value),
    }
}

fn mask_token(token: &Option<String>) -> String {
    match token {
        Some(t) if !t.trim().is_empty() => "****".to_string(),
        _ => "-".to_string(),
    }
}
