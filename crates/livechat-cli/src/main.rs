//! livechat CLI - follow a YouTube livestream chat from the terminal
//!
//! Connects to a livestream's chat, polls it on a timer and prints new
//! messages. Quota usage and the request interval persist between runs.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use livechat_core::{SettingsStore, CONFIG_PATH_ENV};

#[derive(Parser)]
#[command(name = "livechat")]
#[command(author, version, about = "Livestream chat polling CLI", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format: table (default) or json
    #[arg(long, global = true, default_value = "table")]
    format: output::OutputFormat,

    /// Suppress progress messages
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Override settings file path (or set LIVECHAT_CONFIG_PATH env var)
    #[arg(long, env = "LIVECHAT_CONFIG_PATH", global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to a livestream chat and print new messages
    Watch(commands::watch::WatchArgs),

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },

    /// Show or reset quota usage
    Quota {
        #[command(subcommand)]
        action: commands::quota::QuotaAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // Set up settings path if provided
    if let Some(config_path) = &cli.config {
        std::env::set_var(CONFIG_PATH_ENV, config_path);
    }

    let store = SettingsStore::new()?;

    // Create context for commands
    let ctx = commands::Context {
        store,
        format: cli.format,
        quiet: cli.quiet,
    };

    // Execute command
    match cli.command {
        Commands::Watch(args) => commands::watch::execute(&ctx, args).await,
        Commands::Config { action } => commands::config::execute(&ctx, action).await,
        Commands::Quota { action } => commands::quota::execute(&ctx, action).await,
    }
}
