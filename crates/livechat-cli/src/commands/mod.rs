//! CLI commands module
//!
//! Contains all CLI command implementations.

pub mod config;
pub mod quota;
pub mod watch;

use crate::output::OutputFormat;
use livechat_core::SettingsStore;

/// Shared context for all commands
pub struct Context {
    pub store: SettingsStore,
    pub format: OutputFormat,
    pub quiet: bool,
}
