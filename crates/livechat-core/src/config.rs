//! Persisted settings
//!
//! Settings live in a small JSON document under the `YT` namespace:
//!
//! ```json
//! { "YT": { "requestInterval": 3000, "quotaUsage": 0, "useProviderInterval": false } }
//! ```
//!
//! The file is read once at startup and written back at shutdown. Missing
//! files and missing keys fall back to defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable overriding the settings file location
pub const CONFIG_PATH_ENV: &str = "LIVECHAT_CONFIG_PATH";

/// Default delay between scheduled polls, in milliseconds
pub const DEFAULT_REQUEST_INTERVAL_MS: u64 = 3000;

/// Settings stored under the `YT` key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct YoutubeSettings {
    /// Milliseconds between scheduled polls
    pub request_interval: u64,
    /// Quota points consumed so far
    pub quota_usage: u64,
    /// Saved API key, used when none is passed explicitly
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Follow the provider's suggested polling interval instead of the manual one
    pub use_provider_interval: bool,
}

impl Default for YoutubeSettings {
    fn default() -> Self {
        Self {
            request_interval: DEFAULT_REQUEST_INTERVAL_MS,
            quota_usage: 0,
            api_key: None,
            use_provider_interval: false,
        }
    }
}

impl YoutubeSettings {
    /// The saved API key, ignoring blank values
    pub fn saved_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

/// Root settings document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "YT", default)]
    pub yt: YoutubeSettings,
}

/// Reads and writes the settings file
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Store at the default location (env override or platform config dir)
    pub fn new() -> Result<Self> {
        Ok(Self::open(get_settings_path()?))
    }

    /// Store at an explicit path
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, using defaults when the file does not exist yet
    pub fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            log::debug!(
                "[config] No settings file at {}, using defaults",
                self.path.display()
            );
            return Ok(Settings::default());
        }

        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Settings::default());
        }

        let settings: Settings = serde_json::from_str(&content)?;
        log::debug!("[config] Loaded settings from {}", self.path.display());
        Ok(settings)
    }

    /// Write settings, creating the parent directory if needed
    pub fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, json)?;
        log::info!("[config] Saved settings to {}", self.path.display());
        Ok(())
    }
}

/// Resolve the settings file path
pub fn get_settings_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }

    let dirs = directories::ProjectDirs::from("com", "livechat", "LiveChat")
        .ok_or_else(|| Error::config("Could not determine project directories"))?;

    Ok(dirs.config_dir().join("settings.json"))
}
