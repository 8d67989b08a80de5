//! HTTP fetcher
//!
//! Performs a single GET and hands back the raw body. Retry policy belongs
//! to the caller; a failed poll simply waits for the next scheduled tick.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use thiserror::Error;

/// HTTP request timeout in seconds
pub const REQUEST_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// Error Types
// ============================================================================

/// Why a GET did not produce a body
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connection, DNS or non-2xx failure
    ///
    /// `body` keeps the response text of non-2xx replies so an embedded
    /// provider error can still be classified.
    #[error("{} - {message}", status_label(.status))]
    Transport {
        status: Option<u16>,
        message: String,
        body: Option<String>,
    },

    /// Caller misuse, e.g. a malformed URL
    #[error("Invalid operation, {message}")]
    InvalidState { message: String },

    /// Timed out or cancelled
    #[error("The request was canceled, {message}")]
    Cancelled { message: String },
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("HTTP {}", code),
        None => "No status".to_string(),
    }
}

impl FetchError {
    /// Response body of a non-2xx reply, if any
    pub fn body(&self) -> Option<&str> {
        match self {
            FetchError::Transport { body, .. } => body.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Cancelled {
                message: "request timed out".to_string(),
            }
        } else if err.is_builder() {
            FetchError::InvalidState {
                message: err.to_string(),
            }
        } else if err.is_connect() {
            FetchError::Transport {
                status: None,
                message: "Connection failed".to_string(),
                body: None,
            }
        } else {
            FetchError::Transport {
                status: err.status().map(|s| s.as_u16()),
                message: err.to_string(),
                body: None,
            }
        }
    }
}

// ============================================================================
// Fetcher Trait
// ============================================================================

/// Something that can GET a URL and return its body
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<String, FetchError>;
}

/// reqwest-backed [`Fetcher`]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidState {
            message: format!("malformed URL: {}", e),
        })?;

        // The query string carries the API key, keep it out of the logs
        log::debug!("[chat:fetch] GET {}", parsed.path());

        let response = self.client.get(parsed).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.ok().filter(|b| !b.is_empty());
            log::warn!("[chat:fetch] Request failed: HTTP {}", status);
            return Err(FetchError::Transport {
                status: Some(status.as_u16()),
                message: status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string(),
                body,
            });
        }

        Ok(response.text().await?)
    }
}
