//! Shared helpers for unit tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

use super::fetcher::{FetchError, Fetcher};

/// Replays scripted replies and records requested URLs
#[derive(Default)]
pub struct ScriptedFetcher {
    replies: Mutex<VecDeque<Result<String, FetchError>>>,
    urls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new(replies: Vec<Result<String, FetchError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            urls: Mutex::new(Vec::new()),
        })
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        self.urls.lock().unwrap().push(url.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(FetchError::Transport {
                    status: None,
                    message: "no scripted reply".to_string(),
                    body: None,
                })
            })
    }
}

/// 2024-01-01T00:00:{secs}
pub fn ts(secs: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, secs).unwrap()
}

fn stamp(secs: u32) -> String {
    format!("2024-01-01T00:00:{:02}.00Z", secs)
}

pub fn video_body(chat_id: &str) -> Result<String, FetchError> {
    Ok(json!({
        "items": [{ "liveStreamingDetails": { "activeLiveChatId": chat_id } }]
    })
    .to_string())
}

/// Message page with one item per timestamp, in the given order
pub fn page_body(token: &str, stamps: &[u32]) -> Result<String, FetchError> {
    let items: Vec<_> = stamps
        .iter()
        .map(|s| {
            json!({
                "snippet": {
                    "publishedAt": stamp(*s),
                    "textMessageDetails": { "messageText": format!("msg {}", s) }
                },
                "authorDetails": { "displayName": format!("user{}", s) }
            })
        })
        .collect();
    Ok(json!({
        "nextPageToken": token,
        "pollingIntervalMillis": 1500,
        "items": items
    })
    .to_string())
}

pub fn error_body(message: &str) -> Result<String, FetchError> {
    Ok(json!({ "error": { "errors": [{ "message": message }] } }).to_string())
}

pub fn transport_error() -> Result<String, FetchError> {
    Err(FetchError::Transport {
        status: None,
        message: "Connection failed".to_string(),
        body: None,
    })
}
