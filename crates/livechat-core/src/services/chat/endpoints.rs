//! YouTube Data API endpoint URLs

use reqwest::Url;

use super::types::ChatError;
use crate::services::fetcher::FetchError;

/// Production API root
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Builds request URLs against a configurable API root
#[derive(Debug, Clone)]
pub struct ApiEndpoints {
    base_url: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ApiEndpoints {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `videos?part=liveStreamingDetails&key=..&id=..`
    pub fn videos_url(&self, api_key: &str, stream_id: &str) -> Result<String, ChatError> {
        self.build(
            "videos",
            &[
                ("part", "liveStreamingDetails"),
                ("key", api_key),
                ("id", stream_id),
            ],
        )
    }

    /// `liveChat/messages?part=snippet,authorDetails&key=..&liveChatId=..[&pageToken=..]`
    pub fn messages_url(
        &self,
        api_key: &str,
        chat_id: &str,
        page_token: Option<&str>,
    ) -> Result<String, ChatError> {
        let mut params = vec![
            ("part", "snippet,authorDetails"),
            ("key", api_key),
            ("liveChatId", chat_id),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }
        self.build("liveChat/messages", &params)
    }

    fn build(&self, path: &str, params: &[(&str, &str)]) -> Result<String, ChatError> {
        let raw = format!("{}/{}", self.base_url, path);
        Url::parse_with_params(&raw, params)
            .map(String::from)
            .map_err(|e| {
                ChatError::Fetch(FetchError::InvalidState {
                    message: format!("malformed URL {}: {}", raw, e),
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_pairs(url: &str) -> Vec<(String, String)> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn test_videos_url() {
        let url = ApiEndpoints::default().videos_url("KEY", "abc123").unwrap();
        assert!(url.starts_with("https://www.googleapis.com/youtube/v3/videos?"));
        let pairs = query_pairs(&url);
        assert!(pairs.contains(&("part".into(), "liveStreamingDetails".into())));
        assert!(pairs.contains(&("key".into(), "KEY".into())));
        assert!(pairs.contains(&("id".into(), "abc123".into())));
    }

    #[test]
    fn test_messages_url_with_and_without_token() {
        let endpoints = ApiEndpoints::new("http://localhost:1234/");

        let url = endpoints.messages_url("KEY", "chat789", None).unwrap();
        assert!(url.starts_with("http://localhost:1234/liveChat/messages?"));
        let pairs = query_pairs(&url);
        assert!(pairs.contains(&("part".into(), "snippet,authorDetails".into())));
        assert!(pairs.contains(&("liveChatId".into(), "chat789".into())));
        assert!(!pairs.iter().any(|(k, _)| k == "pageToken"));

        let url = endpoints.messages_url("KEY", "chat789", Some("tokA")).unwrap();
        assert!(query_pairs(&url).contains(&("pageToken".into(), "tokA".into())));
    }

    #[test]
    fn test_bad_base_url() {
        let result = ApiEndpoints::new("not a url").videos_url("KEY", "id");
        assert!(matches!(
            result,
            Err(ChatError::Fetch(FetchError::InvalidState { .. }))
        ));
    }
}
