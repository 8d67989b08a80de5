//! Integration tests for the chat pipeline against a mocked provider

use std::sync::Arc;
use std::time::Duration;

use livechat_core::{
    ApiEndpoints, ChatError, ChatEvent, ChatSessionManager, EventBus, FetchError, Fetcher,
    HttpFetcher, PollOutcome, QuotaTracker, SessionCoordinator, Settings, SettingsStore,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::broadcast;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn message(author: &str, text: &str, published_at: &str) -> Value {
    json!({
        "snippet": {
            "publishedAt": published_at,
            "displayMessage": text
        },
        "authorDetails": { "displayName": author }
    })
}

fn page(token: &str, items: Vec<Value>) -> Value {
    json!({
        "nextPageToken": token,
        "pollingIntervalMillis": 2000,
        "items": items
    })
}

fn provider_error(message: &str) -> Value {
    json!({
        "error": {
            "code": 403,
            "message": message,
            "errors": [{ "message": message, "domain": "youtube.liveChat" }]
        }
    })
}

/// Mock the stream lookup and the first (baseline) page
async fn mount_connect(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/videos"))
        .and(query_param("id", "abc123"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "liveStreamingDetails": { "activeLiveChatId": "chat789" } }]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/liveChat/messages"))
        .and(query_param("liveChatId", "chat789"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            "tokA",
            vec![message("alice", "hello", "2024-01-01T00:00:01.000Z")],
        )))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

async fn connected_manager(server: &MockServer) -> (ChatSessionManager, QuotaTracker, EventBus) {
    mount_connect(server).await;

    let quota = QuotaTracker::new();
    let bus = EventBus::new();
    let manager = ChatSessionManager::new(Arc::new(HttpFetcher::new()), quota.clone(), bus.clone())
        .with_endpoints(ApiEndpoints::new(server.uri()));

    manager
        .connect("abc123", "test-key")
        .await
        .expect("connect should succeed");
    (manager, quota, bus)
}

fn drain(rx: &mut broadcast::Receiver<ChatEvent>) -> Vec<ChatEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ============================================================================
// Happy Path
// ============================================================================

#[tokio::test]
async fn test_poll_delivers_only_new_messages() {
    let server = MockServer::start().await;
    let (manager, quota, bus) = connected_manager(&server).await;
    let mut rx = bus.subscribe();

    Mock::given(method("GET"))
        .and(path("/liveChat/messages"))
        .and(query_param("pageToken", "tokA"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            "tokB",
            vec![
                message("alice", "hello", "2024-01-01T00:00:01.000Z"),
                message("bob", "hi there", "2024-01-01T00:00:02.000Z"),
                message("carol", "o/", "2024-01-01T00:00:03.000Z"),
            ],
        )))
        .mount(&server)
        .await;

    let outcome = manager.poll().await.unwrap();
    assert_eq!(outcome, PollOutcome::Delivered(2));
    assert_eq!(manager.page_token().await, "tokB");
    assert_eq!(quota.usage(), 11);

    let events = drain(&mut rx);
    assert!(events.contains(&ChatEvent::SuggestedInterval(2000)));
    let batch = events
        .into_iter()
        .find_map(|e| match e {
            ChatEvent::Messages(batch) => Some(batch),
            _ => None,
        })
        .expect("a message batch");
    let authors: Vec<_> = batch.iter().map(|m| m.author.as_str()).collect();
    assert_eq!(authors, vec!["carol", "bob"]);
}

#[tokio::test]
async fn test_coordinator_end_to_end_persists_quota() {
    let server = MockServer::start().await;
    mount_connect(&server).await;
    Mock::given(method("GET"))
        .and(path("/liveChat/messages"))
        .and(query_param("pageToken", "tokA"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            "tokB",
            vec![message("bob", "hi there", "2024-01-01T00:00:02.000Z")],
        )))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = SettingsStore::open(dir.path().join("settings.json"));
    let coordinator = SessionCoordinator::from_store(store.clone())
        .unwrap()
        .with_endpoints(ApiEndpoints::new(server.uri()));
    let mut rx = coordinator.subscribe();

    coordinator
        .connect_to_livestream_chat("abc123", "test-key")
        .await
        .unwrap();
    coordinator.request_poll();

    let batch = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(ChatEvent::Messages(batch)) = rx.recv().await {
                return batch;
            }
        }
    })
    .await
    .expect("batch within timeout");
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].text, "hi there");

    coordinator.shutdown().await.unwrap();
    let saved: Settings = store.load().unwrap();
    assert_eq!(saved.yt.quota_usage, 11);
    assert_eq!(saved.yt.request_interval, 3000);
}

// ============================================================================
// Provider Errors
// ============================================================================

#[tokio::test]
async fn test_quota_exceeded_is_reported() {
    let server = MockServer::start().await;
    let (manager, quota, bus) = connected_manager(&server).await;
    let mut rx = bus.subscribe();

    Mock::given(method("GET"))
        .and(path("/liveChat/messages"))
        .and(query_param("pageToken", "tokA"))
        .respond_with(ResponseTemplate::new(403).set_body_json(provider_error(
            "The request cannot be completed because you have exceeded your quota.",
        )))
        .mount(&server)
        .await;

    let result = manager.poll().await;
    assert!(matches!(result, Err(ChatError::Provider(ref m)) if m.contains("exceeded your quota")));
    assert_eq!(quota.usage(), 11);

    let events = drain(&mut rx);
    assert!(matches!(&events[0], ChatEvent::Feedback(m) if m.starts_with("Error, cause - ")));
    assert_eq!(events[1], ChatEvent::Messages(Vec::new()));

    // Token untouched, the next tick retries the same page
    assert_eq!(manager.page_token().await, "tokA");
}

#[tokio::test]
async fn test_too_soon_is_absorbed() {
    let server = MockServer::start().await;
    let (manager, _quota, bus) = connected_manager(&server).await;
    let mut rx = bus.subscribe();

    Mock::given(method("GET"))
        .and(path("/liveChat/messages"))
        .and(query_param("pageToken", "tokA"))
        .respond_with(ResponseTemplate::new(403).set_body_json(provider_error(
            "The request was sent too soon after the previous one.",
        )))
        .mount(&server)
        .await;

    assert_eq!(manager.poll().await, Ok(PollOutcome::Throttled));
    let events = drain(&mut rx);
    assert_eq!(events, vec![ChatEvent::Messages(Vec::new())]);
}

#[tokio::test]
async fn test_server_error_without_body() {
    let server = MockServer::start().await;
    let (manager, _quota, _bus) = connected_manager(&server).await;

    Mock::given(method("GET"))
        .and(path("/liveChat/messages"))
        .and(query_param("pageToken", "tokA"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = manager.poll().await;
    assert!(matches!(
        result,
        Err(ChatError::Fetch(FetchError::Transport { status: Some(500), .. }))
    ));
}

#[tokio::test]
async fn test_offline_stream_has_no_chat() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/videos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&server)
        .await;

    let quota = QuotaTracker::new();
    let fetcher = Arc::new(HttpFetcher::new());
    let manager = ChatSessionManager::new(fetcher, quota.clone(), EventBus::new())
        .with_endpoints(ApiEndpoints::new(server.uri()));

    let result = manager.connect("offline", "test-key").await;
    assert_eq!(result, Err(ChatError::NoActiveChat));
    assert_eq!(quota.usage(), 1);
}

// ============================================================================
// Fetcher
// ============================================================================

#[tokio::test]
async fn test_slow_response_is_cancelled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{}")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::with_timeout(Duration::from_millis(200));
    let result = fetcher.get(&format!("{}/slow", server.uri())).await;
    assert!(matches!(result, Err(FetchError::Cancelled { .. })));
}

#[tokio::test]
async fn test_error_body_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/denied"))
        .respond_with(ResponseTemplate::new(403).set_body_string("nope"))
        .mount(&server)
        .await;

    let result = HttpFetcher::new()
        .get(&format!("{}/denied", server.uri()))
        .await;
    match result {
        Err(err @ FetchError::Transport { .. }) => {
            assert_eq!(err.body(), Some("nope"));
            assert_eq!(err.to_string(), "HTTP 403 - Forbidden");
        }
        other => panic!("expected transport error, got {:?}", other),
    }
}
