//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use episode_cache::{
    api::create_router,
    error::FetchError,
    models::{Episode, FeedSource},
    refresh::EpisodeSource,
    AppState, ContentCache, FetchCoordinator,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

// == Helper Functions ==

/// Serves two episodes for "news", fails "offline", after an optional delay.
struct TestSource {
    delay: Duration,
}

#[async_trait]
impl EpisodeSource for TestSource {
    async fn fetch_episodes(&self, feed: &FeedSource) -> Result<Vec<Episode>, FetchError> {
        tokio::time::sleep(self.delay).await;
        match feed.id.as_str() {
            "news" => Ok(vec![
                Episode::new("news-1", "Morning briefing"),
                Episode::new("news-2", "Evening briefing"),
            ]),
            _ => Err(FetchError::Network("connection refused".to_string())),
        }
    }
}

struct TestApp {
    router: Router,
    state: AppState,
}

fn create_test_app_with(
    coordinator: FetchCoordinator,
    delay: Duration,
    ttl: Duration,
    budget: Duration,
) -> TestApp {
    let state = AppState::new(
        coordinator,
        Arc::new(ContentCache::in_memory(ttl, 1 << 20)),
        Arc::new(TestSource { delay }),
        vec![
            FeedSource::new("news", "https://feeds.test/news.json"),
            FeedSource::new("offline", "https://feeds.test/offline.json"),
        ],
        budget,
    );
    TestApp {
        router: create_router(state.clone()),
        state,
    }
}

fn create_test_app() -> TestApp {
    create_test_app_with(
        FetchCoordinator::new(5),
        Duration::ZERO,
        Duration::from_secs(300),
        Duration::from_secs(5),
    )
}

async fn send(router: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// == REFRESH Endpoint Tests ==

#[tokio::test]
async fn test_refresh_endpoint_reports_each_feed() {
    let app = create_test_app();

    let (status, json) = send(&app.router, "POST", "/refresh").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "partial");
    assert_eq!(json["refreshed"]["news"], 2);
    assert!(json["failed"]["offline"]
        .as_str()
        .unwrap()
        .contains("connection refused"));
}

#[tokio::test]
async fn test_refresh_endpoint_conflict_while_running() {
    let app = create_test_app_with(
        FetchCoordinator::new(5),
        Duration::from_millis(300),
        Duration::from_secs(300),
        Duration::from_secs(5),
    );

    let first = tokio::spawn({
        let router = app.router.clone();
        async move { send(&router, "POST", "/refresh").await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (status, json) = send(&app.router, "POST", "/refresh").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("refresh"));

    let (first_status, _) = first.await.unwrap();
    assert_eq!(first_status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_endpoint_unavailable_at_capacity() {
    let coordinator = FetchCoordinator::new(1);
    let gate = CancellationToken::new();
    let blocker = coordinator
        .start_fetch("manual-import", {
            let gate = gate.clone();
            move |_| async move {
                gate.cancelled().await;
                Ok(())
            }
        })
        .unwrap();

    let app = create_test_app_with(
        coordinator,
        Duration::ZERO,
        Duration::from_secs(300),
        Duration::from_secs(5),
    );

    let (status, _) = send(&app.router, "POST", "/refresh").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    gate.cancel();
    blocker.join().await.unwrap();
}

#[tokio::test]
async fn test_refresh_endpoint_gateway_timeout() {
    let app = create_test_app_with(
        FetchCoordinator::new(5),
        Duration::from_secs(10),
        Duration::from_secs(300),
        Duration::from_millis(100),
    );

    let (status, json) = send(&app.router, "POST", "/refresh").await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(json["error"].as_str().unwrap().contains("timed out"));

    // The timed-out run gave its key back
    assert!(!app.state.coordinator.is_active("refresh"));
}

// == EPISODES Endpoint Tests ==

#[tokio::test]
async fn test_get_episodes_after_refresh() {
    let app = create_test_app();
    send(&app.router, "POST", "/refresh").await;

    let (status, json) = send(&app.router, "GET", "/episodes/news").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["feed_id"], "news");
    assert_eq!(json["count"], 2);
    assert_eq!(json["episodes"][0]["guid"], "news-1");
}

#[tokio::test]
async fn test_get_episodes_not_found() {
    let app = create_test_app();

    let (status, json) = send(&app.router, "GET", "/episodes/news").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("news"));
}

#[tokio::test]
async fn test_get_episodes_after_ttl_expiry() {
    let app = create_test_app_with(
        FetchCoordinator::new(5),
        Duration::ZERO,
        Duration::from_secs(1),
        Duration::from_secs(5),
    );
    send(&app.router, "POST", "/refresh").await;

    let (status, _) = send(&app.router, "GET", "/episodes/news").await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let (status, _) = send(&app.router, "GET", "/episodes/news").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_feed_endpoint() {
    let app = create_test_app();
    send(&app.router, "POST", "/refresh").await;

    let (status, json) = send(&app.router, "DELETE", "/episodes/news").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["message"].as_str().unwrap().contains("news"));

    let (status, _) = send(&app.router, "GET", "/episodes/news").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_missing_feed_is_ok() {
    let app = create_test_app();

    let (status, _) = send(&app.router, "DELETE", "/episodes/never-cached").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_delete_all_endpoint() {
    let app = create_test_app();
    app.state
        .cache
        .store("extra", vec![Episode::new("x", "Extra")])
        .await;
    send(&app.router, "POST", "/refresh").await;

    let (status, _) = send(&app.router, "DELETE", "/episodes").await;
    assert_eq!(status, StatusCode::OK);

    for feed in ["news", "extra"] {
        let (status, _) = send(&app.router, "GET", &format!("/episodes/{}", feed)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

// == STATS Endpoint Tests ==

#[tokio::test]
async fn test_stats_endpoint() {
    let app = create_test_app();
    send(&app.router, "POST", "/refresh").await;
    send(&app.router, "GET", "/episodes/news").await;
    send(&app.router, "GET", "/episodes/offline").await;

    let (status, json) = send(&app.router, "GET", "/stats").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["coordinator"]["max_concurrent"], 5);
    assert_eq!(json["coordinator"]["active_count"], 0);
    assert_eq!(json["cache"]["hits"], 1);
    assert_eq!(json["cache"]["misses"], 1);
    assert_eq!(json["cache"]["total_entries"], 1);
    assert!((json["hit_rate"].as_f64().unwrap() - 0.5).abs() < 0.001);
}

// == HEALTH Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let (status, json) = send(&app.router, "GET", "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}
