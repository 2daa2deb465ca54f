//! Episode sources
//!
//! Where the refresh pipeline gets episode listings from.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::FetchError;
use crate::models::{Episode, FeedSource};

/// Produces the current episode listing of a feed.
#[async_trait]
pub trait EpisodeSource: Send + Sync {
    async fn fetch_episodes(&self, feed: &FeedSource) -> Result<Vec<Episode>, FetchError>;
}

// == HTTP Source ==
/// Fetches a JSON array of episodes from the feed URL.
#[derive(Debug, Clone, Default)]
pub struct HttpEpisodeSource {
    client: Client,
}

impl HttpEpisodeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a preconfigured client (timeouts, proxies, headers).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EpisodeSource for HttpEpisodeSource {
    async fn fetch_episodes(&self, feed: &FeedSource) -> Result<Vec<Episode>, FetchError> {
        debug!("GET {} for feed '{}'", feed.url, feed.id);

        let response = self
            .client
            .get(&feed.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchError::Network(e.to_string()))?;

        response.json::<Vec<Episode>>().await.map_err(|e| {
            if e.is_decode() {
                FetchError::Parse(e.to_string())
            } else {
                FetchError::Network(e.to_string())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Json, Router};
    use tokio::net::TcpListener;

    /// Serves a tiny feed host on an ephemeral port, returns its base URL.
    async fn serve_feeds() -> String {
        let app = Router::new()
            .route(
                "/ok.json",
                get(|| async {
                    Json(vec![
                        Episode::new("ep-1", "Pilot"),
                        Episode::new("ep-2", "Second"),
                    ])
                }),
            )
            .route("/garbage.json", get(|| async { "<rss>not json</rss>" }))
            .route(
                "/broken.json",
                get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_fetches_json_listing() {
        let base = serve_feeds().await;
        let source = HttpEpisodeSource::new();

        let episodes = source
            .fetch_episodes(&FeedSource::new("ok", format!("{}/ok.json", base)))
            .await
            .unwrap();

        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].guid, "ep-1");
    }

    #[tokio::test]
    async fn test_undecodable_body_is_parse_error() {
        let base = serve_feeds().await;
        let source = HttpEpisodeSource::new();

        let result = source
            .fetch_episodes(&FeedSource::new("bad", format!("{}/garbage.json", base)))
            .await;

        assert!(matches!(result, Err(FetchError::Parse(_))));
    }

    #[tokio::test]
    async fn test_error_status_is_network_error() {
        let base = serve_feeds().await;
        let source = HttpEpisodeSource::new();

        let result = source
            .fetch_episodes(&FeedSource::new("broken", format!("{}/broken.json", base)))
            .await;

        assert!(matches!(result, Err(FetchError::Network(_))));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        // Bind then drop to get a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let source = HttpEpisodeSource::new();
        let result = source
            .fetch_episodes(&FeedSource::new("gone", format!("http://{}/feed.json", addr)))
            .await;

        assert!(matches!(result, Err(FetchError::Network(_))));
    }
}
