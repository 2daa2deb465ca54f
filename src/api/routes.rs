//! API Routes
//!
//! Configures the Axum router with all operator endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_all_handler, clear_feed_handler, get_episodes_handler, health_handler,
    refresh_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Liveness check
/// - `GET /stats` - Coordinator and cache statistics
/// - `POST /refresh` - Run the refresh pipeline now
/// - `GET /episodes/:feed_id` - Cached listing of one feed
/// - `DELETE /episodes/:feed_id` - Drop one feed from the cache
/// - `DELETE /episodes` - Drop every cached feed
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/refresh", post(refresh_handler))
        .route("/episodes", delete(clear_all_handler))
        .route(
            "/episodes/:feed_id",
            get(get_episodes_handler).delete(clear_feed_handler),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
