//! API Module
//!
//! HTTP handlers and routing for the operator REST API.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Coordinator and cache statistics
//! - `POST /refresh` - Run the refresh pipeline
//! - `GET /episodes/:feed_id` - Cached episodes of a feed
//! - `DELETE /episodes/:feed_id` - Clear one feed
//! - `DELETE /episodes` - Clear the cache

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
