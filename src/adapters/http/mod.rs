//! HTTP inbound adapters.
//!
//! - `api`: the ingest and marker API served by `video_server`
//! - `subscriber`: the push delivery route each stage exposes to its broker

pub mod api;
mod error;
pub mod subscriber;

pub use api::{router as api_router, ApiState};
pub use error::ApiError;
pub use subscriber::router as subscriber_router;

/// Liveness check shared by every process.
pub async fn health() -> &'static str {
    "healthy"
}
