//! Ingest and marker API.

use super::error::ApiError;
use super::health;
use crate::application::ingest::IngestService;
use crate::application::markers::MarkerService;
use crate::application::stage::Downstream;
use crate::domain::markers::RecordingMarker;
use crate::domain::video::RecordedVideo;
use crate::ports::broker::EventPublisher;
use crate::ports::state::StateStore;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct ApiState {
    ingest: Arc<IngestService<Arc<dyn EventPublisher>>>,
    markers: Arc<MarkerService<Arc<dyn StateStore>>>,
}

impl ApiState {
    pub fn new(
        publisher: Arc<dyn EventPublisher>,
        entry_topic: impl Into<String>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            ingest: Arc::new(IngestService::new(Downstream::new(publisher, entry_topic))),
            markers: Arc::new(MarkerService::new(store)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: &'static str,
}

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/videos/record", post(record_video))
        .route(
            "/videos/:slug/markers",
            post(set_marker).get(get_marker).delete(delete_marker),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn record_video(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<MessageBody>, ApiError> {
    let video: RecordedVideo = serde_json::from_slice(&body).map_err(ApiError::bad_request)?;
    info!(title = %video.title, "video recorded");

    state.ingest.record(&video).await.map_err(ApiError::internal)?;
    Ok(Json(MessageBody {
        message: "Video recorded event has successfully been sent",
    }))
}

async fn set_marker(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<MessageBody>), ApiError> {
    let marker: RecordingMarker = serde_json::from_slice(&body).map_err(ApiError::bad_request)?;
    state.markers.set(&slug, &marker).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageBody {
            message: "Video recording marker has successfully been set",
        }),
    ))
}

async fn get_marker(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
) -> Result<Json<RecordingMarker>, ApiError> {
    Ok(Json(state.markers.get(&slug).await?))
}

async fn delete_marker(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
) -> Result<Json<MessageBody>, ApiError> {
    state.markers.delete(&slug).await?;
    Ok(Json(MessageBody {
        message: "Video recording marker has successfully been deleted",
    }))
}
