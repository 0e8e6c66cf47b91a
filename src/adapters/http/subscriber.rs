//! Push delivery: the broker POSTs each message to the stage and reads the
//! outcome from the response body.

use super::health;
use crate::application::stage::{dispatch, Stage};
use crate::domain::outcome::DeliveryStatus;
use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub status: DeliveryStatus,
}

/// Router serving `/health` and the stage's subscription route.
pub fn router<S: Stage>(stage: Arc<S>, route: &str) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(route, post(deliver::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(stage)
}

async fn deliver<S: Stage>(State(stage): State<Arc<S>>, body: Bytes) -> Json<StatusBody> {
    let payload = String::from_utf8_lossy(&body);
    let outcome = dispatch(stage.as_ref(), &payload).await;
    Json(StatusBody {
        status: outcome.status(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize)]
    struct Job {
        retry: bool,
    }

    struct JobStage;

    #[async_trait]
    impl Stage for JobStage {
        type Event = Job;
        const NAME: &'static str = "job";

        async fn process(&self, event: Job) -> Result<(), PipelineError> {
            if event.retry {
                return Err(PipelineError::io(
                    "/tmp/job",
                    std::io::Error::new(std::io::ErrorKind::Other, "busy"),
                ));
            }
            Ok(())
        }
    }

    async fn post_event(body: &str) -> (StatusCode, String) {
        let app = router(Arc::new(JobStage), "/events");
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/events")
                    .header("content-type", "application/cloudevents+json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_status_words() {
        assert_eq!(
            post_event(r#"{"retry": false}"#).await,
            (StatusCode::OK, r#"{"status":"SUCCESS"}"#.to_string())
        );
        assert_eq!(
            post_event(r#"{"specversion":"1.0","data":{"retry":true}}"#).await,
            (StatusCode::OK, r#"{"status":"RETRY"}"#.to_string())
        );
        assert_eq!(
            post_event("garbage").await,
            (StatusCode::OK, r#"{"status":"DROP"}"#.to_string())
        );
    }
}
