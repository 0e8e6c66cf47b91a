use axum::body::Body;
use axum::http::{Request, StatusCode};
use async_trait::async_trait;
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use vidchain::adapters::http::{api_router, ApiState};
use vidchain::adapters::memory::{MemoryBroker, MemoryStateStore};
use vidchain::ports::broker::{EventPublisher, EventSubscriber};
use vidchain::ports::state::StateStore;
use vidchain::PortError;

/// Publisher and store whose backend is unreachable.
struct Unreachable;

#[async_trait]
impl EventPublisher for Unreachable {
    async fn publish(&self, _topic: &str, _payload: String) -> Result<(), PortError> {
        Err("connection refused".into())
    }
}

#[async_trait]
impl StateStore for Unreachable {
    async fn save_state(&self, _key: &str, _value: String) -> Result<(), PortError> {
        Err("connection refused".into())
    }

    async fn get_state(&self, _key: &str) -> Result<Option<String>, PortError> {
        Err("connection refused".into())
    }

    async fn delete_state(&self, _key: &str) -> Result<(), PortError> {
        Err("connection refused".into())
    }
}

fn unreachable_app() -> Router {
    api_router(ApiState::new(
        Arc::new(Unreachable),
        "video-recorded",
        Arc::new(Unreachable),
    ))
}

fn app() -> (Router, MemoryBroker) {
    let broker = MemoryBroker::default();
    let state = ApiState::new(
        Arc::new(broker.clone()),
        "video-recorded",
        Arc::new(MemoryStateStore::new()),
    );
    (api_router(state), broker)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::String(
        String::from_utf8_lossy(&bytes).into_owned(),
    ));
    (status, value)
}

#[tokio::test]
async fn health_check() {
    let (app, _) = app();
    assert_eq!(
        send(&app, "GET", "/health", None).await,
        (StatusCode::OK, json!("healthy"))
    );
}

#[tokio::test]
async fn marker_set_then_get() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        "POST",
        "/videos/abc/markers",
        Some(r#"{"lessonIndex":3,"lessonSlug":"intro"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body,
        json!({"message": "Video recording marker has successfully been set"})
    );

    let (status, body) = send(&app, "GET", "/videos/abc/markers", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"lessonIndex": 3, "lessonSlug": "intro"}));
}

#[tokio::test]
async fn unknown_marker_is_not_found() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/videos/unknown/markers", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Video recording marker not found"}));
}

#[tokio::test]
async fn marker_overwrite_and_delete() {
    let (app, _) = app();
    send(&app, "POST", "/videos/abc/markers", Some(r#"{"lessonIndex":1,"lessonSlug":"a"}"#)).await;
    send(&app, "POST", "/videos/abc/markers", Some(r#"{"lessonIndex":2,"lessonSlug":"b"}"#)).await;
    let (_, body) = send(&app, "GET", "/videos/abc/markers", None).await;
    assert_eq!(body, json!({"lessonIndex": 2, "lessonSlug": "b"}));

    for _ in 0..2 {
        let (status, body) = send(&app, "DELETE", "/videos/abc/markers", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"message": "Video recording marker has successfully been deleted"})
        );
    }
    let (status, _) = send(&app, "GET", "/videos/abc/markers", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_marker_is_bad_request() {
    let (app, _) = app();
    let (status, body) = send(&app, "POST", "/videos/abc/markers", Some(r#"{"lessonIndex":"three"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn record_publishes_to_entry_topic() {
    let (app, broker) = app();
    let (status, body) = send(
        &app,
        "POST",
        "/videos/record",
        Some(r#"{"title":"intro","path":"/videos/chunks","extension":"webm","slug":"lesson"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"message": "Video recorded event has successfully been sent"})
    );

    let delivery = broker
        .receive("video-recorded", Duration::from_millis(100))
        .await
        .unwrap()
        .expect("published event");
    let event: Value = serde_json::from_str(&delivery.payload).unwrap();
    assert_eq!(event["title"], "intro");
    assert_eq!(event["slug"], "lesson");
}

#[tokio::test]
async fn record_rejects_undecodable_body() {
    let (app, broker) = app();
    let (status, body) = send(&app, "POST", "/videos/record", Some("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert_eq!(broker.pending("video-recorded").await, 0);
}

#[tokio::test]
async fn record_is_not_validated_beyond_decoding() {
    let (app, broker) = app();
    let (status, _) = send(
        &app,
        "POST",
        "/videos/record",
        Some(r#"{"title":"../intro","path":"/videos","extension":"webm"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(broker.pending("video-recorded").await, 1);
}

#[tokio::test]
async fn publish_failure_is_server_error() {
    let app = unreachable_app();
    let (status, body) = send(
        &app,
        "POST",
        "/videos/record",
        Some(r#"{"title":"intro","path":"/videos","extension":"webm"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn marker_store_failure_is_server_error() {
    let app = unreachable_app();
    let requests = [
        ("POST", Some(r#"{"lessonIndex":3,"lessonSlug":"intro"}"#)),
        ("GET", None),
        ("DELETE", None),
    ];
    for (method, body) in requests {
        let (status, response) = send(&app, method, "/videos/abc/markers", body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{}", method);
        assert!(response["error"].is_string(), "{}", method);
    }
}
