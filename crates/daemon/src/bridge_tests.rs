// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use axum::body::Body;
use axum::http::{header, Request};
use maestro_core::Topic;
use parking_lot::Mutex;
use tower::ServiceExt;

#[derive(Default)]
struct RecordingSink {
    chunks: Mutex<Vec<(String, Option<String>, String, bool)>>,
}

#[async_trait]
impl ChunkSink for RecordingSink {
    async fn ingest_chunk(&self, worker_id: &str, job_id: Option<&str>, chunk: String, last: bool) {
        self.chunks.lock().push((
            worker_id.to_string(),
            job_id.map(str::to_string),
            chunk,
            last,
        ));
    }
}

struct Fixture {
    router: Router,
    sink: Arc<RecordingSink>,
    bus: EventBus,
}

fn fixture() -> Fixture {
    let sink = Arc::new(RecordingSink::default());
    let bus = EventBus::new();
    let state = BridgeState::new(
        "test-token",
        Arc::clone(&sink) as Arc<dyn ChunkSink>,
        bus.clone(),
        Duration::from_secs(2),
        Arc::new(|| 42),
    );
    Fixture {
        router: router(state),
        sink,
        bus,
    }
}

fn chunk_request(token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/v1/stream/chunk")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

fn event_request(token: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/events")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let fx = fixture();
    let response = fx
        .router
        .oneshot(chunk_request(
            None,
            r#"{"worker_id": "coder", "chunk": "x"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(fx.sink.chunks.lock().is_empty());
}

#[tokio::test]
async fn wrong_token_is_unauthorized() {
    let fx = fixture();
    let response = fx
        .router
        .oneshot(chunk_request(
            Some("wrong-token"),
            r#"{"worker_id": "coder", "chunk": "x"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn valid_chunk_reaches_the_sink() {
    let fx = fixture();
    let response = fx
        .router
        .oneshot(chunk_request(
            Some("test-token"),
            r#"{"worker_id": "coder", "job_id": "t-1", "chunk": "print(", "final": false}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let chunks = fx.sink.chunks.lock();
    assert_eq!(
        chunks.as_slice(),
        &[(
            "coder".to_string(),
            Some("t-1".to_string()),
            "print(".to_string(),
            false
        )]
    );
}

#[tokio::test]
async fn malformed_chunk_body_is_bad_request() {
    let fx = fixture();
    let response = fx
        .router
        .oneshot(chunk_request(Some("test-token"), r#"{"chunk": 42}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(fx.sink.chunks.lock().is_empty());
}

#[tokio::test]
async fn skill_event_lands_on_the_bus() {
    let fx = fixture();
    let mut sub = fx.bus.subscribe(Topic::Skill);
    let response = fx
        .router
        .oneshot(event_request(
            "test-token",
            r#"{"type": "skill:load:completed", "data": {"worker_id": "docs", "skill": "web.fetch"}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    match sub.recv().await {
        Event::SkillLoadCompleted {
            worker_id, skill, at_ms,
        } => {
            assert_eq!(worker_id, "docs");
            assert_eq!(skill, "web.fetch");
            assert_eq!(at_ms, 42);
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn unknown_event_type_is_bad_request() {
    let fx = fixture();
    let response = fx
        .router
        .oneshot(event_request(
            "test-token",
            r#"{"type": "worker:ready", "data": {"worker_id": "w", "skill": ""}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn skill_permission_carries_request_text() {
    let fx = fixture();
    let mut sub = fx.bus.subscribe(Topic::Skill);
    fx.router
        .oneshot(event_request(
            "test-token",
            r#"{"type": "skill:permission", "data": {"worker_id": "coder", "skill": "git.push", "request": "push to origin"}}"#,
        ))
        .await
        .unwrap();
    match sub.recv().await {
        Event::SkillPermission { request, .. } => assert_eq!(request, "push to origin"),
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn bridge_binds_loopback_and_serves() {
    let sink = Arc::new(RecordingSink::default());
    let state = BridgeState::new(
        "live-token",
        Arc::clone(&sink) as Arc<dyn ChunkSink>,
        EventBus::new(),
        Duration::from_secs(2),
        Arc::new(|| 1),
    );
    let handle = Bridge::start(0, state).await.unwrap();
    assert!(handle.port > 0);
    assert!(handle.url.starts_with("http://127.0.0.1:"));
    handle.shutdown();
}

#[test]
fn generated_tokens_are_long_and_unique() {
    let a = generate_token();
    let b = generate_token();
    assert_eq!(a.len(), 48);
    assert_ne!(a, b);
    assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
}

#[test]
fn constant_time_eq_basics() {
    assert!(constant_time_eq(b"abc", b"abc"));
    assert!(!constant_time_eq(b"abc", b"abd"));
    assert!(!constant_time_eq(b"abc", b"abcd"));
    assert!(constant_time_eq(b"", b""));
}
