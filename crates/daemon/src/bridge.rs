// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bridge server: the loopback HTTP endpoint workers call back into.
//!
//! Two routes, both token-gated: `POST /v1/stream/chunk` feeds streamed
//! output to the task manager, `POST /v1/events` validates skill
//! telemetry into typed events for the bus. Payloads are parsed and
//! validated here, once; nothing downstream inspects dynamic JSON.

use crate::event_bus::EventBus;
use async_trait::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use maestro_core::{Event, ProfileId};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Default per-request deadline, overridable via `ORCH_BRIDGE_TIMEOUT_MS`.
pub const BRIDGE_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Length of the generated bearer token.
const TOKEN_LEN: usize = 48;

/// Generate a fresh per-process bridge token.
pub fn generate_token() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Constant-time byte comparison for token checks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Consumer of streamed chunks (the task manager, in production).
#[async_trait]
pub trait ChunkSink: Send + Sync + 'static {
    async fn ingest_chunk(&self, worker_id: &str, job_id: Option<&str>, chunk: String, last: bool);
}

#[async_trait]
impl<B, S, C, G> ChunkSink for Arc<maestro_engine::TaskManager<B, S, C, G>>
where
    B: maestro_adapters::WorkerBackend,
    S: maestro_engine::CatalogSource,
    C: maestro_core::Clock,
    G: maestro_core::IdGen + Send + Sync + 'static,
{
    async fn ingest_chunk(&self, worker_id: &str, job_id: Option<&str>, chunk: String, last: bool) {
        maestro_engine::TaskManager::ingest_chunk(self, worker_id, job_id, chunk, last).await;
    }
}

/// Shared state for the bridge routes.
#[derive(Clone)]
pub struct BridgeState {
    token: Arc<String>,
    sink: Arc<dyn ChunkSink>,
    bus: EventBus,
    timeout: Duration,
    now_ms: Arc<dyn Fn() -> u64 + Send + Sync>,
}

impl BridgeState {
    pub fn new(
        token: impl Into<String>,
        sink: Arc<dyn ChunkSink>,
        bus: EventBus,
        timeout: Duration,
        now_ms: Arc<dyn Fn() -> u64 + Send + Sync>,
    ) -> Self {
        Self {
            token: Arc::new(token.into()),
            sink,
            bus,
            timeout,
            now_ms,
        }
    }
}

/// `POST /v1/stream/chunk` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkBody {
    pub worker_id: String,
    #[serde(default)]
    pub job_id: Option<String>,
    pub chunk: String,
    #[serde(default, rename = "final")]
    pub is_final: bool,
    #[serde(default)]
    pub timestamp: Option<u64>,
}

/// `POST /v1/events` body: a typed skill event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    pub worker_id: String,
    pub skill: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub request: Option<String>,
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn require_bearer(
    State(state): State<BridgeState>,
    request: axum::extract::Request,
    next: Next,
) -> Response {
    let authorized = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| constant_time_eq(token.as_bytes(), state.token.as_bytes()))
        .unwrap_or(false);
    if !authorized {
        return error_body(StatusCode::UNAUTHORIZED, "unauthorized");
    }
    next.run(request).await
}

async fn post_chunk(
    State(state): State<BridgeState>,
    body: Result<Json<ChunkBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return error_body(StatusCode::BAD_REQUEST, &rejection.to_string()),
    };

    let handled = tokio::time::timeout(state.timeout, async {
        state
            .sink
            .ingest_chunk(
                &body.worker_id,
                body.job_id.as_deref(),
                body.chunk,
                body.is_final,
            )
            .await;
    })
    .await;

    match handled {
        Ok(()) => StatusCode::OK.into_response(),
        Err(_) => error_body(StatusCode::REQUEST_TIMEOUT, "chunk delivery timed out"),
    }
}

async fn post_event(
    State(state): State<BridgeState>,
    body: Result<Json<EventBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return error_body(StatusCode::BAD_REQUEST, &rejection.to_string()),
    };

    let at_ms = (state.now_ms)();
    let worker_id = ProfileId::new(body.data.worker_id.clone());
    let event = match body.kind.as_str() {
        "skill:load:started" => Event::SkillLoadStarted {
            worker_id,
            skill: body.data.skill,
            at_ms,
        },
        "skill:load:completed" => Event::SkillLoadCompleted {
            worker_id,
            skill: body.data.skill,
            at_ms,
        },
        "skill:load:failed" => Event::SkillLoadFailed {
            worker_id,
            skill: body.data.skill,
            error: body.data.error.unwrap_or_default(),
            at_ms,
        },
        "skill:permission" => Event::SkillPermission {
            worker_id,
            skill: body.data.skill,
            request: body.data.request.unwrap_or_default(),
            at_ms,
        },
        other => {
            return error_body(
                StatusCode::BAD_REQUEST,
                &format!("unknown event type: {}", other),
            )
        }
    };

    state.bus.publish(event);
    StatusCode::OK.into_response()
}

/// Build the bridge router.
pub fn router(state: BridgeState) -> Router {
    Router::new()
        .route("/v1/stream/chunk", post(post_chunk))
        .route("/v1/events", post(post_event))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer,
        ))
        .with_state(state)
}

/// A running bridge server.
pub struct BridgeHandle {
    pub port: u16,
    pub url: String,
    shutdown: Arc<Notify>,
}

impl BridgeHandle {
    /// Ask the server to stop accepting requests.
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

/// The bridge server: loopback only.
pub struct Bridge;

impl Bridge {
    /// Bind `127.0.0.1:<port>` (0 = OS-assigned) and serve in a
    /// background task.
    pub async fn start(port: u16, state: BridgeState) -> std::io::Result<BridgeHandle> {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let bound = listener.local_addr()?;
        let shutdown = Arc::new(Notify::new());
        let signal = Arc::clone(&shutdown);

        let app = router(state);
        tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    signal.notified().await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "bridge server exited with error");
            }
        });

        tracing::info!(port = bound.port(), "bridge listening on loopback");
        Ok(BridgeHandle {
            port: bound.port(),
            url: format!("http://127.0.0.1:{}", bound.port()),
            shutdown,
        })
    }
}

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;
