// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: bridge auth over real loopback HTTP. No token and wrong
//! token are 401; the right token lands the chunk on the event bus.

use super::prelude::{harness, wait_for_prompts};
use maestro_core::{Event, Topic};
use maestro_daemon::bridge::{Bridge, BridgeState, ChunkSink};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn bridge_rejects_bad_tokens_and_routes_good_chunks() {
    let fx = harness();
    let mut task_events = fx.bus.subscribe(Topic::Task);

    let state = BridgeState::new(
        "spec-token",
        Arc::new(Arc::clone(&fx.manager)) as Arc<dyn ChunkSink>,
        fx.bus.clone(),
        Duration::from_secs(2),
        Arc::new(|| 0),
    );
    let handle = Bridge::start(0, state).await.expect("bridge");
    let url = format!("{}/v1/stream/chunk", handle.url);
    let client = reqwest::Client::new();

    // A running task to route the chunk to.
    let started = fx
        .orchestrator
        .dispatch(
            "task_start",
            serde_json::json!({ "kind": "worker", "workerId": "coder", "task": "go" }),
        )
        .await;
    let task_id = started["taskId"].as_str().expect("taskId").to_string();
    wait_for_prompts(&fx.backend, 1).await;

    let body = serde_json::json!({
        "worker_id": "coder",
        "job_id": task_id,
        "chunk": "streamed over http",
        "final": true
    });

    // No token.
    let response = client.post(&url).json(&body).send().await.expect("send");
    assert_eq!(response.status().as_u16(), 401);

    // Wrong token.
    let response = client
        .post(&url)
        .bearer_auth("wrong-token")
        .json(&body)
        .send()
        .await
        .expect("send");
    assert_eq!(response.status().as_u16(), 401);

    // Correct token: 200 and the chunk appears on the bus.
    let response = client
        .post(&url)
        .bearer_auth("spec-token")
        .json(&body)
        .send()
        .await
        .expect("send");
    assert_eq!(response.status().as_u16(), 200);

    let chunk_event = loop {
        let event = tokio::time::timeout(Duration::from_secs(1), task_events.recv())
            .await
            .expect("event");
        if let Event::TaskChunk { chunk, .. } = event {
            break chunk;
        }
    };
    assert_eq!(chunk_event, "streamed over http");

    let awaited = fx
        .orchestrator
        .dispatch(
            "task_await",
            serde_json::json!({ "taskId": task_id, "timeoutMs": 2000 }),
        )
        .await;
    assert_eq!(awaited["tasks"][0]["status"], "completed");
    assert_eq!(awaited["tasks"][0]["response"], "streamed over http");

    handle.shutdown();
}
