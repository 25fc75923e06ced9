// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: cancel mid-stream. Chunks stay, later chunks are dropped,
//! the worker returns to ready.

use super::prelude::{harness, wait_for_prompts};
use maestro_core::{Event, Topic, WorkerStatus};
use std::time::Duration;

#[tokio::test]
async fn cancel_mid_stream_frees_the_worker() {
    let fx = harness();
    let mut task_events = fx.bus.subscribe(Topic::Task);

    let started = fx
        .orchestrator
        .dispatch(
            "task_start",
            serde_json::json!({
                "kind": "worker",
                "workerId": "coder",
                "task": "long-running refactor"
            }),
        )
        .await;
    let task_id = started["taskId"].as_str().expect("taskId").to_string();
    wait_for_prompts(&fx.backend, 1).await;

    fx.manager
        .ingest_chunk("coder", Some(&task_id), "working on it...".to_string(), false)
        .await;

    let canceled = fx
        .orchestrator
        .dispatch("task_cancel", serde_json::json!({ "taskId": task_id }))
        .await;
    assert_eq!(canceled["status"], "canceled");

    // A straggler chunk after cancellation is discarded.
    fx.manager
        .ingest_chunk("coder", Some(&task_id), "too late".to_string(), false)
        .await;

    let peeked = fx
        .orchestrator
        .dispatch("task_peek", serde_json::json!({ "taskId": task_id }))
        .await;
    assert_eq!(peeked["status"], "canceled");
    assert_eq!(
        peeked["stream_chunks"],
        serde_json::json!(["working on it..."])
    );

    // The worker is ready again after the abort ack.
    assert_eq!(
        fx.manager.pool().get("coder").expect("worker").status,
        WorkerStatus::Ready
    );

    // The bus saw task:canceled and no chunk after it.
    let mut saw_canceled = false;
    loop {
        let event = tokio::time::timeout(Duration::from_millis(200), task_events.recv()).await;
        match event {
            Ok(Event::TaskCanceled { .. }) => saw_canceled = true,
            Ok(Event::TaskChunk { chunk, .. }) => {
                assert_ne!(chunk, "too late", "post-cancel chunk leaked to the bus")
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
    assert!(saw_canceled);
}
