// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: a coder task streams two chunks and completes.

use super::prelude::{harness, wait_for_prompts};
use maestro_core::Topic;
use std::time::Duration;

#[tokio::test]
async fn coder_task_completes_with_streamed_response() {
    let fx = harness();
    let mut task_events = fx.bus.subscribe(Topic::Task);

    let started = fx
        .orchestrator
        .dispatch(
            "task_start",
            serde_json::json!({
                "kind": "worker",
                "workerId": "coder",
                "task": "Write hello-world in Python"
            }),
        )
        .await;
    let task_id = started["taskId"].as_str().expect("taskId").to_string();
    assert_eq!(started["next"], "task_await");

    wait_for_prompts(&fx.backend, 1).await;
    assert_eq!(
        fx.backend.prompts(),
        vec!["Write hello-world in Python".to_string()]
    );

    // The coder profile resolved `auto` against the catalog.
    let worker = fx.manager.pool().get("coder").expect("worker");
    assert_eq!(worker.resolved_model, "acme/sonnet-4");
    assert_eq!(worker.model_reason, "runtime default");

    fx.clock.advance(120);
    fx.manager
        .ingest_chunk("coder", Some(&task_id), "print(".to_string(), false)
        .await;
    fx.manager
        .ingest_chunk("coder", Some(&task_id), "'hello')\n".to_string(), true)
        .await;

    let awaited = fx
        .orchestrator
        .dispatch(
            "task_await",
            serde_json::json!({ "taskId": task_id, "timeoutMs": 2000 }),
        )
        .await;
    let outcome = &awaited["tasks"][0];
    assert_eq!(outcome["status"], "completed");
    assert_eq!(outcome["response"], "print('hello')\n");
    assert!(outcome["duration_ms"].as_u64().expect("duration") > 0);

    // Event stream: started, chunk+, completed, in that order.
    let mut kinds = Vec::new();
    for _ in 0..4 {
        let event = tokio::time::timeout(Duration::from_secs(1), task_events.recv())
            .await
            .expect("event");
        kinds.push(serde_json::to_value(&event).expect("json")["type"]
            .as_str()
            .expect("type")
            .to_string());
    }
    assert_eq!(
        kinds,
        vec!["task:started", "task:chunk", "task:chunk", "task:completed"]
    );
}
