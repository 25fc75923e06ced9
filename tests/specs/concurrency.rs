// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: ten concurrent task_starts on a cold profile spawn exactly
//! one worker, and all ten tasks complete.

use super::prelude::{harness, wait_for_prompts};
use std::time::Duration;

#[tokio::test]
async fn ten_concurrent_starts_spawn_one_worker() {
    let fx = harness();
    fx.backend.set_spawn_delay(Duration::from_millis(25));

    let mut task_ids = Vec::new();
    for n in 0..10 {
        let started = fx
            .orchestrator
            .dispatch(
                "task_start",
                serde_json::json!({
                    "kind": "worker",
                    "workerId": "docs",
                    "task": format!("job {}", n)
                }),
            )
            .await;
        task_ids.push(started["taskId"].as_str().expect("taskId").to_string());
    }

    // Tasks drain FIFO through the single worker; complete each prompt
    // as it arrives.
    for n in 1..=10 {
        wait_for_prompts(&fx.backend, n).await;
        let in_flight = fx
            .manager
            .pool()
            .get("docs")
            .and_then(|w| w.current_task)
            .expect("in-flight task");
        fx.manager
            .ingest_chunk("docs", Some(&in_flight), format!("done {}", n), true)
            .await;
    }

    let awaited = fx
        .orchestrator
        .dispatch(
            "task_await",
            serde_json::json!({ "taskIds": task_ids, "timeoutMs": 5000 }),
        )
        .await;
    let outcomes = awaited["tasks"].as_array().expect("array");
    assert_eq!(outcomes.len(), 10);
    assert!(outcomes.iter().all(|o| o["status"] == "completed"));

    // One process for ten callers.
    assert_eq!(fx.backend.spawn_count(), 1);
}
