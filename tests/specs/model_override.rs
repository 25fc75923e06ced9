// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: a dynamic model override rides the prompt; the worker's
//! default model never changes and no respawn happens.

use super::prelude::{harness, wait_for_prompts};

#[tokio::test]
async fn dynamic_override_leaves_worker_model_alone() {
    let fx = harness();

    let first = fx
        .orchestrator
        .dispatch(
            "task_start",
            serde_json::json!({ "kind": "worker", "workerId": "docs", "task": "first" }),
        )
        .await;
    let first_id = first["taskId"].as_str().expect("taskId").to_string();
    wait_for_prompts(&fx.backend, 1).await;
    fx.manager
        .ingest_chunk("docs", Some(&first_id), "one".to_string(), true)
        .await;
    fx.orchestrator
        .dispatch(
            "task_await",
            serde_json::json!({ "taskId": first_id, "timeoutMs": 2000 }),
        )
        .await;
    let default_model = fx.manager.pool().get("docs").expect("worker").resolved_model;

    let second = fx
        .orchestrator
        .dispatch(
            "task_start",
            serde_json::json!({
                "kind": "worker",
                "workerId": "docs",
                "task": "second",
                "model": "acme/haiku-4",
                "modelPolicy": "dynamic"
            }),
        )
        .await;
    let second_id = second["taskId"].as_str().expect("taskId").to_string();
    wait_for_prompts(&fx.backend, 2).await;
    fx.manager
        .ingest_chunk("docs", Some(&second_id), "two".to_string(), true)
        .await;
    let awaited = fx
        .orchestrator
        .dispatch(
            "task_await",
            serde_json::json!({ "taskId": second_id, "timeoutMs": 2000 }),
        )
        .await;
    assert_eq!(awaited["tasks"][0]["status"], "completed");

    // One spawn; the second prompt carried the override; the worker's
    // resolved model is unchanged.
    assert_eq!(fx.backend.spawn_count(), 1);
    assert_eq!(
        fx.backend.prompt_models(),
        vec![None, Some("acme/haiku-4".to_string())]
    );
    assert_eq!(
        fx.manager.pool().get("docs").expect("worker").resolved_model,
        default_model
    );
}
