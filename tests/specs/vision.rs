// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: image attachments against a text-only profile fail with
//! IncompatibleWorker; the vision profile succeeds.

use super::prelude::{harness, wait_for_prompts};

const IMAGE: &str = "data:image/png;base64,iVBORw0KGgo=";

#[tokio::test]
async fn image_attachment_needs_a_vision_worker() {
    let fx = harness();

    let started = fx
        .orchestrator
        .dispatch(
            "task_start",
            serde_json::json!({
                "kind": "worker",
                "workerId": "coder",
                "task": "what is in this screenshot?",
                "attachments": [{ "type": "image", "data": IMAGE }]
            }),
        )
        .await;
    let task_id = started["taskId"].as_str().expect("taskId").to_string();

    let awaited = fx
        .orchestrator
        .dispatch(
            "task_await",
            serde_json::json!({ "taskId": task_id, "timeoutMs": 2000 }),
        )
        .await;
    assert_eq!(awaited["tasks"][0]["status"], "failed");
    assert_eq!(awaited["tasks"][0]["error"]["kind"], "IncompatibleWorker");

    // Retrying against the vision profile succeeds.
    let retry = fx
        .orchestrator
        .dispatch(
            "task_start",
            serde_json::json!({
                "kind": "worker",
                "workerId": "vision",
                "task": "what is in this screenshot?",
                "attachments": [{ "type": "image", "data": IMAGE }]
            }),
        )
        .await;
    let retry_id = retry["taskId"].as_str().expect("taskId").to_string();
    wait_for_prompts(&fx.backend, 1).await;
    fx.manager
        .ingest_chunk("vision", Some(&retry_id), "a login form".to_string(), true)
        .await;

    let awaited = fx
        .orchestrator
        .dispatch(
            "task_await",
            serde_json::json!({ "taskId": retry_id, "timeoutMs": 2000 }),
        )
        .await;
    assert_eq!(awaited["tasks"][0]["status"], "completed");
    assert_eq!(awaited["tasks"][0]["response"], "a login form");

    // The vision worker runs a vision-capable model.
    let worker = fx.manager.pool().get("vision").expect("worker");
    assert_eq!(worker.resolved_model, "acme/opus-4");
}
