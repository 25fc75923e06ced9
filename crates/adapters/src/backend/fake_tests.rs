// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::runtime::PromptPart;
use maestro_core::test_support::profile_fixture;

fn spawn_request(id: &str) -> SpawnRequest {
    SpawnRequest {
        profile: profile_fixture(id),
        resolved_model: "acme/sonnet-4".to_string(),
        system_prompt: None,
        bridge_url: "http://127.0.0.1:1".to_string(),
        bridge_token: "t".to_string(),
        bridge_timeout_ms: 10_000,
        pinned_port: None,
    }
}

#[tokio::test]
async fn spawn_hands_out_sequential_sessions() {
    let backend = FakeBackend::new();
    let first = backend.spawn(spawn_request("coder")).await.unwrap();
    let second = backend.spawn(spawn_request("docs")).await.unwrap();
    assert_eq!(first.session_id, "sess-1");
    assert_eq!(second.session_id, "sess-2");
    assert_eq!(backend.spawn_count(), 2);
}

#[tokio::test]
async fn scripted_spawn_error_fires_once() {
    let backend = FakeBackend::new();
    backend.set_spawn_error(SpawnError::PortInUse(4242));
    assert!(backend.spawn(spawn_request("coder")).await.is_err());
    assert!(backend.spawn(spawn_request("coder")).await.is_ok());
}

#[tokio::test]
async fn prompts_are_recorded_with_model() {
    let backend = FakeBackend::new();
    let worker = backend.spawn(spawn_request("coder")).await.unwrap();
    backend
        .prompt(
            &worker,
            PromptPayload {
                parts: vec![PromptPart::Text {
                    text: "hello".to_string(),
                }],
                model: Some("acme/haiku-4".to_string()),
                job_id: Some("t-1".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(backend.prompts(), vec!["hello".to_string()]);
    assert_eq!(
        backend.prompt_models(),
        vec![Some("acme/haiku-4".to_string())]
    );
}

#[tokio::test]
async fn ping_failures_consume() {
    let backend = FakeBackend::new();
    let worker = backend.spawn(spawn_request("coder")).await.unwrap();
    backend.set_ping_failures(2);
    assert!(backend.ping(&worker).await.is_err());
    assert!(backend.ping(&worker).await.is_err());
    assert!(backend.ping(&worker).await.is_ok());
}
