// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::{ErrorBody, ErrorKind};
use crate::profile::ProfileId;
use crate::task::{TaskId, TaskStatus};
use crate::worker::WorkerStatus;

#[test]
fn worker_event_tag_format() {
    let event = Event::WorkerReady {
        profile_id: ProfileId::new("coder"),
        at_ms: 1,
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "worker:ready");
    assert_eq!(json["profile_id"], "coder");
}

#[test]
fn task_chunk_round_trips() {
    let event = Event::TaskChunk {
        task_id: TaskId::new("t-9"),
        chunk: "partial".to_string(),
        last: true,
        at_ms: 42,
    };
    let json = serde_json::to_string(&event).unwrap();
    let back: Event = serde_json::from_str(&json).unwrap();
    assert_eq!(back, event);
}

#[test]
fn chunk_last_defaults_false() {
    let json = r#"{"type": "task:chunk", "task_id": "t-1", "chunk": "x", "at_ms": 5}"#;
    let event: Event = serde_json::from_str(json).unwrap();
    match event {
        Event::TaskChunk { last, .. } => assert!(!last),
        other => panic!("unexpected event: {:?}", other),
    }
}

#[test]
fn skill_event_tag_format() {
    let event = Event::SkillLoadFailed {
        worker_id: ProfileId::new("docs"),
        skill: "web.fetch".to_string(),
        error: "404".to_string(),
        at_ms: 7,
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "skill:load:failed");
}

#[test]
fn topics_partition_variants() {
    let worker = Event::WorkerStopped {
        profile_id: ProfileId::new("w"),
        at_ms: 0,
    };
    let task = Event::TaskStarted {
        task_id: TaskId::new("t"),
        worker_id: None,
        at_ms: 0,
    };
    let skill = Event::SkillPermission {
        worker_id: ProfileId::new("w"),
        skill: "git.push".to_string(),
        request: "push to origin".to_string(),
        at_ms: 0,
    };
    assert_eq!(worker.topic(), Topic::Worker);
    assert_eq!(task.topic(), Topic::Task);
    assert_eq!(skill.topic(), Topic::Skill);
}

#[test]
fn task_id_accessor() {
    let event = Event::TaskCompleted {
        task_id: TaskId::new("t-3"),
        duration_ms: 10,
        at_ms: 0,
    };
    assert_eq!(event.task_id().map(|t| t.as_str()), Some("t-3"));

    let event = Event::WorkerReady {
        profile_id: ProfileId::new("coder"),
        at_ms: 0,
    };
    assert!(event.task_id().is_none());
}

#[test]
fn from_worker_status_maps_transitions() {
    let ready = Event::from_worker_status(ProfileId::new("w"), WorkerStatus::Ready, None, None, 1);
    assert!(matches!(ready, Some(Event::WorkerReady { .. })));

    // Starting is announced via worker:spawned, not a status event.
    let starting =
        Event::from_worker_status(ProfileId::new("w"), WorkerStatus::Starting, None, None, 1);
    assert!(starting.is_none());

    // Busy without a task id produces nothing.
    let busy = Event::from_worker_status(ProfileId::new("w"), WorkerStatus::Busy, None, None, 1);
    assert!(busy.is_none());
}

#[test]
fn from_worker_status_error_carries_body() {
    let error = Event::from_worker_status(
        ProfileId::new("w"),
        WorkerStatus::Error,
        None,
        Some(ErrorBody::new(ErrorKind::WorkerUnreachable, "3 failed pings")),
        1,
    );
    match error {
        Some(Event::WorkerError { error, .. }) => {
            assert_eq!(error.kind, ErrorKind::WorkerUnreachable);
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[test]
fn from_task_terminal_only_for_terminal_statuses() {
    let done = Event::from_task_terminal(TaskId::new("t"), TaskStatus::Completed, 5, None, 1);
    assert!(matches!(done, Some(Event::TaskCompleted { .. })));

    let running = Event::from_task_terminal(TaskId::new("t"), TaskStatus::Running, 0, None, 1);
    assert!(running.is_none());
}

#[test]
fn at_ms_accessor() {
    let event = Event::WorkerSpawned {
        profile_id: ProfileId::new("coder"),
        resolved_model: "acme/sonnet-4".to_string(),
        model_reason: "configured".to_string(),
        pid: Some(42),
        port: Some(39000),
        at_ms: 777,
    };
    assert_eq!(event.at_ms(), 777);
}
