// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    starting_to_ready = { WorkerStatus::Starting, WorkerStatus::Ready, true },
    ready_to_busy = { WorkerStatus::Ready, WorkerStatus::Busy, true },
    busy_to_ready = { WorkerStatus::Busy, WorkerStatus::Ready, true },
    busy_to_error = { WorkerStatus::Busy, WorkerStatus::Error, true },
    ready_to_stopped = { WorkerStatus::Ready, WorkerStatus::Stopped, true },
    starting_to_busy = { WorkerStatus::Starting, WorkerStatus::Busy, false },
    stopped_to_ready = { WorkerStatus::Stopped, WorkerStatus::Ready, false },
    error_to_ready = { WorkerStatus::Error, WorkerStatus::Ready, false },
    error_to_stopped = { WorkerStatus::Error, WorkerStatus::Stopped, false },
    ready_to_starting = { WorkerStatus::Ready, WorkerStatus::Starting, false },
)]
fn status_transitions(from: WorkerStatus, to: WorkerStatus, legal: bool) {
    assert_eq!(from.can_transition(to), legal);
}

#[test]
fn live_states() {
    assert!(WorkerStatus::Starting.is_live());
    assert!(WorkerStatus::Ready.is_live());
    assert!(WorkerStatus::Busy.is_live());
    assert!(!WorkerStatus::Error.is_live());
    assert!(!WorkerStatus::Stopped.is_live());
}

#[test]
fn terminal_states() {
    assert!(WorkerStatus::Error.is_terminal());
    assert!(WorkerStatus::Stopped.is_terminal());
    assert!(!WorkerStatus::Busy.is_terminal());
}

#[test]
fn status_display_lowercase() {
    assert_eq!(WorkerStatus::Starting.to_string(), "starting");
    assert_eq!(WorkerStatus::Busy.to_string(), "busy");
}

#[test]
fn persisted_worker_deserializes_sparse_json() {
    let parsed: PersistedWorker =
        serde_json::from_str(r#"{"profile_id": "docs"}"#).unwrap();
    assert_eq!(parsed.profile_id, "docs");
    assert!(parsed.resolved_model.is_none());
    assert!(parsed.session_id.is_none());
}
