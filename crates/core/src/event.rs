// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types broadcast by the orchestrator.
//!
//! Serializes with `{"type": "scope:name", ...fields}` format. Every
//! variant carries `at_ms` (epoch milliseconds) plus a typed payload;
//! payload shapes are fixed here and validated once at the bridge
//! boundary, never inspected dynamically downstream.

use crate::error::ErrorBody;
use crate::profile::ProfileId;
use crate::task::{TaskId, TaskStatus};
use crate::worker::WorkerStatus;
use serde::{Deserialize, Serialize};

/// Topic an event fans out on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Worker,
    Task,
    Skill,
}

/// Events emitted on worker, task, and skill state changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- worker --
    #[serde(rename = "worker:spawned")]
    WorkerSpawned {
        profile_id: ProfileId,
        resolved_model: String,
        model_reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pid: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        port: Option<u16>,
        at_ms: u64,
    },

    #[serde(rename = "worker:ready")]
    WorkerReady { profile_id: ProfileId, at_ms: u64 },

    #[serde(rename = "worker:busy")]
    WorkerBusy {
        profile_id: ProfileId,
        task_id: TaskId,
        at_ms: u64,
    },

    #[serde(rename = "worker:error")]
    WorkerError {
        profile_id: ProfileId,
        error: ErrorBody,
        at_ms: u64,
    },

    #[serde(rename = "worker:stopped")]
    WorkerStopped { profile_id: ProfileId, at_ms: u64 },

    // -- task --
    #[serde(rename = "task:started")]
    TaskStarted {
        task_id: TaskId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        worker_id: Option<ProfileId>,
        at_ms: u64,
    },

    #[serde(rename = "task:chunk")]
    TaskChunk {
        task_id: TaskId,
        chunk: String,
        #[serde(default)]
        last: bool,
        at_ms: u64,
    },

    #[serde(rename = "task:completed")]
    TaskCompleted {
        task_id: TaskId,
        duration_ms: u64,
        at_ms: u64,
    },

    #[serde(rename = "task:failed")]
    TaskFailed {
        task_id: TaskId,
        error: ErrorBody,
        at_ms: u64,
    },

    #[serde(rename = "task:canceled")]
    TaskCanceled { task_id: TaskId, at_ms: u64 },

    // -- skill (forwarded from the bridge) --
    #[serde(rename = "skill:load:started")]
    SkillLoadStarted {
        worker_id: ProfileId,
        skill: String,
        at_ms: u64,
    },

    #[serde(rename = "skill:load:completed")]
    SkillLoadCompleted {
        worker_id: ProfileId,
        skill: String,
        at_ms: u64,
    },

    #[serde(rename = "skill:load:failed")]
    SkillLoadFailed {
        worker_id: ProfileId,
        skill: String,
        error: String,
        at_ms: u64,
    },

    #[serde(rename = "skill:permission")]
    SkillPermission {
        worker_id: ProfileId,
        skill: String,
        /// What the worker asked to do, verbatim.
        request: String,
        at_ms: u64,
    },
}

impl Event {
    /// The topic this event fans out on.
    pub fn topic(&self) -> Topic {
        use Event::*;
        match self {
            WorkerSpawned { .. } | WorkerReady { .. } | WorkerBusy { .. } | WorkerError { .. }
            | WorkerStopped { .. } => Topic::Worker,
            TaskStarted { .. } | TaskChunk { .. } | TaskCompleted { .. } | TaskFailed { .. }
            | TaskCanceled { .. } => Topic::Task,
            SkillLoadStarted { .. } | SkillLoadCompleted { .. } | SkillLoadFailed { .. }
            | SkillPermission { .. } => Topic::Skill,
        }
    }

    /// Timestamp carried by the event.
    pub fn at_ms(&self) -> u64 {
        use Event::*;
        match self {
            WorkerSpawned { at_ms, .. }
            | WorkerReady { at_ms, .. }
            | WorkerBusy { at_ms, .. }
            | WorkerError { at_ms, .. }
            | WorkerStopped { at_ms, .. }
            | TaskStarted { at_ms, .. }
            | TaskChunk { at_ms, .. }
            | TaskCompleted { at_ms, .. }
            | TaskFailed { at_ms, .. }
            | TaskCanceled { at_ms, .. }
            | SkillLoadStarted { at_ms, .. }
            | SkillLoadCompleted { at_ms, .. }
            | SkillLoadFailed { at_ms, .. }
            | SkillPermission { at_ms, .. } => *at_ms,
        }
    }

    /// The task this event concerns, if any.
    pub fn task_id(&self) -> Option<&TaskId> {
        use Event::*;
        match self {
            TaskStarted { task_id, .. }
            | TaskChunk { task_id, .. }
            | TaskCompleted { task_id, .. }
            | TaskFailed { task_id, .. }
            | TaskCanceled { task_id, .. } => Some(task_id),
            WorkerBusy { task_id, .. } => Some(task_id),
            _ => None,
        }
    }

    /// Build the worker event matching a status transition.
    pub fn from_worker_status(
        profile_id: ProfileId,
        status: WorkerStatus,
        task_id: Option<TaskId>,
        error: Option<ErrorBody>,
        at_ms: u64,
    ) -> Option<Event> {
        match status {
            WorkerStatus::Starting => None,
            WorkerStatus::Ready => Some(Event::WorkerReady { profile_id, at_ms }),
            WorkerStatus::Busy => task_id.map(|task_id| Event::WorkerBusy {
                profile_id,
                task_id,
                at_ms,
            }),
            WorkerStatus::Error => Some(Event::WorkerError {
                profile_id,
                error: error.unwrap_or_else(|| {
                    ErrorBody::new(crate::error::ErrorKind::WorkerUnreachable, "worker error")
                }),
                at_ms,
            }),
            WorkerStatus::Stopped => Some(Event::WorkerStopped { profile_id, at_ms }),
        }
    }

    /// Build the terminal task event for a status, when the status is
    /// terminal.
    pub fn from_task_terminal(
        task_id: TaskId,
        status: TaskStatus,
        duration_ms: u64,
        error: Option<ErrorBody>,
        at_ms: u64,
    ) -> Option<Event> {
        match status {
            TaskStatus::Completed => Some(Event::TaskCompleted {
                task_id,
                duration_ms,
                at_ms,
            }),
            TaskStatus::Failed => Some(Event::TaskFailed {
                task_id,
                error: error.unwrap_or_else(|| {
                    ErrorBody::new(crate::error::ErrorKind::ConfigInvalid, "task failed")
                }),
                at_ms,
            }),
            TaskStatus::Canceled => Some(Event::TaskCanceled { task_id, at_ms }),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
