// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task records and lifecycle.
//!
//! A task is a single orchestrator-mediated prompt to a worker (or a
//! workflow run, or a management op). Tasks live in memory only; status
//! progression is monotone, `result` is present iff the task completed,
//! and `error` is present iff it failed or was canceled.

use crate::clock::Clock;
use crate::error::ErrorBody;
use crate::profile::ProfileId;
use serde::{Deserialize, Serialize};
use std::fmt;

crate::string_id! {
    /// Opaque identifier the Task API addresses tasks by.
    pub struct TaskId;
}

crate::string_id! {
    /// Identifier of a session inside an agent runtime.
    pub struct WorkerSessionId;
}

/// What a task runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Prompt dispatched to a profile's worker.
    Worker,
    /// Named sequence of worker steps.
    Workflow,
    /// Management operation from the fixed op registry; never touches the
    /// agent runtime.
    Op,
}

/// Terminal and non-terminal task states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Canceled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Canceled
        )
    }

    /// Whether a transition from `self` to `next` is legal (monotone).
    pub fn can_transition(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        match (self, next) {
            (Pending, Running) => true,
            (Pending | Running, Completed | Failed | Canceled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Canceled => write!(f, "canceled"),
        }
    }
}

/// Prompt attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Attachment {
    Text { content: String },
    /// Image payload as a data URL or inline base64 bytes.
    Image { data: String },
    File { name: String, data: String },
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        matches!(self, Attachment::Image { .. })
    }
}

/// Whether a per-task model override changes the worker's default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelPolicy {
    /// Respawn the worker on the override; it becomes the worker default.
    #[default]
    Sticky,
    /// Carry the override only in the prompt; the worker's default model
    /// is unchanged.
    Dynamic,
}

/// A single orchestrator-mediated unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub kind: TaskKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<ProfileId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_override: Option<String>,
    #[serde(default)]
    pub model_policy: ModelPolicy,
    pub status: TaskStatus,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
    /// Streamed output in arrival order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stream_chunks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Task {
    /// Create a pending task record.
    pub fn new(task_id: TaskId, kind: TaskKind, prompt: impl Into<String>, clock: &impl Clock) -> Self {
        Self {
            task_id,
            kind,
            worker_id: None,
            workflow_id: None,
            op: None,
            prompt: prompt.into(),
            attachments: Vec::new(),
            model_override: None,
            model_policy: ModelPolicy::default(),
            status: TaskStatus::Pending,
            created_at_ms: clock.epoch_ms(),
            started_at_ms: None,
            finished_at_ms: None,
            stream_chunks: Vec::new(),
            result: None,
            error: None,
        }
    }

    /// Whether any attachment is an image.
    pub fn needs_vision(&self) -> bool {
        self.attachments.iter().any(Attachment::is_image)
    }

    /// Concatenation of streamed chunks, or `None` when nothing streamed.
    pub fn chunk_text(&self) -> Option<String> {
        if self.stream_chunks.is_empty() {
            None
        } else {
            Some(self.stream_chunks.concat())
        }
    }

    /// Total wall time, when the task has started and finished.
    pub fn duration_ms(&self) -> Option<u64> {
        match (self.started_at_ms, self.finished_at_ms) {
            (Some(start), Some(end)) => Some(end.saturating_sub(start)),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
