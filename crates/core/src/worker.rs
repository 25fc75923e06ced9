// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker instance state and its status machine.
//!
//! Exactly one [`WorkerInstance`] exists per profile id at any time; the
//! pool is the sole mutator. Status transitions are monotone
//! (`starting → ready → (busy ↔ ready)* → stopped`) and `error` is
//! terminal until the instance is explicitly removed.

use crate::error::ErrorBody;
use crate::profile::ProfileId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Starting,
    Ready,
    Busy,
    Error,
    Stopped,
}

impl WorkerStatus {
    /// Whether a transition from `self` to `next` is legal.
    ///
    /// `Error` and `Stopped` are reachable from any live state; nothing
    /// leaves them except removal from the registry.
    pub fn can_transition(self, next: WorkerStatus) -> bool {
        use WorkerStatus::*;
        match (self, next) {
            (Starting, Ready) => true,
            (Ready, Busy) | (Busy, Ready) => true,
            (Starting | Ready | Busy, Error) => true,
            (Starting | Ready | Busy, Stopped) => true,
            _ => false,
        }
    }

    /// Live states count toward the one-instance-per-profile invariant.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            WorkerStatus::Starting | WorkerStatus::Ready | WorkerStatus::Busy
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, WorkerStatus::Error | WorkerStatus::Stopped)
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerStatus::Starting => write!(f, "starting"),
            WorkerStatus::Ready => write!(f, "ready"),
            WorkerStatus::Busy => write!(f, "busy"),
            WorkerStatus::Error => write!(f, "error"),
            WorkerStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Terminal output captured from a worker's most recent task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LastResult {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
    pub duration_ms: u64,
}

/// A live (or recently stopped) worker bound to a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerInstance {
    pub profile_id: ProfileId,
    /// Absent for the agent backend (no dedicated process).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    pub session_id: String,
    /// Set for subagents: the host session they were created under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_session_id: Option<String>,
    pub status: WorkerStatus,
    /// Canonical `provider/model` the worker runs on.
    pub resolved_model: String,
    /// How `resolved_model` was selected.
    pub model_reason: String,
    pub started_at_ms: u64,
    pub last_activity_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_result: Option<LastResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Previously observed worker metadata, read from the persistence layer's
/// snapshot at startup. The core never writes this.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedWorker {
    pub profile_id: ProfileId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopped_at_ms: Option<u64>,
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
