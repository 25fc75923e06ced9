// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy crossing the Task API boundary.
//!
//! Failures inside a single task are never fatal to the orchestrator;
//! they surface as a terminal `failed` state carrying an [`ErrorBody`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable error kinds, serialized verbatim into task results and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Profile or model mis-specified. Fatal for the operation only.
    ConfigInvalid,
    /// Model resolution failed; suggestions accompany the message.
    ModelUnavailable,
    SpawnTimeout,
    RuntimeMissing,
    PortInUse,
    /// Reuse blocked by capability or model mismatch; pass `force_new`.
    IncompatibleWorker,
    LockTimeout,
    TaskTimeout,
    TaskCanceled,
    BridgeUnauthorized,
    BridgeMalformed,
    /// Health-check failure sequence; the worker is quarantined.
    WorkerUnreachable,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Structured error attached to failed tasks and worker instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorBody {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
