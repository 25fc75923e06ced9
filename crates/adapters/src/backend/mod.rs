// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker spawn strategies.
//!
//! Two concrete backends exist: [`ServerBackend`] forks a dedicated
//! agent-runtime process per worker, [`AgentBackend`] creates a child
//! session inside an already-running shared runtime. The engine's pool
//! drives either through the [`WorkerBackend`] trait and never touches a
//! process or socket directly.

mod agent;
mod dual;
mod server;

pub use agent::AgentBackend;
pub use dual::DualBackend;
pub use server::{ServerBackend, ServerBackendConfig};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{BackendCall, FakeBackend};

use crate::runtime::{PromptPart, RuntimeApiError};
use async_trait::async_trait;
use maestro_core::{ProfileId, WorkerProfile};
use std::time::Duration;
use thiserror::Error;

/// Errors from the spawn path.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("worker did not become ready within {0:?}")]
    Timeout(Duration),
    #[error("port {0} already in use")]
    PortInUse(u16),
    #[error("agent runtime not found: {0}")]
    RuntimeMissing(String),
    #[error("invalid worker configuration: {0}")]
    ConfigInvalid(String),
    #[error("session creation failed: {0}")]
    Session(String),
    #[error("spawn I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from operations against a running worker.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("worker unreachable: {0}")]
    Unreachable(String),
    #[error("session error: {0}")]
    Session(String),
}

impl From<RuntimeApiError> for BackendError {
    fn from(err: RuntimeApiError) -> Self {
        match err {
            RuntimeApiError::Unreachable(msg) => BackendError::Unreachable(msg),
            other => BackendError::Session(other.to_string()),
        }
    }
}

/// Everything a backend needs to bring up a worker.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub profile: WorkerProfile,
    /// Canonical `provider/model` the worker runs on.
    pub resolved_model: String,
    /// System prompt text, already loaded from the profile's prompt ref.
    pub system_prompt: Option<String>,
    /// Base URL of the bridge endpoint, injected into worker env.
    pub bridge_url: String,
    pub bridge_token: String,
    pub bridge_timeout_ms: u64,
    /// Profile-pinned port; `None` lets the OS assign one.
    pub pinned_port: Option<u16>,
}

/// Handle to a spawned worker, held by the pool.
#[derive(Debug, Clone)]
pub struct SpawnedWorker {
    pub profile_id: ProfileId,
    /// Absent for the agent backend.
    pub pid: Option<u32>,
    pub port: Option<u16>,
    pub server_url: Option<String>,
    pub session_id: String,
    pub parent_session_id: Option<String>,
}

/// Prompt dispatched to a worker's session.
#[derive(Debug, Clone)]
pub struct PromptPayload {
    pub parts: Vec<PromptPart>,
    /// Per-message model override, canonical `provider/model`.
    pub model: Option<String>,
    /// Task id, carried so bridge chunks can be correlated.
    pub job_id: Option<String>,
}

/// A spawn strategy for workers.
#[async_trait]
pub trait WorkerBackend: Clone + Send + Sync + 'static {
    /// Bring up a worker and create its session.
    async fn spawn(&self, req: SpawnRequest) -> Result<SpawnedWorker, SpawnError>;

    /// Send a prompt to the worker's session.
    async fn prompt(
        &self,
        worker: &SpawnedWorker,
        payload: PromptPayload,
    ) -> Result<(), BackendError>;

    /// Abort the worker's in-flight prompt.
    async fn abort(&self, worker: &SpawnedWorker) -> Result<(), BackendError>;

    /// Cheap liveness probe used by the health monitor.
    async fn ping(&self, worker: &SpawnedWorker) -> Result<(), BackendError>;

    /// Stop the worker: graceful first, forceful after `grace`.
    async fn stop(&self, worker: &SpawnedWorker, grace: Duration) -> Result<(), BackendError>;
}
