// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent backend: a child session inside the shared host runtime.
//!
//! No process is forked. The profile is mirrored by a named agent in the
//! host runtime; the resolved model is pinned per prompt rather than per
//! process.

use super::{PromptPayload, SpawnError, SpawnRequest, SpawnedWorker, WorkerBackend};
use crate::runtime::{CreateSessionRequest, ModelSelector, PromptRequest, RuntimeApi};
use async_trait::async_trait;
use std::time::Duration;

/// Creates subagent sessions under an existing shared runtime.
#[derive(Clone)]
pub struct AgentBackend<R: RuntimeApi> {
    runtime: R,
    /// Host session new workers are parented under, once one is bound.
    host_session_id: Option<String>,
}

impl<R: RuntimeApi> AgentBackend<R> {
    pub fn new(runtime: R) -> Self {
        Self {
            runtime,
            host_session_id: None,
        }
    }

    pub fn with_host_session(runtime: R, host_session_id: impl Into<String>) -> Self {
        Self {
            runtime,
            host_session_id: Some(host_session_id.into()),
        }
    }
}

#[async_trait]
impl<R: RuntimeApi> WorkerBackend for AgentBackend<R> {
    async fn spawn(&self, req: SpawnRequest) -> Result<SpawnedWorker, SpawnError> {
        let session = self
            .runtime
            .create_session(CreateSessionRequest {
                agent: Some(req.profile.name.clone()),
                parent_session_id: self.host_session_id.clone(),
                model: Some(req.resolved_model.clone()),
                system_prompt: req.system_prompt.clone(),
            })
            .await
            .map_err(|e| SpawnError::Session(e.to_string()))?;

        tracing::info!(
            profile_id = %req.profile.id,
            session_id = %session.id,
            "created subagent session"
        );

        Ok(SpawnedWorker {
            profile_id: req.profile.id,
            pid: None,
            port: None,
            server_url: None,
            session_id: session.id,
            parent_session_id: self.host_session_id.clone(),
        })
    }

    async fn prompt(
        &self,
        worker: &SpawnedWorker,
        payload: PromptPayload,
    ) -> Result<(), super::BackendError> {
        let model = payload
            .model
            .as_deref()
            .and_then(ModelSelector::from_canonical);
        self.runtime
            .prompt(
                &worker.session_id,
                PromptRequest {
                    parts: payload.parts,
                    model,
                    job_id: payload.job_id,
                },
            )
            .await?;
        Ok(())
    }

    async fn abort(&self, worker: &SpawnedWorker) -> Result<(), super::BackendError> {
        self.runtime.abort(&worker.session_id).await?;
        Ok(())
    }

    async fn ping(&self, _worker: &SpawnedWorker) -> Result<(), super::BackendError> {
        self.runtime.health().await?;
        Ok(())
    }

    async fn stop(
        &self,
        worker: &SpawnedWorker,
        _grace: Duration,
    ) -> Result<(), super::BackendError> {
        // Best effort: abort anything in flight. The shared runtime owns
        // the session's lifetime beyond that.
        let _ = self.runtime.abort(&worker.session_id).await;
        Ok(())
    }
}
