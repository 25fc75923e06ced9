// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend selection by profile kind.
//!
//! `server` profiles get a dedicated runtime process, `subagent`
//! profiles get a child session in the shared runtime. Operations on a
//! running worker route by the shape of its handle: only the server
//! backend produces a `server_url`.

use super::{
    AgentBackend, BackendError, PromptPayload, ServerBackend, SpawnError, SpawnRequest,
    SpawnedWorker, WorkerBackend,
};
use crate::runtime::RuntimeApi;
use async_trait::async_trait;
use maestro_core::WorkerKind;
use std::time::Duration;

/// Routes each profile to its spawn strategy.
#[derive(Clone)]
pub struct DualBackend<R: RuntimeApi> {
    server: ServerBackend,
    agent: AgentBackend<R>,
}

impl<R: RuntimeApi> DualBackend<R> {
    pub fn new(server: ServerBackend, agent: AgentBackend<R>) -> Self {
        Self { server, agent }
    }

    fn owns_server(worker: &SpawnedWorker) -> bool {
        worker.server_url.is_some()
    }
}

#[async_trait]
impl<R: RuntimeApi> WorkerBackend for DualBackend<R> {
    async fn spawn(&self, req: SpawnRequest) -> Result<SpawnedWorker, SpawnError> {
        match req.profile.kind {
            WorkerKind::Server => self.server.spawn(req).await,
            WorkerKind::Subagent => self.agent.spawn(req).await,
        }
    }

    async fn prompt(
        &self,
        worker: &SpawnedWorker,
        payload: PromptPayload,
    ) -> Result<(), BackendError> {
        if Self::owns_server(worker) {
            self.server.prompt(worker, payload).await
        } else {
            self.agent.prompt(worker, payload).await
        }
    }

    async fn abort(&self, worker: &SpawnedWorker) -> Result<(), BackendError> {
        if Self::owns_server(worker) {
            self.server.abort(worker).await
        } else {
            self.agent.abort(worker).await
        }
    }

    async fn ping(&self, worker: &SpawnedWorker) -> Result<(), BackendError> {
        if Self::owns_server(worker) {
            self.server.ping(worker).await
        } else {
            self.agent.ping(worker).await
        }
    }

    async fn stop(&self, worker: &SpawnedWorker, grace: Duration) -> Result<(), BackendError> {
        if Self::owns_server(worker) {
            self.server.stop(worker, grace).await
        } else {
            self.agent.stop(worker, grace).await
        }
    }
}

#[cfg(test)]
#[path = "dual_tests.rs"]
mod tests;
