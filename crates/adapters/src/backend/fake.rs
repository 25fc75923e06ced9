// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake worker backend for deterministic testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{
    BackendError, PromptPayload, SpawnError, SpawnRequest, SpawnedWorker, WorkerBackend,
};
use crate::runtime::PromptPart;
use async_trait::async_trait;
use maestro_core::ProfileId;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Recorded call to FakeBackend
#[derive(Debug, Clone)]
pub enum BackendCall {
    Spawn {
        profile_id: ProfileId,
        resolved_model: String,
    },
    Prompt {
        profile_id: ProfileId,
        text: String,
        model: Option<String>,
        job_id: Option<String>,
    },
    Abort {
        profile_id: ProfileId,
    },
    Ping {
        profile_id: ProfileId,
    },
    Stop {
        profile_id: ProfileId,
    },
}

/// Fake backend for testing
///
/// Records every call, hands out sequential session ids, and lets tests
/// script the next spawn/prompt/ping outcome.
#[derive(Clone, Default)]
pub struct FakeBackend {
    inner: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<BackendCall>,
    spawn_count: u32,
    spawn_error: Option<SpawnError>,
    prompt_error: Option<BackendError>,
    /// Number of upcoming pings that fail.
    ping_failures: u32,
    /// Artificial spawn latency, for concurrency tests.
    spawn_delay: Option<Duration>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded calls
    pub fn calls(&self) -> Vec<BackendCall> {
        self.inner.lock().calls.clone()
    }

    /// Total number of successful spawns
    pub fn spawn_count(&self) -> u32 {
        self.inner.lock().spawn_count
    }

    /// Text of every prompt sent, in order
    pub fn prompts(&self) -> Vec<String> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::Prompt { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Model overrides carried by prompts, in order
    pub fn prompt_models(&self) -> Vec<Option<String>> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::Prompt { model, .. } => Some(model.clone()),
                _ => None,
            })
            .collect()
    }

    /// Set error to return on next spawn
    pub fn set_spawn_error(&self, error: SpawnError) {
        self.inner.lock().spawn_error = Some(error);
    }

    /// Set error to return on next prompt
    pub fn set_prompt_error(&self, error: BackendError) {
        self.inner.lock().prompt_error = Some(error);
    }

    /// Make the next `n` pings fail
    pub fn set_ping_failures(&self, n: u32) {
        self.inner.lock().ping_failures = n;
    }

    /// Delay every spawn by `delay`
    pub fn set_spawn_delay(&self, delay: Duration) {
        self.inner.lock().spawn_delay = Some(delay);
    }

    fn flatten_text(parts: &[PromptPart]) -> String {
        parts
            .iter()
            .filter_map(|p| match p {
                PromptPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl WorkerBackend for FakeBackend {
    async fn spawn(&self, req: SpawnRequest) -> Result<SpawnedWorker, SpawnError> {
        let delay = self.inner.lock().spawn_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.lock();
        inner.calls.push(BackendCall::Spawn {
            profile_id: req.profile.id.clone(),
            resolved_model: req.resolved_model.clone(),
        });
        if let Some(error) = inner.spawn_error.take() {
            return Err(error);
        }
        inner.spawn_count += 1;
        let n = inner.spawn_count;
        Ok(SpawnedWorker {
            profile_id: req.profile.id,
            pid: Some(10_000 + n),
            port: Some(40_000 + n as u16),
            server_url: Some(format!("http://127.0.0.1:{}", 40_000 + n as u16)),
            session_id: format!("sess-{}", n),
            parent_session_id: None,
        })
    }

    async fn prompt(
        &self,
        worker: &SpawnedWorker,
        payload: PromptPayload,
    ) -> Result<(), BackendError> {
        let mut inner = self.inner.lock();
        inner.calls.push(BackendCall::Prompt {
            profile_id: worker.profile_id.clone(),
            text: Self::flatten_text(&payload.parts),
            model: payload.model.clone(),
            job_id: payload.job_id.clone(),
        });
        if let Some(error) = inner.prompt_error.take() {
            return Err(error);
        }
        Ok(())
    }

    async fn abort(&self, worker: &SpawnedWorker) -> Result<(), BackendError> {
        self.inner.lock().calls.push(BackendCall::Abort {
            profile_id: worker.profile_id.clone(),
        });
        Ok(())
    }

    async fn ping(&self, worker: &SpawnedWorker) -> Result<(), BackendError> {
        let mut inner = self.inner.lock();
        inner.calls.push(BackendCall::Ping {
            profile_id: worker.profile_id.clone(),
        });
        if inner.ping_failures > 0 {
            inner.ping_failures -= 1;
            return Err(BackendError::Unreachable("fake ping failure".to_string()));
        }
        Ok(())
    }

    async fn stop(
        &self,
        worker: &SpawnedWorker,
        _grace: Duration,
    ) -> Result<(), BackendError> {
        self.inner.lock().calls.push(BackendCall::Stop {
            profile_id: worker.profile_id.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
