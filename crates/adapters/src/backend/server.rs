// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server backend: one dedicated agent-runtime process per worker.

use super::{PromptPayload, SpawnError, SpawnRequest, SpawnedWorker, WorkerBackend};
use crate::runtime::{
    CreateSessionRequest, HttpRuntimeClient, ModelSelector, PromptRequest, RuntimeApi,
};
use async_trait::async_trait;
use maestro_core::{ProfileId, WorkerProfile};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};

/// How long to wait for a fresh runtime process to accept HTTP.
pub const SPAWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Readiness probe poll interval.
const PROBE_INTERVAL: Duration = Duration::from_millis(250);

/// Server backend configuration.
#[derive(Debug, Clone)]
pub struct ServerBackendConfig {
    /// Runtime executable name or path.
    pub runtime_binary: String,
    /// Deadline for the readiness probe.
    pub spawn_timeout: Duration,
}

impl Default for ServerBackendConfig {
    fn default() -> Self {
        Self {
            runtime_binary: "opencode-runtime".to_string(),
            spawn_timeout: SPAWN_TIMEOUT,
        }
    }
}

/// Spawns a dedicated runtime process per worker, bound to loopback.
#[derive(Clone)]
pub struct ServerBackend {
    config: ServerBackendConfig,
    /// Live children by profile, kept for signal delivery on stop.
    children: Arc<Mutex<HashMap<ProfileId, Child>>>,
}

impl ServerBackend {
    pub fn new(config: ServerBackendConfig) -> Self {
        Self {
            config,
            children: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn client(worker: &SpawnedWorker) -> Result<HttpRuntimeClient, super::BackendError> {
        let url = worker
            .server_url
            .as_deref()
            .ok_or_else(|| super::BackendError::Session("worker has no server url".to_string()))?;
        Ok(HttpRuntimeClient::new(url))
    }

    /// Pick a port: verify a pinned port is free, or let the OS assign one.
    fn allocate_port(pinned: Option<u16>) -> Result<u16, SpawnError> {
        match pinned {
            Some(port) => match std::net::TcpListener::bind(("127.0.0.1", port)) {
                Ok(_) => Ok(port),
                Err(_) => Err(SpawnError::PortInUse(port)),
            },
            None => {
                let listener = std::net::TcpListener::bind(("127.0.0.1", 0))?;
                Ok(listener.local_addr()?.port())
            }
        }
    }

    /// Wait until the runtime accepts HTTP, or kill it and fail.
    async fn await_ready(
        &self,
        profile_id: &ProfileId,
        client: &HttpRuntimeClient,
    ) -> Result<(), SpawnError> {
        let deadline = tokio::time::Instant::now() + self.config.spawn_timeout;
        loop {
            if client.health().await.is_ok() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                self.kill_child(profile_id).await;
                return Err(SpawnError::Timeout(self.config.spawn_timeout));
            }
            tokio::time::sleep(PROBE_INTERVAL).await;
        }
    }

    async fn kill_child(&self, profile_id: &ProfileId) {
        let child = self.children.lock().remove(profile_id);
        if let Some(mut child) = child {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }

    #[cfg(unix)]
    fn send_sigterm(pid: u32) {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;
        let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
    }
}

/// Render the configuration blob injected into the worker process.
///
/// The runtime reads this from `ORCH_RUNTIME_CONFIG`: normalized tools,
/// the permission envelope, the default model, and the system prompt.
pub(crate) fn render_runtime_config(
    profile: &WorkerProfile,
    resolved_model: &str,
    system_prompt: Option<&str>,
) -> serde_json::Value {
    serde_json::json!({
        "profile": profile.id.as_str(),
        "model": resolved_model,
        "tools": profile.tools,
        "permissions": profile.permissions,
        "system_prompt": system_prompt,
    })
}

/// Assemble the worker process environment.
pub(crate) fn build_env(req: &SpawnRequest, port: u16) -> Vec<(String, String)> {
    let config = render_runtime_config(
        &req.profile,
        &req.resolved_model,
        req.system_prompt.as_deref(),
    );
    vec![
        ("ORCH_BRIDGE_URL".to_string(), req.bridge_url.clone()),
        ("ORCH_BRIDGE_TOKEN".to_string(), req.bridge_token.clone()),
        (
            "ORCH_WORKER_ID".to_string(),
            req.profile.id.as_str().to_string(),
        ),
        (
            "ORCH_BRIDGE_TIMEOUT_MS".to_string(),
            req.bridge_timeout_ms.to_string(),
        ),
        ("ORCH_RUNTIME_CONFIG".to_string(), config.to_string()),
        ("ORCH_PORT".to_string(), port.to_string()),
    ]
}

#[async_trait]
impl WorkerBackend for ServerBackend {
    async fn spawn(&self, req: SpawnRequest) -> Result<SpawnedWorker, SpawnError> {
        let profile_id = req.profile.id.clone();
        let port = Self::allocate_port(req.pinned_port)?;
        let server_url = format!("http://127.0.0.1:{}", port);

        let mut command = Command::new(&self.config.runtime_binary);
        command
            .arg("serve")
            .arg("--hostname")
            .arg("127.0.0.1")
            .arg("--port")
            .arg(port.to_string())
            .arg("--profile")
            .arg(profile_id.as_str())
            .envs(build_env(&req, port))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SpawnError::RuntimeMissing(self.config.runtime_binary.clone())
            } else {
                SpawnError::Io(e)
            }
        })?;
        let pid = child.id();

        tracing::info!(
            profile_id = %profile_id,
            port,
            pid = ?pid,
            "spawned runtime process"
        );

        self.children.lock().insert(profile_id.clone(), child);

        let client = HttpRuntimeClient::new(&server_url);
        self.await_ready(&profile_id, &client).await?;

        let session = client
            .create_session(CreateSessionRequest {
                agent: None,
                parent_session_id: None,
                model: Some(req.resolved_model.clone()),
                system_prompt: req.system_prompt.clone(),
            })
            .await
            .map_err(|e| SpawnError::Session(e.to_string()));

        let session = match session {
            Ok(session) => session,
            Err(e) => {
                self.kill_child(&profile_id).await;
                return Err(e);
            }
        };

        Ok(SpawnedWorker {
            profile_id,
            pid,
            port: Some(port),
            server_url: Some(server_url),
            session_id: session.id,
            parent_session_id: None,
        })
    }

    async fn prompt(
        &self,
        worker: &SpawnedWorker,
        payload: PromptPayload,
    ) -> Result<(), super::BackendError> {
        let client = Self::client(worker)?;
        let model = payload
            .model
            .as_deref()
            .and_then(ModelSelector::from_canonical);
        client
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
        let client = Self::client(worker)?;
        client.abort(&worker.session_id).await?;
        Ok(())
    }

    async fn ping(&self, worker: &SpawnedWorker) -> Result<(), super::BackendError> {
        let client = Self::client(worker)?;
        client.health().await?;
        Ok(())
    }

    async fn stop(
        &self,
        worker: &SpawnedWorker,
        grace: Duration,
    ) -> Result<(), super::BackendError> {
        let child = self.children.lock().remove(&worker.profile_id);
        let Some(mut child) = child else {
            return Ok(());
        };

        #[cfg(unix)]
        if let Some(pid) = child.id() {
            Self::send_sigterm(pid);
            match tokio::time::timeout(grace, child.wait()).await {
                Ok(_) => {
                    tracing::debug!(profile_id = %worker.profile_id, "worker exited on SIGTERM");
                    return Ok(());
                }
                Err(_) => {
                    tracing::warn!(
                        profile_id = %worker.profile_id,
                        grace_secs = grace.as_secs(),
                        "worker ignored SIGTERM, killing"
                    );
                }
            }
        }

        let _ = child.start_kill();
        let _ = child.wait().await;
        Ok(())
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
