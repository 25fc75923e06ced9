// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker pool and registry.
//!
//! Thread-safe map of live workers keyed by profile id; the sole mutator
//! of [`WorkerInstance`] state. `ensure` is idempotent: concurrent
//! callers for one profile either observe the same instance or wait on
//! the spawn in progress. Cross-process spawn exclusion goes through the
//! per-profile file lock; every mutation emits exactly one event.

use crate::error::PoolError;
use crate::lock::ProfileLock;
use crate::prompts::PromptStore;
use crate::resolve::{resolve_model_ref, Resolution};
use maestro_adapters::{SpawnRequest, SpawnedWorker, WorkerBackend};
use maestro_core::{
    Clock, ErrorBody, Event, PersistedWorker, ProfileId, ProviderCatalog, TaskId, WorkerInstance,
    WorkerProfile, WorkerStatus,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

/// Grace between SIGTERM and SIGKILL when stopping workers.
pub const STOP_GRACE: Duration = Duration::from_secs(5);

/// Pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Directory for per-profile lock files.
    pub lock_dir: PathBuf,
    /// Deadline for spawn-lock acquisition.
    pub lock_timeout: Duration,
    /// Bridge endpoint injected into worker env.
    pub bridge_url: String,
    pub bridge_token: String,
    pub bridge_timeout_ms: u64,
    /// SIGTERM-to-SIGKILL grace on stop.
    pub stop_grace: Duration,
    /// Profile-pinned ports; absent profiles get OS-assigned ports.
    pub pinned_ports: HashMap<String, u16>,
}

impl PoolConfig {
    pub fn new(lock_dir: impl Into<PathBuf>, bridge_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            lock_dir: lock_dir.into(),
            lock_timeout: Duration::from_secs(30),
            bridge_url: bridge_url.into(),
            bridge_token: token.into(),
            bridge_timeout_ms: 10_000,
            stop_grace: STOP_GRACE,
            pinned_ports: HashMap::new(),
        }
    }
}

/// Options for [`WorkerPool::ensure`].
#[derive(Debug, Clone, Default)]
pub struct EnsureOpts {
    /// Requested model reference; `None` uses the profile default.
    pub model: Option<String>,
    /// Replace an incompatible live worker instead of failing.
    pub force_new: bool,
    /// The task carries image attachments.
    pub needs_vision: bool,
}

struct WorkerEntry {
    instance: WorkerInstance,
    handle: Option<SpawnedWorker>,
    /// Present while a spawn is in flight; waiters block on it.
    spawning: Option<Arc<Notify>>,
}

enum EnsureAction {
    Reuse(WorkerInstance),
    Wait(Arc<Notify>),
    Replace,
    Spawn,
}

/// In-memory registry of live workers, one per profile.
pub struct WorkerPool<B: WorkerBackend, C: Clock> {
    backend: B,
    clock: C,
    config: PoolConfig,
    prompts: PromptStore,
    event_tx: mpsc::UnboundedSender<Event>,
    inner: Mutex<HashMap<ProfileId, WorkerEntry>>,
}

impl<B: WorkerBackend, C: Clock> WorkerPool<B, C> {
    pub fn new(
        backend: B,
        clock: C,
        event_tx: mpsc::UnboundedSender<Event>,
        config: PoolConfig,
    ) -> Self {
        Self {
            backend,
            clock,
            config,
            prompts: PromptStore::new(),
            event_tx,
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    fn emit(&self, event: Event) {
        let _ = self.event_tx.send(event);
    }

    /// Current instance for a profile.
    pub fn get(&self, profile_id: &str) -> Option<WorkerInstance> {
        self.inner.lock().get(profile_id).map(|e| e.instance.clone())
    }

    /// All instances, live and stopped, sorted by profile id.
    pub fn list(&self) -> Vec<WorkerInstance> {
        let mut workers: Vec<WorkerInstance> = self
            .inner
            .lock()
            .values()
            .map(|e| e.instance.clone())
            .collect();
        workers.sort_by(|a, b| a.profile_id.as_str().cmp(b.profile_id.as_str()));
        workers
    }

    /// Backend handle for a live profile.
    pub fn handle(&self, profile_id: &str) -> Option<SpawnedWorker> {
        self.inner.lock().get(profile_id).and_then(|e| e.handle.clone())
    }

    /// Profiles whose workers are currently live, with their handles.
    pub fn live_handles(&self) -> Vec<SpawnedWorker> {
        self.inner
            .lock()
            .values()
            .filter(|e| e.instance.status.is_live() && e.spawning.is_none())
            .filter_map(|e| e.handle.clone())
            .collect()
    }

    /// Get or spawn the worker for `profile`.
    ///
    /// Reuse requires the live worker's resolved model to equal the
    /// requested model after resolution and its envelope to satisfy the
    /// task; otherwise `force_new` replaces it and anything else is an
    /// `IncompatibleWorker` error.
    pub async fn ensure(
        &self,
        profile: &WorkerProfile,
        catalog: &ProviderCatalog,
        opts: EnsureOpts,
    ) -> Result<WorkerInstance, PoolError> {
        if !profile.satisfies(opts.needs_vision) {
            return Err(PoolError::Incompatible(format!(
                "worker '{}' does not accept image attachments",
                profile.id
            )));
        }

        let requested = opts.model.as_deref().unwrap_or(&profile.model);
        let resolution = resolve_model_ref(requested, catalog)?;

        let mut waited = false;
        loop {
            let action = {
                let mut inner = self.inner.lock();
                match inner.get_mut(&profile.id) {
                    Some(entry) if entry.spawning.is_some() => {
                        let notify = entry
                            .spawning
                            .clone()
                            .unwrap_or_else(|| Arc::new(Notify::new()));
                        EnsureAction::Wait(notify)
                    }
                    Some(entry) if entry.instance.status.is_live() => {
                        if entry.instance.resolved_model == resolution.resolved && !opts.force_new
                        {
                            entry.instance.last_activity_ms = self.clock.epoch_ms();
                            EnsureAction::Reuse(entry.instance.clone())
                        } else if opts.force_new {
                            EnsureAction::Replace
                        } else {
                            return Err(PoolError::Incompatible(format!(
                                "worker '{}' runs {} but {} was requested",
                                profile.id, entry.instance.resolved_model, resolution.resolved
                            )));
                        }
                    }
                    Some(entry)
                        if waited && entry.instance.status == WorkerStatus::Error =>
                    {
                        // The spawn we waited on failed; surface its error
                        // rather than piling on another attempt.
                        let error = entry.instance.error.clone().unwrap_or_else(|| {
                            ErrorBody::new(
                                maestro_core::ErrorKind::SpawnTimeout,
                                "spawn failed",
                            )
                        });
                        return Err(PoolError::Failed(error));
                    }
                    _ => {
                        let notify = Arc::new(Notify::new());
                        inner.insert(
                            profile.id.clone(),
                            WorkerEntry {
                                instance: self.placeholder(profile, &resolution),
                                handle: None,
                                spawning: Some(Arc::clone(&notify)),
                            },
                        );
                        EnsureAction::Spawn
                    }
                }
            };

            match action {
                EnsureAction::Reuse(instance) => return Ok(instance),
                EnsureAction::Wait(notify) => {
                    notify.notified().await;
                    waited = true;
                }
                EnsureAction::Replace => {
                    self.stop(profile.id.as_str()).await?;
                }
                EnsureAction::Spawn => {
                    return self.spawn_locked(profile, resolution).await;
                }
            }
        }
    }

    fn placeholder(&self, profile: &WorkerProfile, resolution: &Resolution) -> WorkerInstance {
        let now = self.clock.epoch_ms();
        WorkerInstance {
            profile_id: profile.id.clone(),
            pid: None,
            port: None,
            server_url: None,
            session_id: String::new(),
            parent_session_id: None,
            status: WorkerStatus::Starting,
            resolved_model: resolution.resolved.clone(),
            model_reason: resolution.reason.clone(),
            started_at_ms: now,
            last_activity_ms: now,
            current_task: None,
            last_result: None,
            error: None,
            warning: None,
        }
    }

    /// Spawn under the cross-process profile lock. The in-process
    /// placeholder is already registered; waiters wake when it resolves.
    async fn spawn_locked(
        &self,
        profile: &WorkerProfile,
        resolution: Resolution,
    ) -> Result<WorkerInstance, PoolError> {
        let result = self.spawn_inner(profile, &resolution).await;
        match result {
            Ok(instance) => Ok(instance),
            Err(err) => {
                let body = err.to_error_body();
                let now = self.clock.epoch_ms();
                let emit_error = {
                    let mut inner = self.inner.lock();
                    match inner.get_mut(&profile.id) {
                        Some(entry) => {
                            if let Some(notify) = entry.spawning.take() {
                                notify.notify_waiters();
                            }
                            // A concurrent stop() may have moved the entry
                            // off Starting already; leave that state alone.
                            if entry.instance.status == WorkerStatus::Starting {
                                entry.instance.status = WorkerStatus::Error;
                                entry.instance.error = Some(body.clone());
                                true
                            } else {
                                false
                            }
                        }
                        None => false,
                    }
                };
                if emit_error {
                    self.emit(Event::WorkerError {
                        profile_id: profile.id.clone(),
                        error: body,
                        at_ms: now,
                    });
                }
                Err(err)
            }
        }
    }

    async fn spawn_inner(
        &self,
        profile: &WorkerProfile,
        resolution: &Resolution,
    ) -> Result<WorkerInstance, PoolError> {
        let guard = ProfileLock::acquire(
            &self.config.lock_dir,
            profile.id.as_str(),
            self.config.lock_timeout,
        )
        .await?;

        let pinned_port = self.pinned_port_for(profile)?;

        let system_prompt = match &profile.system_prompt {
            Some(prompt_ref) => Some(
                self.prompts
                    .load(prompt_ref)
                    .map_err(|e| PoolError::ConfigInvalid(e.to_string()))?
                    .as_str()
                    .to_string(),
            ),
            None => None,
        };

        let handle = self
            .backend
            .spawn(SpawnRequest {
                profile: profile.clone(),
                resolved_model: resolution.resolved.clone(),
                system_prompt,
                bridge_url: self.config.bridge_url.clone(),
                bridge_token: self.config.bridge_token.clone(),
                bridge_timeout_ms: self.config.bridge_timeout_ms,
                pinned_port,
            })
            .await?;

        drop(guard);

        let now = self.clock.epoch_ms();
        self.emit(Event::WorkerSpawned {
            profile_id: profile.id.clone(),
            resolved_model: resolution.resolved.clone(),
            model_reason: resolution.reason.clone(),
            pid: handle.pid,
            port: handle.port,
            at_ms: now,
        });

        let stopped_mid_spawn = {
            let mut inner = self.inner.lock();
            match inner.get_mut(&profile.id) {
                Some(entry) if entry.instance.status != WorkerStatus::Starting => {
                    if let Some(notify) = entry.spawning.take() {
                        notify.notify_waiters();
                    }
                    true
                }
                Some(_) => false,
                None => true,
            }
        };
        if stopped_mid_spawn {
            // A concurrent stop() won; tear the fresh process back down.
            let _ = self.backend.stop(&handle, self.config.stop_grace).await;
            return Err(PoolError::ConfigInvalid(format!(
                "worker '{}' was stopped during spawn",
                profile.id
            )));
        }

        let instance = {
            let mut inner = self.inner.lock();
            let entry = inner.get_mut(&profile.id).ok_or_else(|| {
                PoolError::ConfigInvalid(format!("worker '{}' vanished during spawn", profile.id))
            })?;
            entry.instance.pid = handle.pid;
            entry.instance.port = handle.port;
            entry.instance.server_url = handle.server_url.clone();
            entry.instance.session_id = handle.session_id.clone();
            entry.instance.parent_session_id = handle.parent_session_id.clone();
            entry.instance.status = WorkerStatus::Ready;
            entry.instance.last_activity_ms = now;
            entry.handle = Some(handle);
            if let Some(notify) = entry.spawning.take() {
                notify.notify_waiters();
            }
            entry.instance.clone()
        };

        self.emit(Event::WorkerReady {
            profile_id: profile.id.clone(),
            at_ms: now,
        });

        tracing::info!(
            profile_id = %profile.id,
            resolved_model = %instance.resolved_model,
            model_reason = %instance.model_reason,
            "worker ready"
        );

        Ok(instance)
    }

    /// Reject a pinned port that another live worker already holds.
    fn pinned_port_for(&self, profile: &WorkerProfile) -> Result<Option<u16>, PoolError> {
        let Some(&port) = self.config.pinned_ports.get(profile.id.as_str()) else {
            return Ok(None);
        };
        let inner = self.inner.lock();
        let conflict = inner.iter().any(|(id, entry)| {
            *id != profile.id && entry.instance.status.is_live() && entry.instance.port == Some(port)
        });
        if conflict {
            return Err(PoolError::Spawn(maestro_adapters::SpawnError::PortInUse(
                port,
            )));
        }
        Ok(Some(port))
    }

    /// Transition a worker's status, enforcing the FSM.
    ///
    /// Returns `false` (and leaves state untouched) for illegal
    /// transitions. Legal transitions emit exactly one event.
    pub fn update_status(
        &self,
        profile_id: &str,
        status: WorkerStatus,
        task: Option<TaskId>,
        error: Option<ErrorBody>,
    ) -> bool {
        let now = self.clock.epoch_ms();
        let event = {
            let mut inner = self.inner.lock();
            let Some(entry) = inner.get_mut(profile_id) else {
                return false;
            };
            let current = entry.instance.status;
            if current == status {
                // Same-state updates are a no-op, not a violation.
                return true;
            }
            if !current.can_transition(status) {
                tracing::warn!(
                    profile_id,
                    from = %current,
                    to = %status,
                    "ignoring illegal worker status transition"
                );
                return false;
            }
            entry.instance.status = status;
            entry.instance.last_activity_ms = now;
            match status {
                WorkerStatus::Busy => {
                    entry.instance.current_task = task.clone().map(|t| t.to_string())
                }
                WorkerStatus::Ready => entry.instance.current_task = None,
                WorkerStatus::Error => entry.instance.error = error.clone(),
                _ => {}
            }
            Event::from_worker_status(entry.instance.profile_id.clone(), status, task, error, now)
        };
        if let Some(event) = event {
            self.emit(event);
        }
        true
    }

    /// Record the terminal output of a worker's last task.
    pub fn record_result(&self, profile_id: &str, result: maestro_core::LastResult) {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.get_mut(profile_id) {
            entry.instance.last_result = Some(result);
            entry.instance.last_activity_ms = self.clock.epoch_ms();
        }
    }

    /// Stop one worker: graceful SIGTERM, then SIGKILL after the grace.
    pub async fn stop(&self, profile_id: &str) -> Result<(), PoolError> {
        let handle = {
            let mut inner = self.inner.lock();
            let Some(entry) = inner.get_mut(profile_id) else {
                return Ok(());
            };
            if !entry.instance.status.is_live() {
                return Ok(());
            }
            entry.instance.status = WorkerStatus::Stopped;
            entry.instance.current_task = None;
            entry.handle.take()
        };

        if let Some(handle) = &handle {
            self.backend.stop(handle, self.config.stop_grace).await?;
        }

        self.emit(Event::WorkerStopped {
            profile_id: ProfileId::new(profile_id),
            at_ms: self.clock.epoch_ms(),
        });
        Ok(())
    }

    /// Stop every live worker.
    pub async fn stop_all(&self) -> Result<(), PoolError> {
        let live: Vec<String> = {
            let inner = self.inner.lock();
            inner
                .iter()
                .filter(|(_, e)| e.instance.status.is_live())
                .map(|(id, _)| id.to_string())
                .collect()
        };
        for profile_id in live {
            self.stop(&profile_id).await?;
        }
        Ok(())
    }

    /// Quarantine an unreachable worker: error status, then stop the
    /// underlying process.
    pub async fn quarantine(&self, profile_id: &str, error: ErrorBody) {
        let handle = {
            let mut inner = self.inner.lock();
            let Some(entry) = inner.get_mut(profile_id) else {
                return;
            };
            if !entry.instance.status.is_live() {
                return;
            }
            entry.instance.status = WorkerStatus::Error;
            entry.instance.error = Some(error.clone());
            entry.instance.current_task = None;
            entry.handle.take()
        };
        if let Some(handle) = &handle {
            let _ = self.backend.stop(handle, self.config.stop_grace).await;
        }
        self.emit(Event::WorkerError {
            profile_id: ProfileId::new(profile_id),
            error,
            at_ms: self.clock.epoch_ms(),
        });
    }

    /// Remove a terminal (error/stopped) entry from the registry.
    pub fn remove(&self, profile_id: &str) -> bool {
        let mut inner = self.inner.lock();
        match inner.get(profile_id) {
            Some(entry) if entry.instance.status.is_terminal() => {
                inner.remove(profile_id);
                true
            }
            _ => false,
        }
    }

    /// Pre-populate the registry with previously observed metadata.
    ///
    /// Hydrated entries are `stopped` and have no backend handle; nothing
    /// is respawned and no events are emitted.
    pub fn hydrate(&self, persisted: Vec<PersistedWorker>) {
        let now = self.clock.epoch_ms();
        let mut inner = self.inner.lock();
        for record in persisted {
            if inner.contains_key(record.profile_id.as_str()) {
                continue;
            }
            inner.insert(
                record.profile_id.clone(),
                WorkerEntry {
                    instance: WorkerInstance {
                        profile_id: record.profile_id,
                        pid: None,
                        port: record.port,
                        server_url: record.server_url,
                        session_id: record.session_id.unwrap_or_default(),
                        parent_session_id: None,
                        status: WorkerStatus::Stopped,
                        resolved_model: record.resolved_model.unwrap_or_default(),
                        model_reason: "hydrated".to_string(),
                        started_at_ms: record.stopped_at_ms.unwrap_or(now),
                        last_activity_ms: record.stopped_at_ms.unwrap_or(now),
                        current_task: None,
                        last_result: None,
                        error: None,
                        warning: None,
                    },
                    handle: None,
                    spawning: None,
                },
            );
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
