// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, hydration, shutdown.

use crate::bridge::{generate_token, Bridge, BridgeHandle, BridgeState, ChunkSink};
use crate::config::{Settings, SettingsError};
use crate::env;
use crate::event_bus::EventBus;
use crate::facade::Orchestrator;
use async_trait::async_trait;
use maestro_adapters::{
    AgentBackend, DualBackend, HttpRuntimeClient, ServerBackend, ServerBackendConfig,
};
use maestro_core::{PersistedWorker, SystemClock, UuidIdGen};
use maestro_engine::{
    HealthMonitor, PoolConfig, ProfileSet, RuntimeCatalog, TaskManager, WorkerPool,
};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Daemon composition with concrete adapter types.
pub type DaemonBackend = DualBackend<HttpRuntimeClient>;
pub type DaemonCatalog = RuntimeCatalog<HttpRuntimeClient, SystemClock>;
pub type DaemonTaskManager = TaskManager<DaemonBackend, DaemonCatalog, SystemClock, UuidIdGen>;
pub type DaemonOrchestrator = Orchestrator<DaemonBackend, DaemonCatalog, SystemClock, UuidIdGen>;

/// Lifecycle failures, mapped onto process exit codes by `maestrod`.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("cannot determine state directory (HOME unset)")]
    NoStateDir,
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot bind bridge port: {0}")]
    BridgeBind(std::io::Error),
}

/// Filesystem layout under the state directory.
#[derive(Debug, Clone)]
pub struct Paths {
    pub state_dir: PathBuf,
    pub config_path: PathBuf,
    pub lock_dir: PathBuf,
    pub log_path: PathBuf,
    /// Read-only worker-metadata snapshot written by the UI layer.
    pub snapshot_path: PathBuf,
}

impl Paths {
    /// Resolve paths from the environment.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = env::state_dir()?;
        Ok(Self {
            config_path: env::config_path().unwrap_or_else(|| state_dir.join("maestro.toml")),
            lock_dir: state_dir.join("locks"),
            log_path: state_dir.join("maestrod.log"),
            snapshot_path: state_dir.join("snapshot.json"),
            state_dir,
        })
    }
}

/// Chunk sink that forwards to the task manager once it exists.
///
/// The bridge must bind before the pool can be configured (workers need
/// the bridge URL in their env), so the sink is wired up after startup
/// completes. Chunks arriving in that window are dropped.
#[derive(Default)]
struct LateSink {
    inner: Mutex<Option<Arc<dyn ChunkSink>>>,
}

impl LateSink {
    fn set(&self, sink: Arc<dyn ChunkSink>) {
        *self.inner.lock() = Some(sink);
    }
}

#[async_trait]
impl ChunkSink for Arc<LateSink> {
    async fn ingest_chunk(&self, worker_id: &str, job_id: Option<&str>, chunk: String, last: bool) {
        let sink = self.inner.lock().clone();
        match sink {
            Some(sink) => sink.ingest_chunk(worker_id, job_id, chunk, last).await,
            None => warn!(worker_id, "dropping chunk received before startup finished"),
        }
    }
}

/// Result of daemon startup.
pub struct StartupResult {
    pub orchestrator: Arc<DaemonOrchestrator>,
    pub bridge: BridgeHandle,
    pub settings: Settings,
}

/// Bring the core up: settings, bridge, bus, pool, task manager, health
/// monitor.
pub async fn startup(paths: &Paths) -> Result<StartupResult, LifecycleError> {
    std::fs::create_dir_all(&paths.state_dir)?;
    let settings = Settings::load(&paths.config_path)?;
    let token = generate_token();
    let clock = SystemClock;

    let bus = EventBus::new();
    let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel();
    tokio::spawn(bus.clone().pump(event_rx));

    // Bridge first: workers need its URL in their spawn env.
    let late_sink = Arc::new(LateSink::default());
    let bridge_timeout = env::bridge_timeout()
        .unwrap_or(Duration::from_millis(settings.bridge.request_timeout_ms));
    let bridge_state = BridgeState::new(
        token.clone(),
        Arc::new(Arc::clone(&late_sink)) as Arc<dyn ChunkSink>,
        bus.clone(),
        bridge_timeout,
        Arc::new(|| {
            use maestro_core::Clock;
            SystemClock.epoch_ms()
        }),
    );
    let bridge = Bridge::start(settings.bridge.port, bridge_state)
        .await
        .map_err(LifecycleError::BridgeBind)?;

    let shared_runtime = HttpRuntimeClient::new(&settings.runtime.url);
    let backend = DualBackend::new(
        ServerBackend::new(ServerBackendConfig {
            runtime_binary: settings.runtime.binary.clone(),
            spawn_timeout: Duration::from_secs(settings.runtime.spawn_timeout_secs),
        }),
        AgentBackend::new(shared_runtime.clone()),
    );
    let mut pool_config = PoolConfig::new(&paths.lock_dir, bridge.url.clone(), token);
    pool_config.bridge_timeout_ms = bridge_timeout.as_millis() as u64;
    pool_config.pinned_ports = settings.pinned_ports.clone();
    let pool = Arc::new(WorkerPool::new(
        backend,
        clock.clone(),
        event_tx.clone(),
        pool_config,
    ));

    pool.hydrate(read_snapshot(&paths.snapshot_path));

    let catalog = RuntimeCatalog::new(shared_runtime, clock.clone());
    let profiles = ProfileSet::resolve(&settings.profiles, &settings.project_profiles);
    let manager = Arc::new(TaskManager::new(
        Arc::clone(&pool),
        catalog,
        clock,
        UuidIdGen,
        profiles,
        settings.workflows.clone(),
        event_tx,
    ));
    late_sink.set(Arc::new(Arc::clone(&manager)) as Arc<dyn ChunkSink>);

    tokio::spawn(HealthMonitor::new(Arc::clone(&pool)).run());

    let orchestrator = Arc::new(Orchestrator::new(
        manager,
        bus,
        settings.limits.clone(),
    ));

    info!(
        state_dir = %paths.state_dir.display(),
        bridge_url = %bridge.url,
        profiles = orchestrator.manager().profiles().len(),
        "orchestrator started"
    );

    Ok(StartupResult {
        orchestrator,
        bridge,
        settings,
    })
}

/// Graceful shutdown: cancel in-flight tasks, stop workers, close the
/// bridge.
pub async fn shutdown(result: &StartupResult) {
    let manager = result.orchestrator.manager();
    let open: Vec<maestro_core::TaskId> = manager
        .tasks()
        .into_iter()
        .filter(|t| !t.status.is_terminal())
        .map(|t| t.task_id)
        .collect();
    for task_id in open {
        if let Err(e) = manager.cancel(&task_id).await {
            warn!(task_id = %task_id, error = %e, "cancel during shutdown failed");
        }
    }

    if let Err(e) = manager.pool().stop_all().await {
        warn!(error = %e, "stopping workers during shutdown failed");
    }
    result.bridge.shutdown();
    info!("orchestrator stopped");
}

/// Read the persisted worker-metadata snapshot. The core never writes
/// it; a missing or malformed file hydrates nothing.
fn read_snapshot(path: &std::path::Path) -> Vec<PersistedWorker> {
    let Ok(raw) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    #[derive(serde::Deserialize)]
    struct Snapshot {
        #[serde(default)]
        workers: Vec<PersistedWorker>,
    }
    match serde_json::from_str::<Snapshot>(&raw) {
        Ok(snapshot) => snapshot.workers,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring malformed snapshot");
            Vec::new()
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
