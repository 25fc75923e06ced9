// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the scenario tests.

use maestro_adapters::FakeBackend;
use maestro_core::test_support::catalog_fixture;
use maestro_core::{Event, FakeClock, SequentialIdGen};
use maestro_daemon::{EventBus, Orchestrator};
use maestro_engine::{PoolConfig, ProfileSet, StaticCatalog, TaskManager, WorkerPool};
use std::sync::Arc;
use std::time::Duration;

pub type SpecManager = TaskManager<FakeBackend, StaticCatalog, FakeClock, SequentialIdGen>;
pub type SpecOrchestrator = Orchestrator<FakeBackend, StaticCatalog, FakeClock, SequentialIdGen>;

pub struct Harness {
    pub orchestrator: SpecOrchestrator,
    pub manager: Arc<SpecManager>,
    pub backend: FakeBackend,
    pub clock: FakeClock,
    pub bus: EventBus,
    _lock_dir: tempfile::TempDir,
}

pub fn harness() -> Harness {
    let backend = FakeBackend::new();
    let clock = FakeClock::new(1_700_000_000_000);
    let lock_dir = tempfile::tempdir().expect("tempdir");
    let bus = EventBus::new();
    let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel::<Event>();
    tokio::spawn(bus.clone().pump(event_rx));

    let pool = Arc::new(WorkerPool::new(
        backend.clone(),
        clock.clone(),
        event_tx.clone(),
        PoolConfig::new(lock_dir.path(), "http://127.0.0.1:7777", "spec-token"),
    ));
    let manager = Arc::new(TaskManager::new(
        pool,
        StaticCatalog(catalog_fixture()),
        clock.clone(),
        SequentialIdGen::new("t"),
        ProfileSet::resolve(&Default::default(), &Default::default()),
        Vec::new(),
        event_tx,
    ));
    let orchestrator = Orchestrator::new(
        Arc::clone(&manager),
        bus.clone(),
        maestro_daemon::LimitSettings::default(),
    );
    Harness {
        orchestrator,
        manager,
        backend,
        clock,
        bus,
        _lock_dir: lock_dir,
    }
}

/// Wait until the fake backend has received `n` prompts.
pub async fn wait_for_prompts(backend: &FakeBackend, n: usize) {
    for _ in 0..400 {
        if backend.prompts().len() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("backend never saw {} prompts", n);
}
