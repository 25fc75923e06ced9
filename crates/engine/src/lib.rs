// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! maestro-engine: orchestration logic.
//!
//! Model resolution, profile resolution, the per-profile spawn lock, the
//! worker pool, the health monitor, and the task manager. Everything here
//! is generic over the backend, catalog source, and clock seams so the
//! whole engine runs against fakes in tests.

mod error;
mod health;
mod lock;
mod pool;
mod profiles;
mod prompts;
mod resolve;
mod suggest;
mod tasks;

pub use error::PoolError;
pub use health::{HealthMonitor, HEALTH_CHECK_INTERVAL, HEALTH_STRIKE_LIMIT};
pub use lock::{LockError, LockGuard, ProfileLock, STALE_LOCK_GRACE};
pub use pool::{EnsureOpts, PoolConfig, WorkerPool, STOP_GRACE};
pub use profiles::{builtin_profiles, ProfileOverlay, ProfileSet, ToolSetting};
pub use prompts::PromptStore;
pub use resolve::{
    resolve_model_ref, CatalogSource, Resolution, ResolveError, RuntimeCatalog, StaticCatalog,
};
pub use tasks::{
    AwaitOutcome, ListFormat, ListView, StartSpec, TaskManager, WorkflowDef, WorkflowStep,
    DEFAULT_AWAIT_TIMEOUT,
};
