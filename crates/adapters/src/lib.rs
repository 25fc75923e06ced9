// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! maestro-adapters: seams to the outside world.
//!
//! Everything that talks to an agent runtime lives here, behind traits the
//! engine consumes: the runtime HTTP client ([`RuntimeApi`]), the worker
//! spawn strategies ([`WorkerBackend`]), and the local process probe.

pub mod backend;
pub mod probe;
pub mod runtime;

pub use backend::{
    AgentBackend, BackendError, DualBackend, PromptPayload, ServerBackend, ServerBackendConfig,
    SpawnError, SpawnRequest, SpawnedWorker, WorkerBackend,
};
pub use probe::{ProcessProbe, RuntimeProcess};
pub use runtime::{
    CreateSessionRequest, HttpRuntimeClient, ModelSelector, PromptPart, PromptRequest, RuntimeApi,
    RuntimeApiError, SessionInfo,
};

#[cfg(any(test, feature = "test-support"))]
pub use backend::{BackendCall, FakeBackend};
