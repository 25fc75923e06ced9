// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error types and their mapping onto the wire taxonomy.

use crate::lock::LockError;
use crate::resolve::ResolveError;
use maestro_adapters::{BackendError, SpawnError};
use maestro_core::{ErrorBody, ErrorKind};
use thiserror::Error;

/// Errors from the pool's ensure/stop paths.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("incompatible worker: {0}")]
    Incompatible(String),
    #[error("{0}")]
    Failed(ErrorBody),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl PoolError {
    /// Map onto the stable error taxonomy for task results and events.
    pub fn to_error_body(&self) -> ErrorBody {
        match self {
            PoolError::ConfigInvalid(msg) => ErrorBody::new(ErrorKind::ConfigInvalid, msg),
            PoolError::Resolve(err) => match err {
                ResolveError::Invalid(msg) => ErrorBody::new(
                    ErrorKind::ConfigInvalid,
                    format!("invalid model reference: {}", msg),
                ),
                ResolveError::Unavailable {
                    message,
                    suggestions,
                } => {
                    let mut body = ErrorBody::new(ErrorKind::ModelUnavailable, message);
                    if !suggestions.is_empty() {
                        body = body.with_hint(format!("did you mean: {}?", suggestions.join(", ")));
                    }
                    body
                }
                ResolveError::Fetch(msg) => ErrorBody::new(ErrorKind::ModelUnavailable, msg),
            },
            PoolError::Incompatible(msg) => ErrorBody::new(ErrorKind::IncompatibleWorker, msg)
                .with_hint("pass force_new to replace the worker"),
            PoolError::Failed(body) => body.clone(),
            PoolError::Lock(err) => ErrorBody::new(ErrorKind::LockTimeout, err.to_string()),
            PoolError::Spawn(err) => match err {
                SpawnError::Timeout(_) => ErrorBody::new(ErrorKind::SpawnTimeout, err.to_string()),
                SpawnError::PortInUse(_) => ErrorBody::new(ErrorKind::PortInUse, err.to_string()),
                SpawnError::RuntimeMissing(_) => {
                    ErrorBody::new(ErrorKind::RuntimeMissing, err.to_string())
                }
                SpawnError::ConfigInvalid(_) => {
                    ErrorBody::new(ErrorKind::ConfigInvalid, err.to_string())
                }
                SpawnError::Session(_) | SpawnError::Io(_) => {
                    ErrorBody::new(ErrorKind::SpawnTimeout, err.to_string())
                }
            },
            PoolError::Backend(err) => {
                ErrorBody::new(ErrorKind::WorkerUnreachable, err.to_string())
            }
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
