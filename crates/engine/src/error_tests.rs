// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

#[test]
fn resolve_unavailable_maps_with_hint() {
    let err = PoolError::Resolve(ResolveError::Unavailable {
        message: "unknown model: a/b".to_string(),
        suggestions: vec!["a/c".to_string(), "a/d".to_string()],
    });
    let body = err.to_error_body();
    assert_eq!(body.kind, maestro_core::ErrorKind::ModelUnavailable);
    assert_eq!(body.hint.as_deref(), Some("did you mean: a/c, a/d?"));
}

#[test]
fn incompatible_maps_with_force_new_hint() {
    let body = PoolError::Incompatible("model mismatch".to_string()).to_error_body();
    assert_eq!(body.kind, maestro_core::ErrorKind::IncompatibleWorker);
    assert!(body.hint.unwrap_or_default().contains("force_new"));
}

#[test]
fn spawn_errors_map_to_their_kinds() {
    let cases: Vec<(PoolError, maestro_core::ErrorKind)> = vec![
        (
            PoolError::Spawn(SpawnError::Timeout(Duration::from_secs(30))),
            maestro_core::ErrorKind::SpawnTimeout,
        ),
        (
            PoolError::Spawn(SpawnError::PortInUse(4242)),
            maestro_core::ErrorKind::PortInUse,
        ),
        (
            PoolError::Spawn(SpawnError::RuntimeMissing("opencode-runtime".to_string())),
            maestro_core::ErrorKind::RuntimeMissing,
        ),
    ];
    for (err, kind) in cases {
        assert_eq!(err.to_error_body().kind, kind);
    }
}

#[test]
fn lock_timeout_maps() {
    let err = PoolError::Lock(LockError::Timeout {
        profile: "coder".to_string(),
        waited: Duration::from_secs(5),
    });
    assert_eq!(
        err.to_error_body().kind,
        maestro_core::ErrorKind::LockTimeout
    );
}
