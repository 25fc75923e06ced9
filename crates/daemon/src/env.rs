// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment lookups used by the daemon.
//!
//! All `std::env::var` access for this crate funnels through here so the
//! recognized variables are greppable in one place: `MAESTRO_STATE_DIR`,
//! `MAESTRO_CONFIG`, `ORCH_BRIDGE_TIMEOUT_MS`.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve the state directory.
///
/// `MAESTRO_STATE_DIR` wins outright; otherwise the XDG state home (or
/// its `~/.local/state` fallback) gets a `maestro` subdirectory. With no
/// home at all there is nowhere to put state, which is fatal at startup.
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Some(explicit) = std::env::var_os("MAESTRO_STATE_DIR") {
        return Ok(PathBuf::from(explicit));
    }
    std::env::var_os("XDG_STATE_HOME")
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local/state"))
        })
        .map(|base| base.join("maestro"))
        .ok_or(LifecycleError::NoStateDir)
}

/// Explicit config file override.
pub fn config_path() -> Option<PathBuf> {
    std::env::var_os("MAESTRO_CONFIG").map(PathBuf::from)
}

/// Bridge request timeout override, in milliseconds.
pub fn bridge_timeout() -> Option<Duration> {
    let raw = std::env::var("ORCH_BRIDGE_TIMEOUT_MS").ok()?;
    raw.parse::<u64>().ok().map(Duration::from_millis)
}
