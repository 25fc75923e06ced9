// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator settings, parsed from `maestro.toml`.
//!
//! Profile overlays and workflow definitions live here too; the engine's
//! resolver consumes them already parsed. The file is optional; a bare
//! deployment runs on builtins.

use maestro_engine::{ProfileOverlay, WorkflowDef};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// `[runtime]` section: how to reach/spawn agent runtimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Runtime executable spawned by the server backend.
    pub binary: String,
    /// Shared runtime URL used by the agent backend and the catalog.
    pub url: String,
    /// Seconds to wait for a spawned runtime to accept HTTP.
    pub spawn_timeout_secs: u64,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            binary: "opencode-runtime".to_string(),
            url: "http://127.0.0.1:4096".to_string(),
            spawn_timeout_secs: 30,
        }
    }
}

/// `[bridge]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// 0 lets the OS pick.
    pub port: u16,
    pub request_timeout_ms: u64,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            port: 0,
            request_timeout_ms: 10_000,
        }
    }
}

/// `[limits]` section: context injection and payload pruning bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    /// Workers listed in the injected system-prompt block.
    pub system_context_max_workers: usize,
    /// Tool inputs above this many bytes are pruned.
    pub max_tool_input_bytes: usize,
    /// Tool outputs above this many bytes are pruned.
    pub max_tool_output_bytes: usize,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            system_context_max_workers: 8,
            max_tool_input_bytes: 64 * 1024,
            max_tool_output_bytes: 256 * 1024,
        }
    }
}

/// Full orchestrator settings file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub runtime: RuntimeSettings,
    pub bridge: BridgeSettings,
    pub limits: LimitSettings,
    /// Global profile overlays, keyed by profile id.
    pub profiles: HashMap<String, ProfileOverlay>,
    /// Project profile overlays, merged after globals.
    pub project_profiles: HashMap<String, ProfileOverlay>,
    /// Profile-pinned ports.
    pub pinned_ports: HashMap<String, u16>,
    pub workflows: Vec<WorkflowDef>,
}

impl Settings {
    /// Load settings from a TOML file; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(SettingsError::Io(e)),
        };
        toml::from_str(&raw).map_err(|e| SettingsError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// Settings load failures. Fatal at startup (exit code 1).
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("cannot read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings in {path}: {message}")]
    Parse { path: String, message: String },
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
