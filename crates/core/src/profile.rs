// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker profile: the configuration record that fully describes a
//! worker's capability envelope and defaults.
//!
//! Profiles are immutable once resolved. The `model` field holds the raw
//! reference (tag or `provider/model`); resolution against the live
//! catalog happens at spawn time.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::string_id! {
    /// Stable identifier a worker is addressed by (e.g. `coder`, `vision`).
    pub struct ProfileId;
}

/// How a worker for this profile is run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerKind {
    /// Dedicated agent-runtime process with its own loopback port.
    Server,
    /// Child session inside the shared host runtime.
    Subagent,
}

/// Capability flags for a profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Capabilities {
    #[serde(default)]
    pub supports_vision: bool,
    #[serde(default)]
    pub supports_web: bool,
    #[serde(default)]
    pub inject_repo_context: bool,
}

/// Filesystem access level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FsAccess {
    Full,
    #[default]
    Read,
    None,
}

/// Command execution level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecAccess {
    Full,
    #[default]
    Sandboxed,
    None,
}

/// Network access level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetAccess {
    Full,
    #[default]
    Localhost,
    None,
}

/// Policy for a skill pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillPolicy {
    Allow,
    Ask,
    Deny,
}

/// A skill pattern with its policy.
///
/// Patterns support a trailing `*` glob (`git.*`); anything else matches
/// exactly. Defaults elsewhere: `ask` for mutating skills, `allow` for
/// read-only ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRule {
    pub pattern: String,
    pub policy: SkillPolicy,
}

impl SkillRule {
    /// Whether this rule's pattern matches the given skill name.
    pub fn matches(&self, skill: &str) -> bool {
        match self.pattern.strip_suffix('*') {
            Some(prefix) => skill.starts_with(prefix),
            None => self.pattern == skill,
        }
    }
}

/// Permission envelope mirrored into worker configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub filesystem: FsAccess,
    #[serde(default)]
    pub execution: ExecAccess,
    #[serde(default)]
    pub network: NetAccess,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_paths: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deny_paths: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<SkillRule>,
}

impl Permissions {
    /// Effective policy for a skill: first matching rule wins, `ask` when
    /// no rule matches.
    pub fn skill_policy(&self, skill: &str) -> SkillPolicy {
        self.skills
            .iter()
            .find(|r| r.matches(skill))
            .map(|r| r.policy)
            .unwrap_or(SkillPolicy::Ask)
    }
}

/// Pointer to a system prompt stored on disk.
///
/// Prompt text never lives inline in profiles; the engine's prompt store
/// loads and caches file contents by content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRef {
    pub path: PathBuf,
}

impl PromptRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// A fully resolved worker profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerProfile {
    pub id: ProfileId,
    pub name: String,
    /// Raw model reference: a tag (`auto`, `auto:vision`, ...) or an
    /// explicit `provider/model`.
    pub model: String,
    pub kind: WorkerKind,
    pub purpose: String,
    pub when_to_use: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<PromptRef>,
    #[serde(default)]
    pub capabilities: Capabilities,
    /// Normalized tool enablement, tool id -> enabled. Overlay values that
    /// arrive as objects are collapsed to their `enabled` flag before
    /// storage; consumers only ever see booleans.
    #[serde(default)]
    pub tools: IndexMap<String, bool>,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl WorkerProfile {
    /// Whether the profile's envelope can serve a task with the given
    /// attachment needs.
    pub fn satisfies(&self, needs_vision: bool) -> bool {
        !needs_vision || self.capabilities.supports_vision
    }
}

#[cfg(test)]
#[path = "profile_tests.rs"]
mod tests;
