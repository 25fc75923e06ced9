// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Profile resolution: builtin table merged with user and project
//! overlays.
//!
//! Merge is field-wise deep-merge with arrays replaced, never
//! concatenated. Heterogeneous tool values (bare booleans or
//! `{ enabled = ... }` tables) are normalized to booleans before storage.

use crate::suggest::{format_suggestion, nearest};
use indexmap::IndexMap;
use maestro_core::{
    Capabilities, ErrorBody, ErrorKind, Permissions, ProfileId, PromptRef, WorkerKind,
    WorkerProfile,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// A tool enablement value as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolSetting {
    Enabled(bool),
    Detailed {
        enabled: bool,
    },
}

impl ToolSetting {
    fn enabled(&self) -> bool {
        match self {
            ToolSetting::Enabled(enabled) => *enabled,
            ToolSetting::Detailed { enabled } => *enabled,
        }
    }
}

/// Partial profile from a configuration overlay. All fields optional;
/// absent fields keep the value from the layer below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileOverlay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<WorkerKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_to_use: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_vision: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_web: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inject_repo_context: Option<bool>,
    /// Merged by key into the layer below.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub tools: IndexMap<String, ToolSetting>,
    /// Replaces the layer below wholesale when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
    /// Replaces the layer below wholesale when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Apply one overlay on top of a profile.
fn apply_overlay(profile: &mut WorkerProfile, overlay: &ProfileOverlay) {
    if let Some(name) = &overlay.name {
        profile.name = name.clone();
    }
    if let Some(model) = &overlay.model {
        profile.model = model.clone();
    }
    if let Some(kind) = overlay.kind {
        profile.kind = kind;
    }
    if let Some(purpose) = &overlay.purpose {
        profile.purpose = purpose.clone();
    }
    if let Some(when_to_use) = &overlay.when_to_use {
        profile.when_to_use = when_to_use.clone();
    }
    if let Some(path) = &overlay.system_prompt {
        profile.system_prompt = Some(PromptRef::new(path.clone()));
    }
    if let Some(vision) = overlay.supports_vision {
        profile.capabilities.supports_vision = vision;
    }
    if let Some(web) = overlay.supports_web {
        profile.capabilities.supports_web = web;
    }
    if let Some(repo) = overlay.inject_repo_context {
        profile.capabilities.inject_repo_context = repo;
    }
    for (tool, setting) in &overlay.tools {
        profile.tools.insert(tool.clone(), setting.enabled());
    }
    if let Some(permissions) = &overlay.permissions {
        profile.permissions = permissions.clone();
    }
    if let Some(tags) = &overlay.tags {
        profile.tags = tags.clone();
    }
}

fn builtin(
    id: &str,
    model: &str,
    purpose: &str,
    when_to_use: &str,
    capabilities: Capabilities,
    tags: &[&str],
) -> WorkerProfile {
    WorkerProfile {
        id: ProfileId::new(id),
        name: id.to_string(),
        model: model.to_string(),
        kind: WorkerKind::Server,
        purpose: purpose.to_string(),
        when_to_use: when_to_use.to_string(),
        system_prompt: None,
        capabilities,
        tools: IndexMap::new(),
        permissions: Permissions::default(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

/// The builtin profile table.
pub fn builtin_profiles() -> Vec<WorkerProfile> {
    vec![
        builtin(
            "coder",
            "auto",
            "Writes and edits code",
            "Implementation work: new code, refactors, bug fixes",
            Capabilities {
                inject_repo_context: true,
                ..Capabilities::default()
            },
            &["code", "default"],
        ),
        builtin(
            "vision",
            "auto:vision",
            "Analyzes images and screenshots",
            "Any task whose input includes an image attachment",
            Capabilities {
                supports_vision: true,
                ..Capabilities::default()
            },
            &["vision"],
        ),
        builtin(
            "docs",
            "auto:docs",
            "Reads and writes documentation",
            "Long documents, summaries, doc generation",
            Capabilities {
                supports_web: true,
                ..Capabilities::default()
            },
            &["docs"],
        ),
        builtin(
            "general",
            "auto:fast",
            "Quick general-purpose helper",
            "Short questions and glue work that needs no specialist",
            Capabilities::default(),
            &["general"],
        ),
    ]
}

/// Resolved profiles, ready for the pool.
#[derive(Debug, Clone, Default)]
pub struct ProfileSet {
    profiles: IndexMap<ProfileId, WorkerProfile>,
}

impl ProfileSet {
    /// Merge builtins with global and project overlays.
    ///
    /// Overlay keys that do not match a builtin define new profiles from
    /// scratch (server kind, `auto` model) before the overlay applies.
    pub fn resolve(
        globals: &HashMap<String, ProfileOverlay>,
        projects: &HashMap<String, ProfileOverlay>,
    ) -> Self {
        let mut profiles: IndexMap<ProfileId, WorkerProfile> = builtin_profiles()
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        for layer in [globals, projects] {
            let mut ids: Vec<&String> = layer.keys().collect();
            ids.sort();
            for id in ids {
                let overlay = &layer[id];
                let profile = profiles.entry(ProfileId::new(id.clone())).or_insert_with(|| {
                    builtin(id, "auto", "", "", Capabilities::default(), &[])
                });
                apply_overlay(profile, overlay);
            }
        }

        Self { profiles }
    }

    /// Look up a profile, with nearest-name suggestions on failure.
    pub fn get(&self, id: &str) -> Result<&WorkerProfile, ErrorBody> {
        if let Some(profile) = self.profiles.get(id) {
            return Ok(profile);
        }
        let known: Vec<String> = self.profiles.keys().map(|k| k.to_string()).collect();
        let similar = nearest(id, &known, 3);
        let mut error = ErrorBody::new(ErrorKind::ConfigInvalid, format!("unknown worker: {}", id));
        if !similar.is_empty() {
            error = error.with_hint(format_suggestion(&similar).trim().to_string());
        }
        Err(error)
    }

    pub fn list(&self) -> impl Iterator<Item = &WorkerProfile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
#[path = "profiles_tests.rs"]
mod tests;
