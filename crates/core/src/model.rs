// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Model reference parsing.
//!
//! A model reference is either a symbolic tag (`auto`, `auto:fast`,
//! `auto:vision`, `auto:docs`) resolved against the live provider catalog,
//! or an explicit `provider/model` pair accepted as configured. The legacy
//! `node` spelling of each tag is accepted as an alias.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A parsed model reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelRef {
    /// The runtime's configured default model.
    Auto,
    /// Cheapest low-latency model (prefers the runtime's small model).
    AutoFast,
    /// A model with image input capability. Never silently downgraded.
    AutoVision,
    /// Large context window plus tool calling.
    AutoDocs,
    /// Explicit `provider/model`, accepted as configured.
    Explicit { provider: String, model: String },
}

impl ModelRef {
    /// Parse a model reference string.
    ///
    /// Returns `None` for strings that are neither a known tag nor a
    /// `provider/model` pair with non-empty halves.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        match s {
            "auto" | "node" => return Some(ModelRef::Auto),
            "auto:fast" | "node:fast" => return Some(ModelRef::AutoFast),
            "auto:vision" | "node:vision" => return Some(ModelRef::AutoVision),
            "auto:docs" | "node:docs" => return Some(ModelRef::AutoDocs),
            _ => {}
        }
        let (provider, model) = s.split_once('/')?;
        if provider.is_empty() || model.is_empty() {
            return None;
        }
        Some(ModelRef::Explicit {
            provider: provider.to_string(),
            model: model.to_string(),
        })
    }

    /// True for the symbolic tags (everything except `Explicit`).
    pub fn is_tag(&self) -> bool {
        !matches!(self, ModelRef::Explicit { .. })
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelRef::Auto => write!(f, "auto"),
            ModelRef::AutoFast => write!(f, "auto:fast"),
            ModelRef::AutoVision => write!(f, "auto:vision"),
            ModelRef::AutoDocs => write!(f, "auto:docs"),
            ModelRef::Explicit { provider, model } => write!(f, "{}/{}", provider, model),
        }
    }
}

/// Split a canonical `provider/model` string into its halves.
///
/// Returns `None` when either half is empty or the slash is missing.
pub fn split_canonical(s: &str) -> Option<(&str, &str)> {
    let (provider, model) = s.split_once('/')?;
    if provider.is_empty() || model.is_empty() {
        return None;
    }
    Some((provider, model))
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
