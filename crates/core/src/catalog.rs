// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provider/model catalog types.
//!
//! A derived view of the agent runtime's configured providers, refreshed
//! on demand and never persisted.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Capability flags reported for a model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCapabilities {
    /// Accepts image input.
    #[serde(default)]
    pub vision: bool,
    /// Supports tool calling.
    #[serde(default)]
    pub tools: bool,
}

/// Per-token cost, in dollars per million tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelCost {
    #[serde(default)]
    pub input: f64,
    #[serde(default)]
    pub output: f64,
}

/// A single model as reported by the runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub capabilities: ModelCapabilities,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<ModelCost>,
    /// Context window in tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window: Option<u64>,
}

/// A configured provider and its models, keyed by model id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Where the provider came from: `"config"`, `"env"`, or `"api"`.
    /// Providers of source `"api"` accept any model id even without a
    /// preconfigured key.
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub models: IndexMap<String, ModelInfo>,
}

/// The full provider view plus the runtime's default model choices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderCatalog {
    #[serde(default)]
    pub providers: Vec<Provider>,
    /// The runtime's configured default, canonical `provider/model`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    /// The runtime's configured small model, canonical `provider/model`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub small_model: Option<String>,
}

impl ProviderCatalog {
    /// Look up a provider by id.
    pub fn provider(&self, id: &str) -> Option<&Provider> {
        self.providers.iter().find(|p| p.id == id)
    }

    /// Look up a model by canonical `provider/model` halves.
    pub fn model(&self, provider: &str, model: &str) -> Option<&ModelInfo> {
        self.provider(provider).and_then(|p| p.models.get(model))
    }

    /// All canonical `provider/model` strings in the catalog.
    pub fn canonical_ids(&self) -> Vec<String> {
        self.providers
            .iter()
            .flat_map(|p| p.models.keys().map(move |m| format!("{}/{}", p.id, m)))
            .collect()
    }
}
