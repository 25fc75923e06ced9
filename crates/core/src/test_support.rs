// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::catalog::{ModelCapabilities, ModelCost, ModelInfo, Provider, ProviderCatalog};
use crate::profile::{Capabilities, ProfileId, WorkerKind, WorkerProfile};

/// A provider fixture with the given models.
///
/// Each entry is `(model_id, vision, tools, context_window, input_cost)`.
pub fn provider_fixture(id: &str, models: &[(&str, bool, bool, u64, f64)]) -> Provider {
    Provider {
        id: id.to_string(),
        name: id.to_string(),
        source: "config".to_string(),
        models: models
            .iter()
            .map(|(m, vision, tools, context, input)| {
                (
                    m.to_string(),
                    ModelInfo {
                        name: m.to_string(),
                        capabilities: ModelCapabilities {
                            vision: *vision,
                            tools: *tools,
                        },
                        cost: Some(ModelCost {
                            input: *input,
                            output: *input * 4.0,
                        }),
                        context_window: Some(*context),
                    },
                )
            })
            .collect(),
    }
}

/// A two-provider catalog covering the tag-resolution cases: a default
/// model, a cheap fast model, a vision model, and a big-context model.
pub fn catalog_fixture() -> ProviderCatalog {
    ProviderCatalog {
        providers: vec![
            provider_fixture(
                "acme",
                &[
                    ("sonnet-4", false, true, 200_000, 3.0),
                    ("haiku-4", false, true, 200_000, 0.8),
                    ("opus-4", true, true, 500_000, 15.0),
                ],
            ),
            provider_fixture("zephyr", &[("z-mini", false, false, 32_000, 0.1)]),
        ],
        default_model: Some("acme/sonnet-4".to_string()),
        small_model: Some("acme/haiku-4".to_string()),
    }
}

/// A minimal server-kind profile fixture.
pub fn profile_fixture(id: &str) -> WorkerProfile {
    WorkerProfile {
        id: ProfileId::new(id),
        name: id.to_string(),
        model: "auto".to_string(),
        kind: WorkerKind::Server,
        purpose: format!("{} purpose", id),
        when_to_use: format!("use {} for tests", id),
        system_prompt: None,
        capabilities: Capabilities::default(),
        tools: Default::default(),
        permissions: Default::default(),
        tags: Vec::new(),
    }
}

/// A vision-capable profile fixture.
pub fn vision_profile_fixture(id: &str) -> WorkerProfile {
    let mut profile = profile_fixture(id);
    profile.model = "auto:vision".to_string();
    profile.capabilities.supports_vision = true;
    profile
}
