// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Model resolution against the provider catalog.
//!
//! [`resolve_model_ref`] is pure and deterministic: same reference + same
//! catalog, same answer. All model-selection policy lives here; callers
//! get back a canonical `provider/model` plus the reason it was picked.

use crate::suggest::{format_suggestion, nearest};
use async_trait::async_trait;
use maestro_core::{Clock, ModelCapabilities, ModelRef, ProviderCatalog};
use maestro_adapters::{RuntimeApi, RuntimeApiError};
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

/// How many nearest-name suggestions accompany a failed lookup.
const SUGGESTION_LIMIT: usize = 3;

/// How long a fetched catalog stays fresh.
const CATALOG_TTL_MS: u64 = 60_000;

/// A successful model resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Canonical `provider/model`.
    pub resolved: String,
    /// Why this model was selected.
    pub reason: String,
    pub capabilities: ModelCapabilities,
}

/// Model resolution failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResolveError {
    #[error("invalid model reference: {0}")]
    Invalid(String),
    #[error("{message}{}", format_suggestion(.suggestions))]
    Unavailable {
        message: String,
        suggestions: Vec<String>,
    },
    #[error("provider catalog unavailable: {0}")]
    Fetch(String),
}

impl ResolveError {
    fn unavailable(message: impl Into<String>) -> Self {
        ResolveError::Unavailable {
            message: message.into(),
            suggestions: Vec::new(),
        }
    }
}

/// Resolve a model reference string against the catalog.
pub fn resolve_model_ref(
    reference: &str,
    catalog: &ProviderCatalog,
) -> Result<Resolution, ResolveError> {
    let parsed = ModelRef::parse(reference)
        .ok_or_else(|| ResolveError::Invalid(reference.to_string()))?;

    match parsed {
        ModelRef::Auto => resolve_default(catalog),
        ModelRef::AutoFast => resolve_fast(catalog),
        ModelRef::AutoVision => resolve_vision(catalog),
        ModelRef::AutoDocs => resolve_docs(catalog),
        ModelRef::Explicit { provider, model } => resolve_explicit(catalog, &provider, &model),
    }
}

fn lookup(catalog: &ProviderCatalog, canonical: &str) -> Option<ModelCapabilities> {
    let (provider, model) = maestro_core::model::split_canonical(canonical)?;
    catalog.model(provider, model).map(|m| m.capabilities)
}

fn resolve_default(catalog: &ProviderCatalog) -> Result<Resolution, ResolveError> {
    let canonical = catalog
        .default_model
        .as_deref()
        .ok_or_else(|| ResolveError::unavailable("runtime has no default model configured"))?;
    let capabilities = lookup(catalog, canonical).ok_or_else(|| {
        ResolveError::unavailable(format!("default model {} is not in the catalog", canonical))
    })?;
    Ok(Resolution {
        resolved: canonical.to_string(),
        reason: "runtime default".to_string(),
        capabilities,
    })
}

fn resolve_fast(catalog: &ProviderCatalog) -> Result<Resolution, ResolveError> {
    if let Some(small) = catalog.small_model.as_deref() {
        if let Some(capabilities) = lookup(catalog, small) {
            return Ok(Resolution {
                resolved: small.to_string(),
                reason: "configured small model".to_string(),
                capabilities,
            });
        }
        tracing::warn!(small_model = small, "configured small model not in catalog");
    }

    // Score-pick the cheapest model with a known cost. Catalog order
    // breaks ties, so the pick is deterministic.
    let mut best: Option<(f64, String, ModelCapabilities)> = None;
    for provider in &catalog.providers {
        for (model_id, info) in &provider.models {
            let Some(cost) = info.cost else { continue };
            let canonical = format!("{}/{}", provider.id, model_id);
            if best.as_ref().is_none_or(|(c, _, _)| cost.input < *c) {
                best = Some((cost.input, canonical, info.capabilities));
            }
        }
    }
    let (_, resolved, capabilities) = best
        .ok_or_else(|| ResolveError::unavailable("no model with cost data for auto:fast"))?;
    Ok(Resolution {
        resolved,
        reason: "lowest cost".to_string(),
        capabilities,
    })
}

fn resolve_vision(catalog: &ProviderCatalog) -> Result<Resolution, ResolveError> {
    // The default model wins when it already supports images; otherwise
    // take the first vision-capable model in catalog order. Never
    // downgrade to a text-only model.
    if let Some(default) = catalog.default_model.as_deref() {
        if let Some(capabilities) = lookup(catalog, default) {
            if capabilities.vision {
                return Ok(Resolution {
                    resolved: default.to_string(),
                    reason: "runtime default (vision capable)".to_string(),
                    capabilities,
                });
            }
        }
    }
    for provider in &catalog.providers {
        for (model_id, info) in &provider.models {
            if info.capabilities.vision {
                return Ok(Resolution {
                    resolved: format!("{}/{}", provider.id, model_id),
                    reason: "vision capable".to_string(),
                    capabilities: info.capabilities,
                });
            }
        }
    }
    Err(ResolveError::unavailable(
        "no vision-capable model in the catalog",
    ))
}

fn resolve_docs(catalog: &ProviderCatalog) -> Result<Resolution, ResolveError> {
    // Largest context window among tool-calling models.
    let mut best: Option<(u64, String, ModelCapabilities)> = None;
    for provider in &catalog.providers {
        for (model_id, info) in &provider.models {
            if !info.capabilities.tools {
                continue;
            }
            let Some(context) = info.context_window else {
                continue;
            };
            let canonical = format!("{}/{}", provider.id, model_id);
            if best.as_ref().is_none_or(|(c, _, _)| context > *c) {
                best = Some((context, canonical, info.capabilities));
            }
        }
    }
    let (_, resolved, capabilities) = best.ok_or_else(|| {
        ResolveError::unavailable("no tool-calling model with context data for auto:docs")
    })?;
    Ok(Resolution {
        resolved,
        reason: "large context".to_string(),
        capabilities,
    })
}

fn resolve_explicit(
    catalog: &ProviderCatalog,
    provider_id: &str,
    model_id: &str,
) -> Result<Resolution, ResolveError> {
    let canonical = format!("{}/{}", provider_id, model_id);
    match catalog.provider(provider_id) {
        Some(provider) => {
            if let Some(info) = provider.models.get(model_id) {
                return Ok(Resolution {
                    resolved: canonical,
                    reason: "configured".to_string(),
                    capabilities: info.capabilities,
                });
            }
            // API-sourced providers accept model ids the catalog has not
            // seen, e.g. freshly released models.
            if provider.source == "api" {
                return Ok(Resolution {
                    resolved: canonical,
                    reason: "configured".to_string(),
                    capabilities: ModelCapabilities::default(),
                });
            }
            Err(ResolveError::Unavailable {
                message: format!("unknown model: {}", canonical),
                suggestions: nearest(&canonical, &catalog.canonical_ids(), SUGGESTION_LIMIT),
            })
        }
        None => Err(ResolveError::Unavailable {
            message: format!("unknown provider: {}", provider_id),
            suggestions: nearest(&canonical, &catalog.canonical_ids(), SUGGESTION_LIMIT),
        }),
    }
}

/// Source of the provider catalog.
///
/// The pool and task manager resolve models against whatever this hands
/// back; production uses [`RuntimeCatalog`], tests use [`StaticCatalog`].
#[async_trait]
pub trait CatalogSource: Clone + Send + Sync + 'static {
    async fn catalog(&self) -> Result<ProviderCatalog, ResolveError>;
}

/// Fixed catalog, for tests and config-pinned deployments.
#[derive(Clone)]
pub struct StaticCatalog(pub ProviderCatalog);

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn catalog(&self) -> Result<ProviderCatalog, ResolveError> {
        Ok(self.0.clone())
    }
}

/// Catalog fetched from the agent runtime, cached with a short TTL.
#[derive(Clone)]
pub struct RuntimeCatalog<R: RuntimeApi, C: Clock> {
    runtime: R,
    clock: C,
    cached: Arc<Mutex<Option<(ProviderCatalog, u64)>>>,
}

impl<R: RuntimeApi, C: Clock> RuntimeCatalog<R, C> {
    pub fn new(runtime: R, clock: C) -> Self {
        Self {
            runtime,
            clock,
            cached: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl<R: RuntimeApi, C: Clock> CatalogSource for RuntimeCatalog<R, C> {
    async fn catalog(&self) -> Result<ProviderCatalog, ResolveError> {
        let now = self.clock.epoch_ms();
        {
            let cached = self.cached.lock();
            if let Some((catalog, fetched_at)) = cached.as_ref() {
                if now.saturating_sub(*fetched_at) < CATALOG_TTL_MS {
                    return Ok(catalog.clone());
                }
            }
        }
        let catalog = self
            .runtime
            .providers()
            .await
            .map_err(|e: RuntimeApiError| ResolveError::Fetch(e.to_string()))?;
        *self.cached.lock() = Some((catalog.clone(), now));
        Ok(catalog)
    }
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
