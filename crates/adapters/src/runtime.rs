// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the agent runtime.
//!
//! The orchestrator drives runtime instances as black boxes over their
//! HTTP API: provider/model discovery, session creation, prompting, and
//! abort. One [`HttpRuntimeClient`] per runtime base URL; cheap to clone.

use async_trait::async_trait;
use maestro_core::ProviderCatalog;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default per-request timeout against a runtime.
pub const RUNTIME_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from runtime API calls.
#[derive(Debug, Error)]
pub enum RuntimeApiError {
    #[error("runtime unreachable: {0}")]
    Unreachable(String),
    #[error("runtime returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid runtime response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RuntimeApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RuntimeApiError::Decode(err.to_string())
        } else {
            RuntimeApiError::Unreachable(err.to_string())
        }
    }
}

/// Explicit model selection attached to a single prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSelector {
    #[serde(rename = "providerID")]
    pub provider_id: String,
    #[serde(rename = "modelID")]
    pub model_id: String,
}

impl ModelSelector {
    /// Split a canonical `provider/model` string.
    pub fn from_canonical(canonical: &str) -> Option<Self> {
        let (provider, model) = maestro_core::model::split_canonical(canonical)?;
        Some(Self {
            provider_id: provider.to_string(),
            model_id: model.to_string(),
        })
    }
}

/// One part of a prompt: text or a base64/data-url attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PromptPart {
    Text { text: String },
    Image { data: String },
    File { name: String, data: String },
}

/// Prompt payload sent to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRequest {
    pub parts: Vec<PromptPart>,
    /// Per-message model override; absent means the session default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelSelector>,
    /// Correlates bridge chunks back to the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

/// Session creation parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    /// Named agent to run the session under (agent backend).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_session_id: Option<String>,
    /// Session default model, canonical `provider/model`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// A created session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
}

/// The slice of the runtime HTTP API the orchestrator drives.
#[async_trait]
pub trait RuntimeApi: Clone + Send + Sync + 'static {
    /// Cheap liveness probe.
    async fn health(&self) -> Result<(), RuntimeApiError>;

    /// Fetch configured providers and default model choices.
    async fn providers(&self) -> Result<ProviderCatalog, RuntimeApiError>;

    /// Create a session.
    async fn create_session(
        &self,
        req: CreateSessionRequest,
    ) -> Result<SessionInfo, RuntimeApiError>;

    /// Send a prompt to a session. Returns once the runtime accepts it;
    /// output streams back through the bridge.
    async fn prompt(&self, session_id: &str, req: PromptRequest) -> Result<(), RuntimeApiError>;

    /// Abort the session's in-flight prompt.
    async fn abort(&self, session_id: &str) -> Result<(), RuntimeApiError>;
}

/// reqwest-backed [`RuntimeApi`] implementation.
#[derive(Clone)]
pub struct HttpRuntimeClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpRuntimeClient {
    /// Create a client for the runtime at `base_url` (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, RUNTIME_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RuntimeApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RuntimeApiError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl RuntimeApi for HttpRuntimeClient {
    async fn health(&self) -> Result<(), RuntimeApiError> {
        let response = self.http.get(self.url("/health")).send().await?;
        Self::check(response).await.map(|_| ())
    }

    async fn providers(&self) -> Result<ProviderCatalog, RuntimeApiError> {
        let response = self.http.get(self.url("/config/providers")).send().await?;
        let response = Self::check(response).await?;
        response
            .json::<ProviderCatalog>()
            .await
            .map_err(|e| RuntimeApiError::Decode(e.to_string()))
    }

    async fn create_session(
        &self,
        req: CreateSessionRequest,
    ) -> Result<SessionInfo, RuntimeApiError> {
        let response = self
            .http
            .post(self.url("/session"))
            .json(&req)
            .send()
            .await?;
        let response = Self::check(response).await?;
        response
            .json::<SessionInfo>()
            .await
            .map_err(|e| RuntimeApiError::Decode(e.to_string()))
    }

    async fn prompt(&self, session_id: &str, req: PromptRequest) -> Result<(), RuntimeApiError> {
        let response = self
            .http
            .post(self.url(&format!("/session/{}/prompt", session_id)))
            .json(&req)
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }

    async fn abort(&self, session_id: &str) -> Result<(), RuntimeApiError> {
        let response = self
            .http
            .post(self.url(&format!("/session/{}/abort", session_id)))
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
