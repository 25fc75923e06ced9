// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator facade: binds a host session to the core.
//!
//! Registers exactly five tools with the host (`task_start`,
//! `task_await`, `task_peek`, `task_list`, `task_cancel`), renders the
//! bounded available-workers block for the host's system prompt, and
//! prunes oversized tool payloads. All worker management is expressed as
//! `kind = "op"` inside `task_start`; no other tools exist.

use crate::config::LimitSettings;
use crate::event_bus::EventBus;
use maestro_adapters::WorkerBackend;
use maestro_core::{Clock, ErrorBody, ErrorKind, IdGen, TaskId};
use maestro_engine::{
    AwaitOutcome, CatalogSource, ListFormat, ListView, StartSpec, TaskManager,
    DEFAULT_AWAIT_TIMEOUT,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// A tool registered with the host session.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct AwaitArgs {
    #[serde(default, alias = "taskId")]
    task_id: Option<String>,
    #[serde(default, alias = "taskIds")]
    task_ids: Vec<String>,
    #[serde(default, alias = "timeoutMs")]
    timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PeekArgs {
    #[serde(alias = "taskId")]
    task_id: String,
}

#[derive(Debug, Deserialize)]
struct ListArgs {
    #[serde(default)]
    view: Option<String>,
    #[serde(default)]
    format: Option<String>,
}

/// The core bound to one orchestrator process, exposed to host sessions.
pub struct Orchestrator<B, S, C, G>
where
    B: WorkerBackend,
    S: CatalogSource,
    C: Clock,
    G: IdGen + 'static,
{
    manager: Arc<TaskManager<B, S, C, G>>,
    bus: EventBus,
    limits: LimitSettings,
}

impl<B, S, C, G> Orchestrator<B, S, C, G>
where
    B: WorkerBackend,
    S: CatalogSource,
    C: Clock,
    G: IdGen + 'static,
{
    pub fn new(manager: Arc<TaskManager<B, S, C, G>>, bus: EventBus, limits: LimitSettings) -> Self {
        Self {
            manager,
            bus,
            limits,
        }
    }

    pub fn manager(&self) -> &Arc<TaskManager<B, S, C, G>> {
        &self.manager
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The five Task API tools, with JSON-schema inputs.
    pub fn tool_definitions(&self) -> Vec<ToolDef> {
        vec![
            ToolDef {
                name: "task_start",
                description: "Start a task on a worker, workflow, or management op. \
                              Returns immediately; follow up with task_await.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "kind": { "type": "string", "enum": ["worker", "workflow", "op"] },
                        "workerId": { "type": "string" },
                        "workflowId": { "type": "string" },
                        "op": { "type": "string" },
                        "task": { "type": "string" },
                        "attachments": { "type": "array", "items": { "type": "object" } },
                        "model": { "type": "string" },
                        "modelPolicy": { "type": "string", "enum": ["sticky", "dynamic"] },
                        "forceNew": { "type": "boolean" }
                    },
                    "required": ["kind"]
                }),
            },
            ToolDef {
                name: "task_await",
                description: "Block until the given task(s) reach a terminal state or the \
                              timeout elapses. Level-triggered and repeatable.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "taskId": { "type": "string" },
                        "taskIds": { "type": "array", "items": { "type": "string" } },
                        "timeoutMs": { "type": "integer", "minimum": 0 }
                    }
                }),
            },
            ToolDef {
                name: "task_peek",
                description: "Snapshot a task's status and accumulated output without blocking.",
                input_schema: json!({
                    "type": "object",
                    "properties": { "taskId": { "type": "string" } },
                    "required": ["taskId"]
                }),
            },
            ToolDef {
                name: "task_list",
                description: "List tasks, workers, or tags.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "view": { "type": "string", "enum": ["tasks", "workers", "tags"] },
                        "format": { "type": "string", "enum": ["markdown", "json"] }
                    }
                }),
            },
            ToolDef {
                name: "task_cancel",
                description: "Cancel a task and abort its worker's in-flight prompt.",
                input_schema: json!({
                    "type": "object",
                    "properties": { "taskId": { "type": "string" } },
                    "required": ["taskId"]
                }),
            },
        ]
    }

    /// Route a tool invocation to the task manager.
    pub async fn dispatch(&self, tool: &str, args: Value) -> Value {
        match self.dispatch_inner(tool, args).await {
            Ok(value) => value,
            Err(error) => json!({ "error": error }),
        }
    }

    async fn dispatch_inner(&self, tool: &str, args: Value) -> Result<Value, ErrorBody> {
        match tool {
            "task_start" => {
                let spec: StartSpec = serde_json::from_value(args).map_err(|e| {
                    ErrorBody::new(ErrorKind::ConfigInvalid, format!("invalid arguments: {}", e))
                })?;
                let task_id = self.manager.start(spec)?;
                Ok(json!({ "taskId": task_id, "next": "task_await" }))
            }
            "task_await" => {
                let args: AwaitArgs = parse_args(args)?;
                let mut ids: Vec<TaskId> = args.task_ids.iter().map(TaskId::new).collect();
                if let Some(id) = args.task_id {
                    ids.insert(0, TaskId::new(id));
                }
                if ids.is_empty() {
                    return Err(ErrorBody::new(
                        ErrorKind::ConfigInvalid,
                        "taskId or taskIds is required",
                    ));
                }
                let timeout = args
                    .timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or(DEFAULT_AWAIT_TIMEOUT);
                let outcomes: Vec<AwaitOutcome> =
                    self.manager.await_tasks(&ids, Some(timeout)).await;
                Ok(json!({ "tasks": outcomes }))
            }
            "task_peek" => {
                let args: PeekArgs = parse_args(args)?;
                let task = self.manager.peek(&TaskId::new(args.task_id))?;
                Ok(serde_json::to_value(task).unwrap_or_default())
            }
            "task_list" => {
                let args: ListArgs = parse_args(args)?;
                let view = match args.view.as_deref() {
                    None => ListView::Tasks,
                    Some(raw) => ListView::parse(raw).ok_or_else(|| {
                        ErrorBody::new(ErrorKind::ConfigInvalid, format!("unknown view: {}", raw))
                    })?,
                };
                let format = match args.format.as_deref() {
                    None => ListFormat::Markdown,
                    Some(raw) => ListFormat::parse(raw).ok_or_else(|| {
                        ErrorBody::new(
                            ErrorKind::ConfigInvalid,
                            format!("unknown format: {}", raw),
                        )
                    })?,
                };
                Ok(json!({ "content": self.manager.list(view, format) }))
            }
            "task_cancel" => {
                let args: PeekArgs = parse_args(args)?;
                let outcome = self.manager.cancel(&TaskId::new(args.task_id)).await?;
                Ok(serde_json::to_value(outcome).unwrap_or_default())
            }
            other => Err(ErrorBody::new(
                ErrorKind::ConfigInvalid,
                format!("unknown tool: {}", other),
            )),
        }
    }

    /// Render the bounded available-workers block injected into the
    /// host's system prompt.
    pub fn workers_context(&self) -> String {
        let max = self.limits.system_context_max_workers;
        let mut out = String::from("## Available workers\n");
        for profile in self.manager.profiles().list().take(max) {
            let live = self
                .manager
                .pool()
                .get(profile.id.as_str())
                .map(|w| format!("{} on {}", w.status, w.resolved_model));
            out.push_str(&format!(
                "- `{}`: {}. Use when: {}{}\n",
                profile.id,
                profile.purpose,
                profile.when_to_use,
                live.map(|l| format!(" ({})", l)).unwrap_or_default(),
            ));
        }
        let total = self.manager.profiles().len();
        if total > max {
            out.push_str(&format!("- ... and {} more\n", total - max));
        }
        out
    }

    /// Truncate an oversized tool payload, keeping the head and noting
    /// the cut.
    pub fn prune_payload(&self, text: &str, limit: usize) -> String {
        prune_payload(text, limit)
    }

    /// Configured pruning thresholds.
    pub fn limits(&self) -> &LimitSettings {
        &self.limits
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(args: Value) -> Result<T, ErrorBody> {
    serde_json::from_value(args)
        .map_err(|e| ErrorBody::new(ErrorKind::ConfigInvalid, format!("invalid arguments: {}", e)))
}

/// Cut `text` down to at most `limit` bytes on a char boundary, with a
/// marker describing how much was dropped.
pub fn prune_payload(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut cut = limit;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!(
        "{}\n... [pruned {} bytes]",
        &text[..cut],
        text.len() - cut
    )
}

#[cfg(test)]
#[path = "facade_tests.rs"]
mod tests;
