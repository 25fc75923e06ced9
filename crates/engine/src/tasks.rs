// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Task API: start, await, peek, list, cancel.
//!
//! Tasks map prompts onto pool workers. Per worker, at most one prompt is
//! in flight; additional tasks queue FIFO and are pumped as the worker
//! returns to ready. Chunks arrive from the bridge in order; the terminal
//! result is the chunk concatenation. Errors inside a task are never
//! fatal to the orchestrator: they become a terminal `failed` state.

use crate::error::PoolError;
use crate::pool::{EnsureOpts, WorkerPool};
use crate::profiles::ProfileSet;
use crate::resolve::CatalogSource;
use maestro_adapters::{PromptPart, PromptPayload, WorkerBackend};
use maestro_core::{
    Attachment, Clock, ErrorBody, ErrorKind, Event, IdGen, LastResult, ModelPolicy, ProfileId,
    Task, TaskId, TaskKind, TaskStatus, WorkerStatus,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Default `task_await` deadline when the caller passes none.
pub const DEFAULT_AWAIT_TIMEOUT: Duration = Duration::from_secs(600);

/// The fixed op registry. Ops never touch the agent runtime directly.
const OPS: &[&str] = &[
    "worker.model.set",
    "worker.model.reset",
    "worker.stop",
    "worker.list",
];

/// Inputs to `task_start`.
#[derive(Debug, Clone, Deserialize)]
pub struct StartSpec {
    pub kind: TaskKind,
    #[serde(default, alias = "workerId")]
    pub worker_id: Option<String>,
    #[serde(default, alias = "workflowId")]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub op: Option<String>,
    /// The prompt (or op argument) text.
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, alias = "modelPolicy")]
    pub model_policy: ModelPolicy,
    #[serde(default, alias = "forceNew")]
    pub force_new: bool,
}

impl StartSpec {
    /// A plain worker prompt.
    pub fn worker(worker_id: &str, task: &str) -> Self {
        Self {
            kind: TaskKind::Worker,
            worker_id: Some(worker_id.to_string()),
            workflow_id: None,
            op: None,
            task: task.to_string(),
            attachments: Vec::new(),
            model: None,
            model_policy: ModelPolicy::default(),
            force_new: false,
        }
    }

    /// A management op.
    pub fn op(op: &str, worker_id: Option<&str>) -> Self {
        Self {
            kind: TaskKind::Op,
            worker_id: worker_id.map(str::to_string),
            workflow_id: None,
            op: Some(op.to_string()),
            task: String::new(),
            attachments: Vec::new(),
            model: None,
            model_policy: ModelPolicy::default(),
            force_new: false,
        }
    }

    /// A workflow run.
    pub fn workflow(workflow_id: &str, task: &str) -> Self {
        Self {
            kind: TaskKind::Workflow,
            worker_id: None,
            workflow_id: Some(workflow_id.to_string()),
            op: None,
            task: task.to_string(),
            attachments: Vec::new(),
            model: None,
            model_policy: ModelPolicy::default(),
            force_new: false,
        }
    }
}

/// Terminal (or timed-out) view of a task returned by `task_await`.
#[derive(Debug, Clone, Serialize)]
pub struct AwaitOutcome {
    pub task_id: TaskId,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// `task_list` views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListView {
    Tasks,
    Workers,
    Tags,
}

impl ListView {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tasks" => Some(ListView::Tasks),
            "workers" => Some(ListView::Workers),
            "tags" => Some(ListView::Tags),
            _ => None,
        }
    }
}

/// `task_list` output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
    Markdown,
    Json,
}

impl ListFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "markdown" => Some(ListFormat::Markdown),
            "json" => Some(ListFormat::Json),
            _ => None,
        }
    }
}

/// One step of a workflow: a worker plus a prompt template.
///
/// Templates may reference `{input}` (the workflow's prompt) and
/// `{previous}` (the previous step's response).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub worker: String,
    pub task: String,
}

/// A named sequence of worker steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDef {
    pub id: String,
    pub steps: Vec<WorkflowStep>,
}

struct TaskEntry {
    task: Task,
    done: Arc<Notify>,
}

#[derive(Default)]
struct TaskState {
    tasks: HashMap<TaskId, TaskEntry>,
    /// FIFO of tasks waiting per profile.
    queues: HashMap<ProfileId, VecDeque<TaskId>>,
    /// Task currently prompted per profile.
    in_flight: HashMap<ProfileId, TaskId>,
}

/// Owns all tasks and mediates between callers and workers.
pub struct TaskManager<B, S, C, G>
where
    B: WorkerBackend,
    S: CatalogSource,
    C: Clock,
    G: IdGen + 'static,
{
    pool: Arc<WorkerPool<B, C>>,
    catalog: S,
    clock: C,
    idgen: G,
    profiles: ProfileSet,
    workflows: HashMap<String, WorkflowDef>,
    event_tx: tokio::sync::mpsc::UnboundedSender<Event>,
    inner: Mutex<TaskState>,
}

impl<B, S, C, G> TaskManager<B, S, C, G>
where
    B: WorkerBackend,
    S: CatalogSource,
    C: Clock,
    G: IdGen + 'static,
{
    pub fn new(
        pool: Arc<WorkerPool<B, C>>,
        catalog: S,
        clock: C,
        idgen: G,
        profiles: ProfileSet,
        workflows: Vec<WorkflowDef>,
        event_tx: tokio::sync::mpsc::UnboundedSender<Event>,
    ) -> Self {
        Self {
            pool,
            catalog,
            clock,
            idgen,
            profiles,
            workflows: workflows.into_iter().map(|w| (w.id.clone(), w)).collect(),
            event_tx,
            inner: Mutex::new(TaskState::default()),
        }
    }

    pub fn pool(&self) -> &Arc<WorkerPool<B, C>> {
        &self.pool
    }

    pub fn profiles(&self) -> &ProfileSet {
        &self.profiles
    }

    fn emit(&self, event: Event) {
        let _ = self.event_tx.send(event);
    }

    // ── start ──────────────────────────────────────────────────────────

    /// Validate and register a task, then dispatch it in the background.
    ///
    /// Returns synchronously with the task id; callers follow up with
    /// `task_await`. Validation failures (unknown worker, op, or
    /// workflow) fail here, before a task record exists.
    pub fn start(self: &Arc<Self>, spec: StartSpec) -> Result<TaskId, ErrorBody> {
        match spec.kind {
            TaskKind::Worker => {
                let worker_id = spec.worker_id.as_deref().ok_or_else(|| {
                    ErrorBody::new(ErrorKind::ConfigInvalid, "worker_id is required")
                })?;
                self.profiles.get(worker_id)?;
            }
            TaskKind::Workflow => {
                let workflow_id = spec.workflow_id.as_deref().ok_or_else(|| {
                    ErrorBody::new(ErrorKind::ConfigInvalid, "workflow_id is required")
                })?;
                if !self.workflows.contains_key(workflow_id) {
                    return Err(ErrorBody::new(
                        ErrorKind::ConfigInvalid,
                        format!("unknown workflow: {}", workflow_id),
                    ));
                }
            }
            TaskKind::Op => {
                let op = spec
                    .op
                    .as_deref()
                    .ok_or_else(|| ErrorBody::new(ErrorKind::ConfigInvalid, "op is required"))?;
                if !OPS.contains(&op) {
                    return Err(ErrorBody::new(
                        ErrorKind::ConfigInvalid,
                        format!("unknown op: {}", op),
                    )
                    .with_hint(format!("known ops: {}", OPS.join(", "))));
                }
            }
        }

        // Surface malformed model references synchronously.
        if let Some(model) = spec.model.as_deref() {
            if maestro_core::ModelRef::parse(model).is_none() {
                return Err(ErrorBody::new(
                    ErrorKind::ConfigInvalid,
                    format!("invalid model reference: {}", model),
                ));
            }
        }

        let task_id = TaskId::new(self.idgen.next());
        let mut task = Task::new(task_id.clone(), spec.kind, spec.task.clone(), &self.clock);
        task.worker_id = spec.worker_id.as_deref().map(ProfileId::new);
        task.workflow_id = spec.workflow_id.clone();
        task.op = spec.op.clone();
        task.attachments = spec.attachments.clone();
        task.model_override = spec.model.clone();
        task.model_policy = spec.model_policy;

        {
            let mut inner = self.inner.lock();
            inner.tasks.insert(
                task_id.clone(),
                TaskEntry {
                    task,
                    done: Arc::new(Notify::new()),
                },
            );
        }

        tracing::info!(task_id = %task_id, kind = ?spec.kind, "task started");

        let manager = Arc::clone(self);
        let id = task_id.clone();
        tokio::spawn(async move {
            match spec.kind {
                TaskKind::Worker => manager.dispatch_worker(id, spec).await,
                TaskKind::Workflow => manager.dispatch_workflow(id, spec).await,
                TaskKind::Op => manager.dispatch_op(id, spec).await,
            }
        });

        Ok(task_id)
    }

    // ── worker dispatch ────────────────────────────────────────────────

    async fn dispatch_worker(self: Arc<Self>, task_id: TaskId, spec: StartSpec) {
        let Some(worker_id) = spec.worker_id.as_deref() else {
            return;
        };
        let profile = match self.profiles.get(worker_id) {
            Ok(profile) => profile.clone(),
            Err(body) => return self.fail_task(&task_id, body).await,
        };

        let catalog = match self.catalog.catalog().await {
            Ok(catalog) => catalog,
            Err(err) => {
                return self
                    .fail_task(&task_id, PoolError::Resolve(err).to_error_body())
                    .await
            }
        };

        let needs_vision = spec.attachments.iter().any(Attachment::is_image);
        // Sticky overrides change the worker's default model (a respawn
        // when it differs); dynamic overrides ride along with the prompt
        // and leave the worker untouched.
        let ensure_model = match spec.model_policy {
            ModelPolicy::Sticky => spec.model.clone(),
            ModelPolicy::Dynamic => None,
        };

        let ensured = self
            .pool
            .ensure(
                &profile,
                &catalog,
                EnsureOpts {
                    model: ensure_model,
                    force_new: spec.force_new,
                    needs_vision,
                },
            )
            .await;

        if let Err(err) = ensured {
            return self.fail_task(&task_id, err.to_error_body()).await;
        }

        {
            let mut inner = self.inner.lock();
            inner
                .queues
                .entry(profile.id.clone())
                .or_default()
                .push_back(task_id);
        }
        self.pump(&profile.id).await;
    }

    /// Send queued prompts while the worker is ready.
    ///
    /// At most one prompt is in flight per worker; everything else waits
    /// its turn in FIFO order.
    async fn pump(self: &Arc<Self>, profile_id: &ProfileId) {
        loop {
            let next = {
                let mut inner = self.inner.lock();
                if inner.in_flight.contains_key(profile_id) {
                    return;
                }
                let worker_ready = self
                    .pool
                    .get(profile_id.as_str())
                    .map(|w| w.status == WorkerStatus::Ready)
                    .unwrap_or(false);
                if !worker_ready {
                    return;
                }
                let Some(task_id) = inner
                    .queues
                    .get_mut(profile_id)
                    .and_then(|queue| queue.pop_front())
                else {
                    return;
                };
                // Canceled-while-queued tasks are skipped, not prompted.
                let entry = inner.tasks.get_mut(&task_id);
                let Some(entry) = entry else { continue };
                if entry.task.status.is_terminal() {
                    continue;
                }
                entry.task.status = TaskStatus::Running;
                entry.task.started_at_ms = Some(self.clock.epoch_ms());
                let task = entry.task.clone();
                inner.in_flight.insert(profile_id.clone(), task_id.clone());
                Some((task_id, task))
            };

            let Some((task_id, task)) = next else { return };

            self.emit(Event::TaskStarted {
                task_id: task_id.clone(),
                worker_id: Some(profile_id.clone()),
                at_ms: self.clock.epoch_ms(),
            });
            self.pool.update_status(
                profile_id.as_str(),
                WorkerStatus::Busy,
                Some(task_id.clone()),
                None,
            );

            let Some(handle) = self.pool.handle(profile_id.as_str()) else {
                self.release_in_flight(profile_id, &task_id);
                self.fail_task(
                    &task_id,
                    ErrorBody::new(ErrorKind::WorkerUnreachable, "worker has no live session"),
                )
                .await;
                return;
            };

            let prompt_model = match task.model_policy {
                ModelPolicy::Dynamic => task.model_override.clone(),
                ModelPolicy::Sticky => None,
            };
            let payload = PromptPayload {
                parts: prompt_parts(&task),
                model: prompt_model,
                job_id: Some(task_id.to_string()),
            };

            match self.pool.backend().prompt(&handle, payload).await {
                Ok(()) => return,
                Err(err) => {
                    self.release_in_flight(profile_id, &task_id);
                    self.pool
                        .update_status(profile_id.as_str(), WorkerStatus::Ready, None, None);
                    self.fail_task(
                        &task_id,
                        ErrorBody::new(ErrorKind::WorkerUnreachable, err.to_string()),
                    )
                    .await;
                    // Worker is ready again; try the next queued task.
                }
            }
        }
    }

    fn release_in_flight(&self, profile_id: &ProfileId, task_id: &TaskId) {
        let mut inner = self.inner.lock();
        if inner.in_flight.get(profile_id) == Some(task_id) {
            inner.in_flight.remove(profile_id);
        }
    }

    // ── bridge ingestion ───────────────────────────────────────────────

    /// Route a streamed chunk to its task.
    ///
    /// `job_id` wins when present; otherwise the worker's in-flight task
    /// owns the chunk. Chunks for terminal (canceled) tasks are dropped.
    /// The final chunk completes the task.
    pub async fn ingest_chunk(
        self: &Arc<Self>,
        worker_id: &str,
        job_id: Option<&str>,
        chunk: String,
        last: bool,
    ) {
        let profile_id = ProfileId::new(worker_id);
        let resolved = {
            let inner = self.inner.lock();
            match job_id {
                Some(id) => {
                    let task_id = TaskId::new(id);
                    inner.tasks.contains_key(&task_id).then_some(task_id)
                }
                None => inner.in_flight.get(&profile_id).cloned(),
            }
        };
        let Some(task_id) = resolved else {
            tracing::debug!(worker_id, ?job_id, "dropping chunk with no matching task");
            return;
        };

        let now = self.clock.epoch_ms();
        let appended = {
            let mut inner = self.inner.lock();
            let Some(entry) = inner.tasks.get_mut(&task_id) else {
                return;
            };
            if entry.task.status.is_terminal() {
                // Late chunks after cancellation are discarded.
                false
            } else {
                if !chunk.is_empty() {
                    entry.task.stream_chunks.push(chunk.clone());
                }
                true
            }
        };
        if !appended {
            return;
        }

        self.emit(Event::TaskChunk {
            task_id: task_id.clone(),
            chunk,
            last,
            at_ms: now,
        });

        if last {
            self.complete_task(&profile_id, &task_id).await;
        }
    }

    async fn complete_task(self: &Arc<Self>, profile_id: &ProfileId, task_id: &TaskId) {
        let (result, duration, was_in_flight) = {
            let mut inner = self.inner.lock();
            let Some(entry) = inner.tasks.get_mut(task_id) else {
                return;
            };
            if !entry.task.status.can_transition(TaskStatus::Completed) {
                return;
            }
            entry.task.status = TaskStatus::Completed;
            entry.task.finished_at_ms = Some(self.clock.epoch_ms());
            entry.task.result = entry.task.chunk_text();
            let duration = entry.task.duration_ms().unwrap_or(0);
            let result = entry.task.result.clone().unwrap_or_default();
            entry.done.notify_waiters();
            let was_in_flight = inner.in_flight.get(profile_id) == Some(task_id);
            if was_in_flight {
                inner.in_flight.remove(profile_id);
            }
            (result, duration, was_in_flight)
        };

        self.pool.record_result(
            profile_id.as_str(),
            LastResult {
                response: result,
                report: None,
                duration_ms: duration,
            },
        );
        // Only the in-flight prompt owns the worker; a completion routed
        // by job_id for a queued task must not free a busy worker.
        if was_in_flight {
            self.pool
                .update_status(profile_id.as_str(), WorkerStatus::Ready, None, None);
        }
        self.emit(Event::TaskCompleted {
            task_id: task_id.clone(),
            duration_ms: duration,
            at_ms: self.clock.epoch_ms(),
        });
        tracing::info!(task_id = %task_id, duration_ms = duration, "task completed");

        self.pump(profile_id).await;
    }

    async fn fail_task(self: &Arc<Self>, task_id: &TaskId, error: ErrorBody) {
        let failed = {
            let mut inner = self.inner.lock();
            let Some(entry) = inner.tasks.get_mut(task_id) else {
                return;
            };
            if !entry.task.status.can_transition(TaskStatus::Failed) {
                return;
            }
            entry.task.status = TaskStatus::Failed;
            entry.task.finished_at_ms = Some(self.clock.epoch_ms());
            entry.task.error = Some(error.clone());
            entry.done.notify_waiters();
            // Drop any queue membership.
            for queue in inner.queues.values_mut() {
                queue.retain(|id| id != task_id);
            }
            true
        };
        if failed {
            self.emit(Event::TaskFailed {
                task_id: task_id.clone(),
                error,
                at_ms: self.clock.epoch_ms(),
            });
        }
    }

    // ── cancel ─────────────────────────────────────────────────────────

    /// Cancel a task: mark canceled, abort the worker's session, return
    /// the worker to ready on ack. Chunks already streamed stay on the
    /// record; later ones are discarded.
    pub async fn cancel(self: &Arc<Self>, task_id: &TaskId) -> Result<AwaitOutcome, ErrorBody> {
        let (was_in_flight, outcome) = {
            let mut inner = self.inner.lock();
            let Some(entry) = inner.tasks.get_mut(task_id) else {
                return Err(ErrorBody::new(
                    ErrorKind::ConfigInvalid,
                    format!("unknown task: {}", task_id),
                ));
            };
            if entry.task.status.is_terminal() {
                // Level-triggered: canceling a finished task is a no-op.
                let snapshot = outcome_of(&entry.task);
                return Ok(snapshot);
            }
            entry.task.status = TaskStatus::Canceled;
            entry.task.finished_at_ms = Some(self.clock.epoch_ms());
            entry.task.error = Some(ErrorBody::new(ErrorKind::TaskCanceled, "canceled by caller"));
            entry.done.notify_waiters();
            let snapshot = outcome_of(&entry.task);

            for queue in inner.queues.values_mut() {
                queue.retain(|id| id != task_id);
            }
            let in_flight_profile = inner
                .in_flight
                .iter()
                .find(|(_, id)| *id == task_id)
                .map(|(profile, _)| profile.clone());
            if let Some(profile) = &in_flight_profile {
                inner.in_flight.remove(profile);
            }
            (in_flight_profile, snapshot)
        };

        self.emit(Event::TaskCanceled {
            task_id: task_id.clone(),
            at_ms: self.clock.epoch_ms(),
        });

        if let Some(profile_id) = was_in_flight {
            if let Some(handle) = self.pool.handle(profile_id.as_str()) {
                match self.pool.backend().abort(&handle).await {
                    Ok(()) => {
                        self.pool
                            .update_status(profile_id.as_str(), WorkerStatus::Ready, None, None);
                        self.pump(&profile_id).await;
                    }
                    Err(err) => {
                        tracing::warn!(
                            profile_id = %profile_id,
                            error = %err,
                            "abort after cancel failed"
                        );
                    }
                }
            }
        }

        Ok(outcome)
    }

    // ── await / peek / list ────────────────────────────────────────────

    /// Block until the tasks terminate or the timeout elapses.
    ///
    /// Level-triggered: already-terminal tasks return immediately, and a
    /// zero timeout snapshots current state.
    pub async fn await_tasks(
        self: &Arc<Self>,
        task_ids: &[TaskId],
        timeout: Option<Duration>,
    ) -> Vec<AwaitOutcome> {
        let deadline = tokio::time::Instant::now() + timeout.unwrap_or(DEFAULT_AWAIT_TIMEOUT);
        let mut outcomes = Vec::with_capacity(task_ids.len());
        for task_id in task_ids {
            outcomes.push(self.await_one(task_id, deadline).await);
        }
        outcomes
    }

    async fn await_one(&self, task_id: &TaskId, deadline: tokio::time::Instant) -> AwaitOutcome {
        loop {
            let (snapshot, done) = {
                let inner = self.inner.lock();
                match inner.tasks.get(task_id) {
                    Some(entry) => (outcome_of(&entry.task), Arc::clone(&entry.done)),
                    None => {
                        return AwaitOutcome {
                            task_id: task_id.clone(),
                            status: TaskStatus::Failed,
                            response: None,
                            error: Some(ErrorBody::new(
                                ErrorKind::ConfigInvalid,
                                format!("unknown task: {}", task_id),
                            )),
                            duration_ms: None,
                        }
                    }
                }
            };
            if snapshot.status.is_terminal() {
                return snapshot;
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return snapshot;
            }

            // Arm the notification before re-checking so a terminal
            // transition between the snapshot and the wait is not lost.
            let notified = done.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            let terminal = {
                let inner = self.inner.lock();
                inner
                    .tasks
                    .get(task_id)
                    .map(|e| e.task.status.is_terminal())
                    .unwrap_or(true)
            };
            if terminal {
                continue;
            }
            let _ = tokio::time::timeout_at(deadline, notified).await;
        }
    }

    /// Current status and accumulated chunks, without blocking.
    pub fn peek(&self, task_id: &TaskId) -> Result<Task, ErrorBody> {
        let inner = self.inner.lock();
        inner
            .tasks
            .get(task_id)
            .map(|entry| entry.task.clone())
            .ok_or_else(|| {
                ErrorBody::new(ErrorKind::ConfigInvalid, format!("unknown task: {}", task_id))
            })
    }

    /// All task snapshots, newest first.
    pub fn tasks(&self) -> Vec<Task> {
        let inner = self.inner.lock();
        let mut tasks: Vec<Task> = inner.tasks.values().map(|e| e.task.clone()).collect();
        tasks.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));
        tasks
    }

    /// Render a `task_list` view.
    pub fn list(&self, view: ListView, format: ListFormat) -> String {
        match view {
            ListView::Tasks => self.render_tasks(format),
            ListView::Workers => self.render_workers(format),
            ListView::Tags => self.render_tags(format),
        }
    }

    fn render_tasks(&self, format: ListFormat) -> String {
        let tasks = self.tasks();
        match format {
            ListFormat::Json => serde_json::to_string_pretty(&tasks).unwrap_or_default(),
            ListFormat::Markdown => {
                let mut out = String::from("| task | kind | worker | status | duration |\n");
                out.push_str("|---|---|---|---|---|\n");
                for task in &tasks {
                    let duration = task
                        .duration_ms()
                        .map(maestro_core::time_fmt::format_elapsed_ms)
                        .unwrap_or_else(|| "-".to_string());
                    out.push_str(&format!(
                        "| {} | {:?} | {} | {} | {} |\n",
                        task.task_id.short(8),
                        task.kind,
                        task.worker_id
                            .as_ref()
                            .map(|w| w.to_string())
                            .or_else(|| task.workflow_id.clone())
                            .unwrap_or_else(|| "-".to_string()),
                        task.status,
                        duration,
                    ));
                }
                out
            }
        }
    }

    fn render_workers(&self, format: ListFormat) -> String {
        let workers = self.pool.list();
        match format {
            ListFormat::Json => serde_json::to_string_pretty(&workers).unwrap_or_default(),
            ListFormat::Markdown => {
                let mut out =
                    String::from("| worker | status | model | reason | last error |\n");
                out.push_str("|---|---|---|---|---|\n");
                for worker in &workers {
                    out.push_str(&format!(
                        "| {} | {} | {} | {} | {} |\n",
                        worker.profile_id,
                        worker.status,
                        worker.resolved_model,
                        worker.model_reason,
                        worker
                            .error
                            .as_ref()
                            .map(|e| e.message.clone())
                            .unwrap_or_else(|| "-".to_string()),
                    ));
                }
                out
            }
        }
    }

    fn render_tags(&self, format: ListFormat) -> String {
        let mut by_tag: std::collections::BTreeMap<String, Vec<String>> = Default::default();
        for profile in self.profiles.list() {
            for tag in &profile.tags {
                by_tag
                    .entry(tag.clone())
                    .or_default()
                    .push(profile.id.to_string());
            }
        }
        match format {
            ListFormat::Json => serde_json::to_string_pretty(&by_tag).unwrap_or_default(),
            ListFormat::Markdown => {
                let mut out = String::from("| tag | workers |\n|---|---|\n");
                for (tag, profiles) in &by_tag {
                    out.push_str(&format!("| {} | {} |\n", tag, profiles.join(", ")));
                }
                out
            }
        }
    }

    // ── ops ────────────────────────────────────────────────────────────

    async fn dispatch_op(self: Arc<Self>, task_id: TaskId, spec: StartSpec) {
        let op = spec.op.as_deref().unwrap_or_default();
        let result = match op {
            "worker.list" => Ok(self.render_workers(ListFormat::Markdown)),
            "worker.stop" => self.op_worker_stop(&spec).await,
            "worker.model.set" => self.op_model_set(&spec, spec.model.as_deref()).await,
            "worker.model.reset" => self.op_model_set(&spec, None).await,
            other => Err(ErrorBody::new(
                ErrorKind::ConfigInvalid,
                format!("unknown op: {}", other),
            )),
        };
        match result {
            Ok(message) => self.complete_op(&task_id, message).await,
            Err(error) => self.fail_task(&task_id, error).await,
        }
    }

    async fn op_worker_stop(&self, spec: &StartSpec) -> Result<String, ErrorBody> {
        let worker_id = spec
            .worker_id
            .as_deref()
            .ok_or_else(|| ErrorBody::new(ErrorKind::ConfigInvalid, "worker_id is required"))?;
        self.profiles.get(worker_id)?;
        self.pool
            .stop(worker_id)
            .await
            .map_err(|e| e.to_error_body())?;
        Ok(format!("worker '{}' stopped", worker_id))
    }

    /// Set (or reset, when `model` is none) a worker's default model by
    /// respawning it under the profile lock.
    async fn op_model_set(
        &self,
        spec: &StartSpec,
        model: Option<&str>,
    ) -> Result<String, ErrorBody> {
        let worker_id = spec
            .worker_id
            .as_deref()
            .ok_or_else(|| ErrorBody::new(ErrorKind::ConfigInvalid, "worker_id is required"))?;
        if spec.op.as_deref() == Some("worker.model.set") && model.is_none() {
            return Err(ErrorBody::new(
                ErrorKind::ConfigInvalid,
                "model is required for worker.model.set",
            ));
        }
        let profile = self.profiles.get(worker_id)?.clone();
        let catalog = self
            .catalog
            .catalog()
            .await
            .map_err(|e| PoolError::Resolve(e).to_error_body())?;
        let instance = self
            .pool
            .ensure(
                &profile,
                &catalog,
                EnsureOpts {
                    model: model.map(str::to_string),
                    force_new: true,
                    needs_vision: false,
                },
            )
            .await
            .map_err(|e| e.to_error_body())?;
        Ok(format!(
            "worker '{}' now runs {} ({})",
            worker_id, instance.resolved_model, instance.model_reason
        ))
    }

    async fn complete_op(self: &Arc<Self>, task_id: &TaskId, message: String) {
        let done = {
            let mut inner = self.inner.lock();
            let Some(entry) = inner.tasks.get_mut(task_id) else {
                return;
            };
            if !entry.task.status.can_transition(TaskStatus::Completed) {
                return;
            }
            let now = self.clock.epoch_ms();
            entry.task.status = TaskStatus::Completed;
            entry.task.started_at_ms = entry.task.started_at_ms.or(Some(entry.task.created_at_ms));
            entry.task.finished_at_ms = Some(now);
            entry.task.result = Some(message);
            entry.done.notify_waiters();
            entry.task.duration_ms().unwrap_or(0)
        };
        self.emit(Event::TaskCompleted {
            task_id: task_id.clone(),
            duration_ms: done,
            at_ms: self.clock.epoch_ms(),
        });
    }

    // ── workflows ──────────────────────────────────────────────────────

    async fn dispatch_workflow(self: Arc<Self>, task_id: TaskId, spec: StartSpec) {
        let Some(workflow) = spec
            .workflow_id
            .as_deref()
            .and_then(|id| self.workflows.get(id).cloned())
        else {
            return;
        };

        {
            let mut inner = self.inner.lock();
            match inner.tasks.get_mut(&task_id) {
                Some(entry) if entry.task.status.can_transition(TaskStatus::Running) => {
                    entry.task.status = TaskStatus::Running;
                    entry.task.started_at_ms = Some(self.clock.epoch_ms());
                }
                _ => return,
            }
        }
        self.emit(Event::TaskStarted {
            task_id: task_id.clone(),
            worker_id: None,
            at_ms: self.clock.epoch_ms(),
        });

        let mut previous = String::new();
        for (index, step) in workflow.steps.iter().enumerate() {
            let prompt = step
                .task
                .replace("{input}", &spec.task)
                .replace("{previous}", &previous);
            let sub_spec = StartSpec {
                kind: TaskKind::Worker,
                worker_id: Some(step.worker.clone()),
                workflow_id: None,
                op: None,
                task: prompt,
                attachments: if index == 0 {
                    spec.attachments.clone()
                } else {
                    Vec::new()
                },
                model: None,
                model_policy: ModelPolicy::default(),
                force_new: false,
            };
            let sub_id = match self.start(sub_spec) {
                Ok(id) => id,
                Err(error) => return self.fail_task(&task_id, error).await,
            };
            let outcome = self
                .await_tasks(std::slice::from_ref(&sub_id), None)
                .await
                .into_iter()
                .next();
            match outcome {
                Some(outcome) if outcome.status == TaskStatus::Completed => {
                    previous = outcome.response.unwrap_or_default();
                }
                Some(outcome) => {
                    let error = outcome.error.unwrap_or_else(|| {
                        ErrorBody::new(
                            ErrorKind::ConfigInvalid,
                            format!("workflow step {} did not complete", index + 1),
                        )
                    });
                    return self.fail_task(&task_id, error).await;
                }
                None => {
                    return self
                        .fail_task(
                            &task_id,
                            ErrorBody::new(ErrorKind::TaskTimeout, "workflow step lost"),
                        )
                        .await
                }
            }
        }

        let duration = {
            let mut inner = self.inner.lock();
            let Some(entry) = inner.tasks.get_mut(&task_id) else {
                return;
            };
            if !entry.task.status.can_transition(TaskStatus::Completed) {
                return;
            }
            entry.task.status = TaskStatus::Completed;
            entry.task.finished_at_ms = Some(self.clock.epoch_ms());
            entry.task.result = Some(previous);
            entry.done.notify_waiters();
            entry.task.duration_ms().unwrap_or(0)
        };
        self.emit(Event::TaskCompleted {
            task_id,
            duration_ms: duration,
            at_ms: self.clock.epoch_ms(),
        });
    }
}

fn outcome_of(task: &Task) -> AwaitOutcome {
    AwaitOutcome {
        task_id: task.task_id.clone(),
        status: task.status,
        response: task.result.clone(),
        error: task.error.clone(),
        duration_ms: task.duration_ms(),
    }
}

/// Build prompt parts from a task's text and attachments.
fn prompt_parts(task: &Task) -> Vec<PromptPart> {
    let mut parts = vec![PromptPart::Text {
        text: task.prompt.clone(),
    }];
    for attachment in &task.attachments {
        parts.push(match attachment {
            Attachment::Text { content } => PromptPart::Text {
                text: content.clone(),
            },
            Attachment::Image { data } => PromptPart::Image { data: data.clone() },
            Attachment::File { name, data } => PromptPart::File {
                name: name.clone(),
                data: data.clone(),
            },
        });
    }
    parts
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;
