//! Estado reconstruido de un run: `RunInstance` + `ExecutionRecord` por task.
//!
//! El repositorio aplica replay: consume eventos en orden y actualiza un
//! record por task. No almacena artifacts completos (sólo hashes) para
//! mantener neutralidad; los valores viven en el `ArtifactStore`.
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use uuid::Uuid;

use crate::event::{RunEvent, RunEventKind};
use crate::graph::TaskGraph;
use crate::runner::RunStatus;
use crate::task::TaskStatus;

/// Estado por invocación de task, reconstruible desde el run-log.
#[derive(Debug, Clone)]
pub struct ExecutionRecord {
    pub task_id: String,
    pub status: TaskStatus,
    pub fingerprint: Option<String>,
    pub outputs: Vec<String>, // sólo hashes; los artifacts viven en la store
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub attempts: u32,
    pub failure: Option<String>,
}

impl ExecutionRecord {
    fn pending(task_id: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            status: TaskStatus::Pending,
            fingerprint: None,
            outputs: vec![],
            started_at: None,
            finished_at: None,
            attempts: 0,
            failure: None,
        }
    }
}

pub struct RunInstance {
    pub id: Uuid,
    pub records: IndexMap<String, ExecutionRecord>,
    pub completed: Option<RunStatus>,
    pub run_fingerprint: Option<String>,
}

/// Trait para reconstruir (`replay`) el estado de un run desde sus eventos.
pub trait RunRepository {
    fn load(&self, run_id: Uuid, events: &[RunEvent], graph: &TaskGraph) -> RunInstance;
}

pub struct InMemoryRunRepository;

impl InMemoryRunRepository {
    pub fn new() -> Self {
        Self
    }
}

impl Default for InMemoryRunRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl RunRepository for InMemoryRunRepository {
    fn load(&self, run_id: Uuid, events: &[RunEvent], graph: &TaskGraph) -> RunInstance {
        let mut records: IndexMap<String, ExecutionRecord> = graph
            .task_ids()
            .map(|id| (id.to_string(), ExecutionRecord::pending(id)))
            .collect();
        let mut completed = None;
        let mut run_fingerprint = None;

        for ev in events {
            match &ev.kind {
                RunEventKind::RunInitialized { .. } => {}
                RunEventKind::TaskStarted { task_id, fingerprint, .. } => {
                    if let Some(rec) = records.get_mut(task_id) {
                        rec.status = TaskStatus::Running;
                        rec.fingerprint = Some(fingerprint.clone());
                        rec.started_at.get_or_insert(ev.ts);
                        rec.attempts += 1;
                    }
                }
                RunEventKind::TaskFinished { task_id, outputs, fingerprint } => {
                    if let Some(rec) = records.get_mut(task_id) {
                        rec.status = TaskStatus::Succeeded;
                        rec.fingerprint = Some(fingerprint.clone());
                        rec.outputs = outputs.clone();
                        rec.finished_at = Some(ev.ts);
                    }
                }
                RunEventKind::TaskCached { task_id, outputs, fingerprint } => {
                    if let Some(rec) = records.get_mut(task_id) {
                        rec.status = TaskStatus::Cached;
                        rec.fingerprint = Some(fingerprint.clone());
                        rec.outputs = outputs.clone();
                        rec.finished_at = Some(ev.ts);
                    }
                }
                RunEventKind::RetryScheduled { task_id, .. } => {
                    if let Some(rec) = records.get_mut(task_id) {
                        // vuelve a la cola, conserva attempts
                        rec.status = TaskStatus::Pending;
                    }
                }
                RunEventKind::TaskFailed { task_id, error, fingerprint } => {
                    if let Some(rec) = records.get_mut(task_id) {
                        rec.status = TaskStatus::Failed;
                        rec.fingerprint = fingerprint.clone();
                        rec.failure = Some(error.to_string());
                        rec.finished_at = Some(ev.ts);
                    }
                }
                RunEventKind::TaskSkipped { task_id, ancestor } => {
                    if let Some(rec) = records.get_mut(task_id) {
                        rec.status = TaskStatus::Failed;
                        rec.failure = Some(format!("upstream task failed: {ancestor}"));
                        rec.finished_at = Some(ev.ts);
                    }
                }
                RunEventKind::RunCompleted { status, run_fingerprint: fp } => {
                    completed = Some(*status);
                    run_fingerprint = Some(fp.clone());
                }
            }
        }

        RunInstance { id: run_id, records, completed, run_fingerprint }
    }
}
