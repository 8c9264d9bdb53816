//! Scheduler: dispatch loop cooperativo sobre un grafo de tasks.
//!
//! El loop es single-threaded; el paralelismo real vive en el backend. En
//! cada vuelta:
//! 1. Calcula el conjunto Ready (inputs materializados, sin ancestro
//!    fallido) y lo despacha en orden de inserción.
//! 2. Antes de despachar consulta la Artifact Store por fingerprint; un hit
//!    publica los outputs cacheados sin ejecutar nada.
//! 3. Pollea los handles outstanding; éxito escribe en la store
//!    (first-writer-wins) y fallo aplica la política de retry/propagación.
//! 4. Repite hasta que no queden tasks Pending ni Running.
//!
//! Fallos transitorios reintentan con backoff hasta `retry_bound`; fallos
//! terminales marcan Failed al task y a su cono de dependientes, sin frenar
//! los subgrafos independientes. Un deadline global frena submissions nuevas
//! y deja drenar (o cancela) lo ya despachado, reportando Partial.

mod retry;

pub use retry::RetryPolicy;

use std::collections::HashMap;
use std::time::Instant;

use indexmap::IndexMap;
use uuid::Uuid;

use crate::backend::{BackendHandle, ExecutorBackend};
use crate::config::{DeadlinePolicy, RunConfig};
use crate::constants::ENGINE_VERSION;
use crate::errors::{CoreEngineError, FailureKind, TaskExecutionError};
use crate::event::{EventStore, RunEventKind};
use crate::graph::{ExternalInputs, TaskGraph};
use crate::hashing::hash_value;
use crate::injection::{CompositeInjector, ParamInjector};
use crate::model::{Artifact, ExecutionContext, TaskFingerprintInput};
use crate::runner::RunStatus;
use crate::store::{ArtifactStore, PutOutcome};
use crate::task::TaskStatus;

struct TaskState {
    status: TaskStatus,
    attempts: u32,
    fingerprint: Option<String>,
    outputs: Option<Vec<Artifact>>,
    handle: Option<BackendHandle>,
    next_eligible: Option<Instant>,
}

impl TaskState {
    fn pending() -> Self {
        Self {
            status: TaskStatus::Pending,
            attempts: 0,
            fingerprint: None,
            outputs: None,
            handle: None,
            next_eligible: None,
        }
    }
}

/// Resultado interno del scheduler, consumido por el Pipeline Runner.
pub(crate) struct SchedulerOutcome {
    pub status: RunStatus,
    pub outputs: HashMap<String, Vec<Artifact>>,
    pub never_attempted: Vec<String>,
    pub run_fingerprint: String,
}

pub(crate) struct Scheduler<'a> {
    graph: &'a TaskGraph,
    config: &'a RunConfig,
    store: &'a dyn ArtifactStore,
    backend: &'a dyn ExecutorBackend,
    injectors: &'a [Box<dyn ParamInjector>],
    externals: &'a ExternalInputs,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        graph: &'a TaskGraph,
        config: &'a RunConfig,
        store: &'a dyn ArtifactStore,
        backend: &'a dyn ExecutorBackend,
        injectors: &'a [Box<dyn ParamInjector>],
        externals: &'a ExternalInputs,
    ) -> Self {
        Self { graph, config, store, backend, injectors, externals }
    }

    pub fn run(
        &self,
        run_id: Uuid,
        events: &mut dyn EventStore,
    ) -> Result<SchedulerOutcome, CoreEngineError> {
        let mut states: IndexMap<String, TaskState> = self
            .graph
            .task_ids()
            .map(|id| (id.to_string(), TaskState::pending()))
            .collect();

        events.append_kind(
            run_id,
            RunEventKind::RunInitialized {
                graph_hash: self.graph.graph_hash(),
                task_count: self.graph.len(),
            },
        )?;

        let deadline = self.config.deadline.map(|d| Instant::now() + d);
        let mut deadline_hit = false;

        loop {
            let mut progress = false;

            if let Some(dl) = deadline {
                if !deadline_hit && Instant::now() >= dl {
                    deadline_hit = true;
                    log::warn!("run {run_id}: global deadline exceeded, stopping submissions");
                    if self.config.deadline_policy == DeadlinePolicy::Cancel {
                        self.cancel_outstanding(run_id, &mut states, events)?;
                    }
                    progress = true;
                }
            }

            if !deadline_hit {
                progress |= self.dispatch_ready(run_id, &mut states, events)?;
            }

            progress |= self.drain_completions(run_id, &mut states, events)?;

            let any_running = states.values().any(|s| s.status == TaskStatus::Running);
            let any_pending = states.values().any(|s| s.status == TaskStatus::Pending);

            if !any_running && (!any_pending || deadline_hit) {
                break;
            }

            if !progress {
                let wait = self.idle_wait(&states, any_running);
                match wait {
                    Some(d) => std::thread::sleep(d),
                    None => {
                        // sin handles vivos ni retries programados: no hay
                        // forma de progresar (no debería ocurrir en un grafo
                        // validado)
                        log::error!("run {run_id}: scheduler stalled with pending tasks");
                        break;
                    }
                }
            }
        }

        self.complete(run_id, states, deadline_hit, events)
    }

    /// Duración a dormir cuando la vuelta no produjo progreso.
    fn idle_wait(&self, states: &IndexMap<String, TaskState>, any_running: bool) -> Option<std::time::Duration> {
        if any_running {
            return Some(self.config.poll_interval);
        }
        let now = Instant::now();
        states
            .values()
            .filter(|s| s.status == TaskStatus::Pending)
            .filter_map(|s| s.next_eligible)
            .map(|t| t.saturating_duration_since(now).max(std::time::Duration::from_millis(1)))
            .min()
    }

    /// ¿Todos los inputs del task están materializados?
    fn inputs_resolved(&self, task_id: &str, states: &IndexMap<String, TaskState>) -> bool {
        let Some(task) = self.graph.get(task_id) else { return false };
        task.input_slots().iter().all(|slot| {
            match self.graph.binding(task_id, &slot.name) {
                Some((src, _)) => states
                    .get(src)
                    .map(|s| s.status.is_resolved())
                    .unwrap_or(false),
                None => self.externals.contains(task_id, &slot.name),
            }
        })
    }

    /// Construye el vector de inputs en orden de declaración de slots.
    fn resolve_inputs(
        &self,
        task_id: &str,
        states: &IndexMap<String, TaskState>,
    ) -> Result<Vec<Artifact>, CoreEngineError> {
        let task = self
            .graph
            .get(task_id)
            .ok_or_else(|| CoreEngineError::Internal(format!("unknown task {task_id}")))?;
        let mut inputs = Vec::new();
        for slot in task.input_slots() {
            let artifact = match self.graph.binding(task_id, &slot.name) {
                Some((src, src_slot)) => {
                    let producer = self
                        .graph
                        .get(src)
                        .ok_or_else(|| CoreEngineError::Internal(format!("unknown producer {src}")))?;
                    let idx = producer
                        .output_slots()
                        .iter()
                        .position(|s| s.name == *src_slot)
                        .ok_or_else(|| CoreEngineError::Internal(format!("unknown slot {src}.{src_slot}")))?;
                    states
                        .get(src)
                        .and_then(|s| s.outputs.as_ref())
                        .and_then(|outs| outs.get(idx))
                        .cloned()
                        .ok_or_else(|| {
                            CoreEngineError::Internal(format!("outputs of {src} not materialized"))
                        })?
                }
                None => self
                    .externals
                    .get(task_id, &slot.name)
                    .cloned()
                    .ok_or_else(|| {
                        CoreEngineError::Internal(format!("missing external input {task_id}.{}", slot.name))
                    })?,
            };
            inputs.push(artifact);
        }
        Ok(inputs)
    }

    /// Despacha los tasks Ready en orden de inserción. Devuelve si hubo
    /// progreso.
    fn dispatch_ready(
        &self,
        run_id: Uuid,
        states: &mut IndexMap<String, TaskState>,
        events: &mut dyn EventStore,
    ) -> Result<bool, CoreEngineError> {
        let now = Instant::now();
        let ready: Vec<String> = states
            .iter()
            .filter(|(id, st)| {
                st.status == TaskStatus::Pending
                    && st.next_eligible.map(|t| t <= now).unwrap_or(true)
                    && self.inputs_resolved(id, states)
            })
            .map(|(id, _)| id.clone())
            .collect();

        let mut progress = false;
        for task_id in ready {
            let task = self
                .graph
                .get(&task_id)
                .ok_or_else(|| CoreEngineError::Internal(format!("unknown task {task_id}")))?
                .clone();

            let inputs = self.resolve_inputs(&task_id, states)?;
            let base = task.base_params();
            let precontext = ExecutionContext::new(inputs.clone(), base.clone());
            let params = CompositeInjector::apply_injectors(self.injectors, &base, &precontext);

            let input_hashes: Vec<String> = inputs.iter().map(|a| a.hash.clone()).collect();
            let definition_hash = task.definition_hash();
            let fp_input = TaskFingerprintInput {
                engine_version: ENGINE_VERSION,
                task_id: &task_id,
                definition_hash: &definition_hash,
                input_hashes: &input_hashes,
                params: &params,
            };
            let fp_value = serde_json::to_value(&fp_input)
                .map_err(|e| CoreEngineError::Internal(format!("fingerprint serialization: {e}")))?;
            let fingerprint = hash_value(&fp_value);

            let state = states
                .get_mut(&task_id)
                .ok_or_else(|| CoreEngineError::Internal(format!("unknown task {task_id}")))?;
            state.status = TaskStatus::Ready;
            state.fingerprint = Some(fingerprint.clone());

            if let Some(stored) = self.store.get(&fingerprint) {
                let hashes: Vec<String> = stored.iter().map(|a| a.hash.clone()).collect();
                state.status = TaskStatus::Cached;
                state.outputs = Some(stored);
                events.append_kind(
                    run_id,
                    RunEventKind::TaskCached { task_id: task_id.clone(), outputs: hashes, fingerprint },
                )?;
                progress = true;
                continue;
            }

            state.attempts += 1;
            let attempt = state.attempts;
            events.append_kind(
                run_id,
                RunEventKind::TaskStarted {
                    task_id: task_id.clone(),
                    fingerprint: fingerprint.clone(),
                    attempt,
                },
            )?;

            let ctx = ExecutionContext::new(inputs, params);
            match self.backend.submit(task, ctx) {
                Ok(handle) => {
                    let state = states
                        .get_mut(&task_id)
                        .ok_or_else(|| CoreEngineError::Internal(format!("unknown task {task_id}")))?;
                    state.status = TaskStatus::Running;
                    state.handle = Some(handle);
                }
                Err(error) => {
                    self.handle_failure(run_id, &task_id, error, states, events)?;
                }
            }
            progress = true;
        }
        Ok(progress)
    }

    /// Pollea los handles outstanding y procesa terminaciones.
    fn drain_completions(
        &self,
        run_id: Uuid,
        states: &mut IndexMap<String, TaskState>,
        events: &mut dyn EventStore,
    ) -> Result<bool, CoreEngineError> {
        let running: Vec<(String, BackendHandle)> = states
            .iter()
            .filter(|(_, st)| st.status == TaskStatus::Running)
            .filter_map(|(id, st)| st.handle.map(|h| (id.clone(), h)))
            .collect();

        let mut progress = false;
        for (task_id, handle) in running {
            if !self.backend.poll(handle).is_terminal() {
                continue;
            }
            match self.backend.result(handle) {
                Ok(outputs) => self.finish_success(run_id, &task_id, outputs, states, events)?,
                Err(error) => self.handle_failure(run_id, &task_id, error, states, events)?,
            }
            progress = true;
        }
        Ok(progress)
    }

    fn finish_success(
        &self,
        run_id: Uuid,
        task_id: &str,
        mut outputs: Vec<Artifact>,
        states: &mut IndexMap<String, TaskState>,
        events: &mut dyn EventStore,
    ) -> Result<(), CoreEngineError> {
        for artifact in outputs.iter_mut() {
            artifact.ensure_hashed();
        }
        let state = states
            .get_mut(task_id)
            .ok_or_else(|| CoreEngineError::Internal(format!("unknown task {task_id}")))?;
        let fingerprint = state
            .fingerprint
            .clone()
            .ok_or_else(|| CoreEngineError::Internal(format!("no fingerprint for {task_id}")))?;

        match self.store.put(&fingerprint, outputs.clone()) {
            Ok(PutOutcome::Stored) => {}
            Ok(PutOutcome::AlreadyPresent) => {
                // first-writer-wins: publicamos el valor ya almacenado para
                // que todos los consumidores vean exactamente un artifact
                if let Some(stored) = self.store.get(&fingerprint) {
                    outputs = stored;
                }
            }
            Err(e) => {
                // la cache durable falló; el run continúa con el valor en
                // memoria y el problema queda en el log
                log::error!("artifact store write failed for {fingerprint}: {e}");
            }
        }

        let hashes: Vec<String> = outputs.iter().map(|a| a.hash.clone()).collect();
        state.status = TaskStatus::Succeeded;
        state.outputs = Some(outputs);
        state.handle = None;
        events.append_kind(
            run_id,
            RunEventKind::TaskFinished { task_id: task_id.to_string(), outputs: hashes, fingerprint },
        )?;
        Ok(())
    }

    fn handle_failure(
        &self,
        run_id: Uuid,
        task_id: &str,
        error: TaskExecutionError,
        states: &mut IndexMap<String, TaskState>,
        events: &mut dyn EventStore,
    ) -> Result<(), CoreEngineError> {
        let state = states
            .get_mut(task_id)
            .ok_or_else(|| CoreEngineError::Internal(format!("unknown task {task_id}")))?;
        state.handle = None;
        let attempts = state.attempts;

        if error.kind() == FailureKind::Transient && attempts <= self.config.retry_bound {
            let delay = self.config.retry.next_delay(attempts);
            log::warn!(
                "task {task_id} failed transiently (attempt {attempts}), retrying in {delay:?}: {error}"
            );
            state.status = TaskStatus::Pending;
            state.next_eligible = Some(Instant::now() + delay);
            events.append_kind(
                run_id,
                RunEventKind::RetryScheduled {
                    task_id: task_id.to_string(),
                    attempt: attempts,
                    delay_ms: delay.as_millis() as u64,
                    error,
                },
            )?;
            return Ok(());
        }

        log::error!("task {task_id} failed terminally: {error}");
        state.status = TaskStatus::Failed;
        let fingerprint = state.fingerprint.clone();
        events.append_kind(
            run_id,
            RunEventKind::TaskFailed { task_id: task_id.to_string(), error, fingerprint },
        )?;
        self.propagate_failure(run_id, task_id, states, events)
    }

    /// Marca Failed a los dependientes transitivos de un task fallido. Los
    /// subgrafos sin camino al fallo no se tocan.
    fn propagate_failure(
        &self,
        run_id: Uuid,
        ancestor: &str,
        states: &mut IndexMap<String, TaskState>,
        events: &mut dyn EventStore,
    ) -> Result<(), CoreEngineError> {
        for dependent in self.graph.dependents_transitive(ancestor) {
            let Some(state) = states.get_mut(&dependent) else { continue };
            if state.status == TaskStatus::Pending {
                state.status = TaskStatus::Failed;
                events.append_kind(
                    run_id,
                    RunEventKind::TaskSkipped { task_id: dependent.clone(), ancestor: ancestor.to_string() },
                )?;
            }
        }
        Ok(())
    }

    fn cancel_outstanding(
        &self,
        run_id: Uuid,
        states: &mut IndexMap<String, TaskState>,
        events: &mut dyn EventStore,
    ) -> Result<(), CoreEngineError> {
        let running: Vec<String> = states
            .iter()
            .filter(|(_, st)| st.status == TaskStatus::Running)
            .map(|(id, _)| id.clone())
            .collect();
        for task_id in running {
            if let Some(state) = states.get_mut(&task_id) {
                if let Some(handle) = state.handle.take() {
                    self.backend.cancel(handle);
                }
                state.status = TaskStatus::Failed;
                let fingerprint = state.fingerprint.clone();
                events.append_kind(
                    run_id,
                    RunEventKind::TaskFailed {
                        task_id: task_id.clone(),
                        error: TaskExecutionError::Cancelled,
                        fingerprint,
                    },
                )?;
            }
            self.propagate_failure(run_id, &task_id, states, events)?;
        }
        Ok(())
    }

    fn complete(
        &self,
        run_id: Uuid,
        states: IndexMap<String, TaskState>,
        deadline_hit: bool,
        events: &mut dyn EventStore,
    ) -> Result<SchedulerOutcome, CoreEngineError> {
        let all_resolved = states.values().all(|s| s.status.is_resolved());
        let status = if all_resolved {
            RunStatus::Succeeded
        } else if deadline_hit {
            RunStatus::Partial
        } else {
            RunStatus::Failed
        };

        let never_attempted: Vec<String> = states
            .iter()
            .filter(|(_, st)| st.status == TaskStatus::Pending && st.attempts == 0)
            .map(|(id, _)| id.clone())
            .collect();

        let fingerprints: Vec<&str> = states
            .values()
            .filter(|s| s.status.is_resolved())
            .filter_map(|s| s.fingerprint.as_deref())
            .collect();
        let run_fingerprint = hash_value(&serde_json::json!({
            "engine_version": ENGINE_VERSION,
            "graph_hash": self.graph.graph_hash(),
            "task_fingerprints": fingerprints,
        }));

        events.append_kind(
            run_id,
            RunEventKind::RunCompleted { status, run_fingerprint: run_fingerprint.clone() },
        )?;

        let outputs: HashMap<String, Vec<Artifact>> = states
            .into_iter()
            .filter_map(|(id, st)| st.outputs.map(|o| (id, o)))
            .collect();

        Ok(SchedulerOutcome { status, outputs, never_attempted, run_fingerprint })
    }
}
