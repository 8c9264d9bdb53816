//! Pipeline Runner: driver de alto nivel.
//!
//! Recibe un grafo validable + configuración, maneja el run-log y entrega un
//! `RunReport` completo. Nunca levanta un error por completitud parcial: los
//! fallos por-task viven en el reporte y el caller decide qué hacer.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::ExecutorBackend;
use crate::config::RunConfig;
use crate::errors::CoreEngineError;
use crate::event::EventStore;
use crate::graph::{ExternalInputs, TaskGraph};
use crate::injection::ParamInjector;
use crate::model::Artifact;
use crate::repo::{ExecutionRecord, RunRepository};
use crate::scheduler::Scheduler;
use crate::store::ArtifactStore;
use crate::task::TaskStatus;

/// Estado final de un run completo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Todos los tasks terminaron Succeeded o Cached.
    Succeeded,
    /// Al menos un task falló; los subgrafos independientes completaron.
    Failed,
    /// El deadline global cortó el run antes de intentar todos los tasks.
    Partial,
}

/// Reporte final: records por task, artifacts de los sinks y diagnóstico.
pub struct RunReport {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub records: IndexMap<String, ExecutionRecord>,
    /// Outputs de los tasks sin edges salientes, por id.
    pub sink_outputs: IndexMap<String, Vec<Artifact>>,
    pub failed: Vec<String>,
    pub never_attempted: Vec<String>,
    pub run_fingerprint: String,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }
}

/// Driver del pipeline sobre stores genéricas de eventos y replay.
pub struct PipelineRunner<E, R>
where
    E: EventStore,
    R: RunRepository,
{
    event_store: E,
    repository: R,
    injectors: Vec<Box<dyn ParamInjector>>,
}

impl<E, R> PipelineRunner<E, R>
where
    E: EventStore,
    R: RunRepository,
{
    pub fn new(event_store: E, repository: R) -> Self {
        Self { event_store, repository, injectors: Vec::new() }
    }

    /// Añade un inyector de parámetros (overrides externos deterministas).
    pub fn add_injector(&mut self, injector: Box<dyn ParamInjector>) {
        self.injectors.push(injector);
    }

    pub fn event_store(&self) -> &E {
        &self.event_store
    }

    /// Ejecuta el pipeline completo con un run id nuevo.
    pub fn run(
        &mut self,
        graph: &TaskGraph,
        externals: &ExternalInputs,
        config: &RunConfig,
        store: &dyn ArtifactStore,
        backend: &dyn ExecutorBackend,
    ) -> Result<RunReport, CoreEngineError> {
        self.run_with_id(Uuid::new_v4(), graph, externals, config, store, backend)
    }

    /// Variante con run id explícito (útil para reanudar logs o tests).
    pub fn run_with_id(
        &mut self,
        run_id: Uuid,
        graph: &TaskGraph,
        externals: &ExternalInputs,
        config: &RunConfig,
        store: &dyn ArtifactStore,
        backend: &dyn ExecutorBackend,
    ) -> Result<RunReport, CoreEngineError> {
        // Fail-fast: nada se despacha si el grafo es inválido
        graph.validate(externals)?;

        let scheduler = Scheduler::new(graph, config, store, backend, &self.injectors, externals);
        let outcome = scheduler.run(run_id, &mut self.event_store)?;

        let events = self.event_store.list(run_id);
        let instance = self.repository.load(run_id, &events, graph);

        let failed: Vec<String> = instance
            .records
            .values()
            .filter(|r| r.status == TaskStatus::Failed)
            .map(|r| r.task_id.clone())
            .collect();

        let mut sink_outputs = IndexMap::new();
        for sink in graph.sinks() {
            if let Some(outputs) = outcome.outputs.get(sink) {
                sink_outputs.insert(sink.to_string(), outputs.clone());
            }
        }

        Ok(RunReport {
            run_id,
            status: outcome.status,
            records: instance.records,
            sink_outputs,
            failed,
            never_attempted: outcome.never_attempted,
            run_fingerprint: outcome.run_fingerprint,
        })
    }
}
