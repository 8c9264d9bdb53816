//! Tipos de evento del run y estructura `RunEvent`.
//!
//! Rol en el pipeline:
//! - Cada ejecución del scheduler emite eventos a un `EventStore` append-only.
//! - Los eventos permiten reconstruir los `ExecutionRecord` por replay
//!   (ver `repo`) sin depender de estructuras mutables.
//! - Serializados a disco forman el run-log para inspección post-hoc.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::TaskExecutionError;
use crate::runner::RunStatus;

/// Tipos de eventos emitidos durante un run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunEventKind {
    /// Emisión inicial de un run: fija el `graph_hash` y la cantidad de
    /// tasks. Invariante: debe ser el primer evento de un `run_id`.
    RunInitialized { graph_hash: String, task_count: usize },
    /// Un task fue despachado al backend. No implica éxito.
    TaskStarted {
        task_id: String,
        fingerprint: String,
        attempt: u32,
    },
    /// Un task terminó correctamente, con sus outputs (hashes) y fingerprint.
    TaskFinished {
        task_id: String,
        outputs: Vec<String>,
        fingerprint: String,
    },
    /// El fingerprint del task estaba en la cache: se publican los outputs
    /// almacenados sin ejecutar nada.
    TaskCached {
        task_id: String,
        outputs: Vec<String>,
        fingerprint: String,
    },
    /// Fallo transitorio: se programó un reintento con backoff.
    RetryScheduled {
        task_id: String,
        attempt: u32,
        delay_ms: u64,
        error: TaskExecutionError,
    },
    /// Fallo terminal del task (permanente o reintentos agotados).
    TaskFailed {
        task_id: String,
        error: TaskExecutionError,
        fingerprint: Option<String>,
    },
    /// Task excluido sin ejecutarse porque un ancestro falló.
    TaskSkipped { task_id: String, ancestor: String },
    /// Evento de cierre con el estado final y el fingerprint agregado del
    /// run (hash de fingerprints de tasks resueltos).
    RunCompleted {
        status: RunStatus,
        run_fingerprint: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub seq: u64, // asignado por el EventStore (orden de append)
    pub run_id: Uuid,
    pub kind: RunEventKind,
    pub ts: DateTime<Utc>, // metadato (no entra en fingerprint)
}
