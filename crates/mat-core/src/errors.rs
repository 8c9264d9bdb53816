//! Taxonomía de errores del core.
//!
//! - `ValidationError`: el grafo es estructuralmente inválido. Fatal, se
//!   detecta antes de cualquier dispatch.
//! - `TaskExecutionError`: fallo de la unidad ejecutable o del backend,
//!   clasificado `Transient` (reintentable) o `Permanent`.
//! - Los conflictos de escritura en cache son benignos: se resuelven con
//!   first-writer-wins y se registran en el log, nunca se propagan.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errores estructurales del grafo. Todas las variantes se detectan en
/// construcción (`add_task`/`add_edge`) o en `validate()`.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("duplicate task: {task_id}")]
    DuplicateTask { task_id: String },

    #[error("unknown task: {task_id}")]
    UnknownTask { task_id: String },

    #[error("unknown slot {slot:?} on task {task_id}")]
    UnknownSlot { task_id: String, slot: String },

    #[error("edge {src} -> {dst} would close a cycle")]
    Cycle { src: String, dst: String },

    #[error("slot type mismatch binding {dst}.{slot}: expected {expected}, found {found}")]
    SlotType {
        dst: String,
        slot: String,
        expected: String,
        found: String,
    },

    #[error("input slot {task_id}.{slot} already bound")]
    SlotAlreadyBound { task_id: String, slot: String },

    #[error("input slot {task_id}.{slot} is neither edge-bound nor externally supplied")]
    UnboundInput { task_id: String, slot: String },
}

/// Clasificación de un fallo de ejecución. Sólo `Transient` habilita retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    Transient,
    Permanent,
}

/// Fallo de una invocación de task (unidad ejecutable o backend).
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskExecutionError {
    /// La unidad ejecutable reportó un error propio (no reintentable).
    #[error("task failed: {message}")]
    Task { message: String },

    /// Error del backend o de la cola de jobs (reintentable).
    #[error("backend error: {message}")]
    Backend { message: String },

    /// Un artifact de entrada no pudo decodificarse al tipo declarado.
    #[error("input decode failed: {message}")]
    Decode { message: String },

    /// El task no expone una invocación ejecutable para este backend.
    #[error("task is not runnable on backend {backend}")]
    NotRunnable { backend: String },

    /// Cancelado por deadline global.
    #[error("cancelled")]
    Cancelled,

    /// Fallo inducido por un ancestro fallido; el task nunca se ejecutó.
    #[error("upstream task failed: {ancestor}")]
    Upstream { ancestor: String },
}

impl TaskExecutionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TaskExecutionError::Backend { .. } => FailureKind::Transient,
            _ => FailureKind::Permanent,
        }
    }

    pub fn task(message: impl Into<String>) -> Self {
        TaskExecutionError::Task { message: message.into() }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        TaskExecutionError::Backend { message: message.into() }
    }
}

/// Error de las stores de artifacts durables (io/serialización).
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(String),
    #[error("store serialization error: {0}")]
    Serde(String),
}

/// Error operacional del motor (no confundir con fallos por-task, que se
/// reportan en el `RunReport` sin abortar el pipeline).
#[derive(Debug, Error)]
pub enum CoreEngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("event store error: {0}")]
    EventStore(String),

    #[error("internal: {0}")]
    Internal(String),
}
