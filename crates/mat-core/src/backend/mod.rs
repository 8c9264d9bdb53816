//! Capacidad "executor backend": el core despacha tasks a través de esta
//! interfaz y queda agnóstico de dónde corre el trabajo (threads in-process,
//! subprocesos locales o una cola de jobs de cluster consultada por polling).
//!
//! El contrato es poll-based: `submit` devuelve un handle, `poll` nunca
//! bloquea, `result` consume el resultado una vez terminado y `cancel` es
//! best-effort. Así el dispatch loop del scheduler se mantiene single-threaded
//! y testeable sin un cluster vivo.

mod immediate;
mod process;
mod queue;
mod thread_pool;

pub use immediate::ImmediateBackend;
pub use process::ProcessBackend;
pub use queue::{QueueBackend, QueueConfig};
pub use thread_pool::ThreadPoolBackend;

use std::path::PathBuf;
use std::sync::Arc;

use crate::errors::TaskExecutionError;
use crate::model::{Artifact, ExecutionContext};
use crate::task::TaskDefinition;

/// Handle opaco de una submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackendHandle(pub(crate) u64);

/// Estado observable de una submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl BackendStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BackendStatus::Completed | BackendStatus::Failed)
    }
}

/// Invocación de programa externo equivalente a un task, para backends que
/// ejecutan fuera del proceso. Réplica del modelo executable + argumentos +
/// deck por stdin de los motores QC reales.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    /// Contenido entregado por stdin (p. ej. el input deck).
    pub stdin: Option<String>,
    /// Si está presente, el resultado se lee de este archivo al terminar;
    /// si no, del stdout del proceso.
    pub result_file: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: vec![],
            env: vec![],
            stdin: None,
            result_file: None,
        }
    }

    pub fn arg(mut self, a: impl Into<String>) -> Self {
        self.args.push(a.into());
        self
    }

    pub fn env(mut self, k: impl Into<String>, v: impl Into<String>) -> Self {
        self.env.push((k.into(), v.into()));
        self
    }

    pub fn stdin(mut self, content: impl Into<String>) -> Self {
        self.stdin = Some(content.into());
        self
    }

    pub fn result_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.result_file = Some(path.into());
        self
    }
}

/// Backend polimórfico de ejecución.
pub trait ExecutorBackend: Send + Sync {
    /// Nombre corto para logs y errores.
    fn name(&self) -> &'static str;

    /// Despacha un task con sus inputs resueltos. El error de submit se
    /// clasifica como cualquier otro fallo (backend => transitorio).
    fn submit(
        &self,
        task: Arc<dyn TaskDefinition>,
        ctx: ExecutionContext,
    ) -> Result<BackendHandle, TaskExecutionError>;

    /// Consulta no bloqueante del estado.
    fn poll(&self, handle: BackendHandle) -> BackendStatus;

    /// Consume el resultado de una submission terminada.
    fn result(&self, handle: BackendHandle) -> Result<Vec<Artifact>, TaskExecutionError>;

    /// Cancelación best-effort.
    fn cancel(&self, handle: BackendHandle);
}

/// Convierte el `TaskRunResult` de una ejecución in-process al resultado
/// neutro del backend.
pub(crate) fn run_in_worker(
    task: &dyn TaskDefinition,
    ctx: &ExecutionContext,
) -> Result<Vec<Artifact>, TaskExecutionError> {
    match task.run(ctx) {
        crate::task::TaskRunResult::Success { outputs } => Ok(outputs),
        crate::task::TaskRunResult::Failure { error } => Err(error),
    }
}
