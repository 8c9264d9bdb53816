use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::{run_in_worker, BackendHandle, BackendStatus, ExecutorBackend};
use crate::errors::TaskExecutionError;
use crate::model::{Artifact, ExecutionContext};
use crate::task::TaskDefinition;

/// Backend síncrono: ejecuta el task dentro de `submit`. Determinista y sin
/// threads; es el backend de referencia para tests del scheduler.
#[derive(Default)]
pub struct ImmediateBackend {
    next: AtomicU64,
    done: DashMap<u64, Result<Vec<Artifact>, TaskExecutionError>>,
}

impl ImmediateBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExecutorBackend for ImmediateBackend {
    fn name(&self) -> &'static str {
        "immediate"
    }

    fn submit(
        &self,
        task: Arc<dyn TaskDefinition>,
        ctx: ExecutionContext,
    ) -> Result<BackendHandle, TaskExecutionError> {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        self.done.insert(id, run_in_worker(task.as_ref(), &ctx));
        Ok(BackendHandle(id))
    }

    fn poll(&self, handle: BackendHandle) -> BackendStatus {
        match self.done.get(&handle.0) {
            Some(r) if r.is_ok() => BackendStatus::Completed,
            Some(_) => BackendStatus::Failed,
            None => BackendStatus::Failed, // handle desconocido o ya consumido
        }
    }

    fn result(&self, handle: BackendHandle) -> Result<Vec<Artifact>, TaskExecutionError> {
        self.done
            .remove(&handle.0)
            .map(|(_, r)| r)
            .unwrap_or_else(|| Err(TaskExecutionError::backend(format!("unknown handle {}", handle.0))))
    }

    fn cancel(&self, _handle: BackendHandle) {
        // nada que cancelar: el trabajo ya corrió en submit
    }
}
