use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::{run_in_worker, BackendHandle, BackendStatus, ExecutorBackend};
use crate::errors::{CoreEngineError, TaskExecutionError};
use crate::model::{Artifact, ExecutionContext};
use crate::task::TaskDefinition;

/// Backend de threads in-process sobre un pool rayon dedicado.
///
/// Cada submit encola un closure en el pool; el worker publica el resultado
/// en un mapa de completions que `poll` consulta sin bloquear. La
/// cancelación es cooperativa: marca el handle y el worker lo respeta si
/// todavía no empezó.
pub struct ThreadPoolBackend {
    pool: rayon::ThreadPool,
    next: AtomicU64,
    done: Arc<DashMap<u64, Result<Vec<Artifact>, TaskExecutionError>>>,
    started: Arc<DashSet<u64>>,
    cancelled: Arc<DashSet<u64>>,
}

impl ThreadPoolBackend {
    pub fn new(num_threads: usize) -> Result<Self, CoreEngineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| CoreEngineError::Internal(format!("thread pool build failed: {e}")))?;
        Ok(Self {
            pool,
            next: AtomicU64::new(0),
            done: Arc::new(DashMap::new()),
            started: Arc::new(DashSet::new()),
            cancelled: Arc::new(DashSet::new()),
        })
    }
}

impl ExecutorBackend for ThreadPoolBackend {
    fn name(&self) -> &'static str {
        "thread-pool"
    }

    fn submit(
        &self,
        task: Arc<dyn TaskDefinition>,
        ctx: ExecutionContext,
    ) -> Result<BackendHandle, TaskExecutionError> {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        let done = Arc::clone(&self.done);
        let started = Arc::clone(&self.started);
        let cancelled = Arc::clone(&self.cancelled);
        self.pool.spawn(move || {
            if cancelled.contains(&id) {
                done.insert(id, Err(TaskExecutionError::Cancelled));
                return;
            }
            started.insert(id);
            let result = run_in_worker(task.as_ref(), &ctx);
            done.insert(id, result);
        });
        Ok(BackendHandle(id))
    }

    fn poll(&self, handle: BackendHandle) -> BackendStatus {
        match self.done.get(&handle.0) {
            Some(r) if r.is_ok() => BackendStatus::Completed,
            Some(_) => BackendStatus::Failed,
            None if self.started.contains(&handle.0) => BackendStatus::Running,
            None => BackendStatus::Queued,
        }
    }

    fn result(&self, handle: BackendHandle) -> Result<Vec<Artifact>, TaskExecutionError> {
        self.done
            .remove(&handle.0)
            .map(|(_, r)| r)
            .unwrap_or_else(|| Err(TaskExecutionError::backend(format!("result not ready for handle {}", handle.0))))
    }

    fn cancel(&self, handle: BackendHandle) {
        self.cancelled.insert(handle.0);
    }
}
