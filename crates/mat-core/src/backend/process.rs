//! Backend de subprocesos locales.
//!
//! Ejecuta tasks que exponen una invocación externa (`TaskDefinition::
//! command`). El protocolo de resultado es simple: el programa imprime el
//! payload JSON del artifact por stdout (o lo deja en `result_file`), con
//! exit code 0. Exit code distinto de 0 es un fallo permanente del task;
//! un error de spawn/io es un fallo del backend (transitorio).

use dashmap::DashMap;
use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::{BackendHandle, BackendStatus, CommandSpec, ExecutorBackend};
use crate::errors::TaskExecutionError;
use crate::model::{Artifact, ArtifactKind, ExecutionContext};
use crate::task::TaskDefinition;

struct ProcessJob {
    child: Child,
    spec: CommandSpec,
}

#[derive(Default)]
pub struct ProcessBackend {
    next: AtomicU64,
    jobs: DashMap<u64, Mutex<ProcessJob>>,
    done: DashMap<u64, Result<Vec<Artifact>, TaskExecutionError>>,
}

impl ProcessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Si el proceso terminó, mueve su resultado a `done` y libera el job.
    fn reap(&self, id: u64) {
        let finished = {
            let Some(job) = self.jobs.get(&id) else { return };
            let Ok(mut job) = job.lock() else { return };
            match job.child.try_wait() {
                Ok(Some(status)) => Some(collect_result(&mut job, status.success())),
                Ok(None) => None,
                Err(e) => Some(Err(TaskExecutionError::backend(format!("wait failed: {e}")))),
            }
        };
        if let Some(result) = finished {
            self.done.insert(id, result);
            self.jobs.remove(&id);
        }
    }
}

fn collect_result(job: &mut ProcessJob, success: bool) -> Result<Vec<Artifact>, TaskExecutionError> {
    use std::io::Read;

    let mut stdout = String::new();
    if let Some(mut out) = job.child.stdout.take() {
        let _ = out.read_to_string(&mut stdout);
    }
    let mut stderr = String::new();
    if let Some(mut err) = job.child.stderr.take() {
        let _ = err.read_to_string(&mut stderr);
    }

    if !success {
        return Err(TaskExecutionError::task(format!(
            "process exited with failure: {}",
            stderr.trim()
        )));
    }

    let raw = match &job.spec.result_file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| TaskExecutionError::backend(format!("result file unreadable: {e}")))?,
        None => stdout,
    };

    // Payload JSON si parsea; si no, el texto crudo envuelto
    let payload = serde_json::from_str(&raw)
        .unwrap_or_else(|_| serde_json::json!({ "raw": raw.trim(), "schema_version": 1 }));
    let mut artifact = Artifact::new_unhashed(ArtifactKind::GenericJson, payload, None);
    artifact.ensure_hashed();
    Ok(vec![artifact])
}

impl ExecutorBackend for ProcessBackend {
    fn name(&self) -> &'static str {
        "process"
    }

    fn submit(
        &self,
        task: Arc<dyn TaskDefinition>,
        ctx: ExecutionContext,
    ) -> Result<BackendHandle, TaskExecutionError> {
        let spec = task
            .command(&ctx)
            .ok_or(TaskExecutionError::NotRunnable { backend: "process".to_string() })?;

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(if spec.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| TaskExecutionError::backend(format!("spawn {} failed: {e}", spec.program)))?;

        if let Some(content) = &spec.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(content.as_bytes())
                    .map_err(|e| TaskExecutionError::backend(format!("stdin write failed: {e}")))?;
            }
        }

        let id = self.next.fetch_add(1, Ordering::Relaxed);
        self.jobs.insert(id, Mutex::new(ProcessJob { child, spec }));
        Ok(BackendHandle(id))
    }

    fn poll(&self, handle: BackendHandle) -> BackendStatus {
        self.reap(handle.0);
        match self.done.get(&handle.0) {
            Some(r) if r.is_ok() => BackendStatus::Completed,
            Some(_) => BackendStatus::Failed,
            None if self.jobs.contains_key(&handle.0) => BackendStatus::Running,
            None => BackendStatus::Failed,
        }
    }

    fn result(&self, handle: BackendHandle) -> Result<Vec<Artifact>, TaskExecutionError> {
        self.reap(handle.0);
        self.done
            .remove(&handle.0)
            .map(|(_, r)| r)
            .unwrap_or_else(|| Err(TaskExecutionError::backend(format!("result not ready for handle {}", handle.0))))
    }

    fn cancel(&self, handle: BackendHandle) {
        if let Some(job) = self.jobs.get(&handle.0) {
            if let Ok(mut job) = job.lock() {
                let _ = job.child.kill();
            }
        }
    }
}
