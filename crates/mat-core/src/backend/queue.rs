//! Backend de cola de jobs de cluster (estilo SLURM/PBS).
//!
//! No habla ningún protocolo propietario: se configura con tres comandos
//! externos y los consulta por polling, que es como operan las colas reales.
//! - `submit_cmd [program args...]` con el deck por stdin; imprime el job id.
//! - `status_cmd <job_id>` imprime un token de estado (PENDING/RUNNING/
//!   COMPLETED/FAILED, case-insensitive).
//! - `cancel_cmd <job_id>` cancela el job.
//! El resultado se lee de `CommandSpec::result_file`, que el job debe dejar
//! en almacenamiento compartido.

use dashmap::DashMap;
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::{BackendHandle, BackendStatus, CommandSpec, ExecutorBackend};
use crate::errors::TaskExecutionError;
use crate::model::{Artifact, ArtifactKind, ExecutionContext};
use crate::task::TaskDefinition;

/// Comandos que median con la cola. Cada uno es argv completo; los operandos
/// del job se agregan al final.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub submit_cmd: Vec<String>,
    pub status_cmd: Vec<String>,
    pub cancel_cmd: Vec<String>,
}

struct QueueJob {
    job_id: String,
    spec: CommandSpec,
}

pub struct QueueBackend {
    config: QueueConfig,
    next: AtomicU64,
    jobs: DashMap<u64, QueueJob>,
}

impl QueueBackend {
    pub fn new(config: QueueConfig) -> Self {
        Self { config, next: AtomicU64::new(0), jobs: DashMap::new() }
    }

    fn run_helper(argv: &[String], extra: &[String], stdin: Option<&str>) -> Result<String, TaskExecutionError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| TaskExecutionError::backend("queue helper command is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(args).args(extra);
        let output = if let Some(content) = stdin {
            use std::io::Write;
            use std::process::Stdio;
            let mut child = cmd
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()
                .map_err(|e| TaskExecutionError::backend(format!("spawn {program} failed: {e}")))?;
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(content.as_bytes())
                    .map_err(|e| TaskExecutionError::backend(format!("stdin write failed: {e}")))?;
            }
            child
                .wait_with_output()
                .map_err(|e| TaskExecutionError::backend(format!("wait {program} failed: {e}")))?
        } else {
            cmd.output()
                .map_err(|e| TaskExecutionError::backend(format!("spawn {program} failed: {e}")))?
        };
        if !output.status.success() {
            return Err(TaskExecutionError::backend(format!(
                "{program} exited with failure: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl ExecutorBackend for QueueBackend {
    fn name(&self) -> &'static str {
        "cluster-queue"
    }

    fn submit(
        &self,
        task: Arc<dyn TaskDefinition>,
        ctx: ExecutionContext,
    ) -> Result<BackendHandle, TaskExecutionError> {
        let spec = task
            .command(&ctx)
            .ok_or(TaskExecutionError::NotRunnable { backend: "cluster-queue".to_string() })?;

        let mut extra = vec![spec.program.clone()];
        extra.extend(spec.args.iter().cloned());
        let job_id = Self::run_helper(&self.config.submit_cmd, &extra, spec.stdin.as_deref())?;
        if job_id.is_empty() {
            return Err(TaskExecutionError::backend("queue submit returned no job id"));
        }

        let id = self.next.fetch_add(1, Ordering::Relaxed);
        log::info!("submitted queue job {job_id} for task {}", task.id());
        self.jobs.insert(id, QueueJob { job_id, spec });
        Ok(BackendHandle(id))
    }

    fn poll(&self, handle: BackendHandle) -> BackendStatus {
        let Some(job) = self.jobs.get(&handle.0) else {
            return BackendStatus::Failed;
        };
        match Self::run_helper(&self.config.status_cmd, &[job.job_id.clone()], None) {
            Ok(token) => match token.to_ascii_uppercase().as_str() {
                "PENDING" | "QUEUED" => BackendStatus::Queued,
                "COMPLETED" | "DONE" => BackendStatus::Completed,
                "FAILED" | "CANCELLED" | "TIMEOUT" => BackendStatus::Failed,
                _ => BackendStatus::Running,
            },
            // la cola no respondió: sigue outstanding, se reintenta el poll
            Err(_) => BackendStatus::Running,
        }
    }

    fn result(&self, handle: BackendHandle) -> Result<Vec<Artifact>, TaskExecutionError> {
        let Some((_, job)) = self.jobs.remove(&handle.0) else {
            return Err(TaskExecutionError::backend(format!("unknown handle {}", handle.0)));
        };
        let path = job
            .spec
            .result_file
            .as_ref()
            .ok_or_else(|| TaskExecutionError::backend("queue task has no result_file"))?;
        let raw = std::fs::read_to_string(path)
            .map_err(|e| TaskExecutionError::backend(format!("result file unreadable: {e}")))?;
        let payload = serde_json::from_str(&raw)
            .unwrap_or_else(|_| serde_json::json!({ "raw": raw.trim(), "schema_version": 1 }));
        let mut artifact = Artifact::new_unhashed(ArtifactKind::GenericJson, payload, None);
        artifact.ensure_hashed();
        Ok(vec![artifact])
    }

    fn cancel(&self, handle: BackendHandle) {
        if let Some(job) = self.jobs.get(&handle.0) {
            if let Err(e) = Self::run_helper(&self.config.cancel_cmd, &[job.job_id.clone()], None) {
                log::warn!("cancel of queue job {} failed: {e}", job.job_id);
            }
        }
    }
}
