use crate::{errors::TaskExecutionError, model::Artifact};

/// Resultado abstracto de ejecutar un task.
pub enum TaskRunResult {
    Success { outputs: Vec<Artifact> },
    Failure { error: TaskExecutionError },
}
