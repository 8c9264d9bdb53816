use serde::{Deserialize, Serialize};

/// Estado de una invocación de task.
///
/// Transiciones válidas:
/// - `Pending` -> `Ready` -> `Running` -> `Succeeded` | `Failed`
/// - `Ready` -> `Cached` (hit de cache, sin ejecución)
/// - `Running` -> `Pending` (retry programado tras fallo transitorio)
/// - `Pending` -> `Failed` (propagación desde un ancestro fallido)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Ready,
    Running,
    Succeeded,
    Failed,
    Cached,
}

impl TaskStatus {
    /// Un task en estado terminal no vuelve a planificarse.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed | TaskStatus::Cached)
    }

    /// Sus outputs están materializados y disponibles para dependientes.
    pub fn is_resolved(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Cached)
    }
}
