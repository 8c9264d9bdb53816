//! Tasks del motor de química cuántica: preparación del input deck y
//! ejecución (in-process vía puerto, o externa vía `CommandSpec` para los
//! backends de procesos y de cola de cluster).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use mat_core::errors::TaskExecutionError;
use mat_core::typed_task;
use mat_core::{CommandSpec, ExecutionContext, SlotSpec, TaskDefinition, TaskKind, TaskRunResult};
use mat_domain::{JobType, QcSettings};

use crate::artifacts::{QcInputArtifact, QcOutputArtifact, StructureArtifact};
use crate::ports::QcEngine;
use mat_core::model::ArtifactSpec;

/// Parámetros del deck. Los campos no fijados se completan con los defaults
/// del tipo de job al renderizar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcParams {
    pub job_type: JobType,
    pub basis: Option<String>,
    pub method: Option<String>,
}

impl Default for QcParams {
    fn default() -> Self {
        Self { job_type: JobType::SinglePoint, basis: None, method: None }
    }
}

typed_task! {
    task PrepareQcInputTask {
        id: "prepare_qc_input",
        kind: TaskKind::Transform,
        input: StructureArtifact,
        output: QcInputArtifact,
        params: QcParams,
        run(_self, inp, p) {
            let mut settings = QcSettings::new();
            if let Some(basis) = &p.basis {
                settings.set("rem", "basis", basis.clone());
            }
            if let Some(method) = &p.method {
                settings.set("rem", "method", method.clone());
            }
            settings.apply_defaults(p.job_type);
            Ok(QcInputArtifact {
                deck: settings.render(&inp.structure),
                job_type: p.job_type.as_str().to_string(),
                schema_version: 1,
            })
        }
    }
}

typed_task! {
    task RunQcTask {
        id: "run_qc",
        kind: TaskKind::Transform,
        input: QcInputArtifact,
        output: QcOutputArtifact,
        params: (),
        fields { engine: Arc<dyn QcEngine> }
        , run(_self, inp, _p) {
            _self
                .engine
                .execute(&inp.deck)
                .map(|content| QcOutputArtifact { content, schema_version: 1 })
                .map_err(|e| TaskExecutionError::task(e.to_string()))
        }
    }
}

/// Parámetros de la invocación externa del motor (ejecutable + threads),
/// calcados del modelo `executable -nt N` de los motores reales.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcCommandParams {
    pub executable: String,
    pub num_threads: Option<u32>,
}

impl Default for QcCommandParams {
    fn default() -> Self {
        Self { executable: "qcengine".to_string(), num_threads: None }
    }
}

/// Variante externa de `run_qc`: no corre in-process; expone un
/// `CommandSpec` que los backends de proceso/cola ejecutan. El programa
/// recibe el deck por stdin y debe imprimir el payload JSON del
/// `QcOutputArtifact` por stdout (o dejarlo en el result file compartido).
#[derive(Debug, Clone)]
pub struct QcCommandTask {
    params: QcCommandParams,
    result_file: Option<std::path::PathBuf>,
}

impl QcCommandTask {
    pub fn new(params: QcCommandParams) -> Self {
        Self { params, result_file: None }
    }

    /// Archivo (en storage compartido) donde el job de cola deja el payload.
    pub fn with_result_file(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.result_file = Some(path.into());
        self
    }
}

impl TaskDefinition for QcCommandTask {
    fn id(&self) -> &str {
        "run_qc_external"
    }

    fn kind(&self) -> TaskKind {
        TaskKind::Transform
    }

    fn input_slots(&self) -> Vec<SlotSpec> {
        vec![SlotSpec::new("in", QcInputArtifact::SCHEMA_NAME)]
    }

    fn output_slots(&self) -> Vec<SlotSpec> {
        vec![SlotSpec::new("out", QcOutputArtifact::SCHEMA_NAME)]
    }

    fn base_params(&self) -> serde_json::Value {
        serde_json::to_value(&self.params).unwrap_or(serde_json::Value::Null)
    }

    fn run(&self, _ctx: &ExecutionContext) -> TaskRunResult {
        TaskRunResult::Failure {
            error: TaskExecutionError::NotRunnable { backend: "in-process".to_string() },
        }
    }

    fn command(&self, ctx: &ExecutionContext) -> Option<CommandSpec> {
        let input: QcInputArtifact = ctx.input_as(0).ok()?;
        let mut spec = CommandSpec::new(&self.params.executable).stdin(input.deck);
        if let Some(nt) = self.params.num_threads {
            spec = spec.arg("-nt").arg(nt.to_string());
        }
        if let Some(path) = &self.result_file {
            spec = spec.result_file(path.clone());
        }
        Some(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::StubQcEngine;
    use mat_domain::Structure;

    fn structure_artifact() -> StructureArtifact {
        StructureArtifact {
            structure: Structure::neutral(vec!["H".into()], vec![[0.0; 3]]).unwrap(),
            schema_version: 1,
        }
    }

    #[test]
    fn prepare_renders_deck_with_job_defaults() {
        use mat_core::task::{TaskRunResultTyped, TypedTask};
        let task = PrepareQcInputTask::new();
        let result = task.run_typed(Some(structure_artifact()), QcParams::default());
        match result {
            TaskRunResultTyped::Success { outputs } => {
                let deck = &outputs[0].deck;
                assert!(deck.contains("$molecule"));
                assert!(deck.contains("jobtype"));
                assert!(deck.contains("3-21G"));
            }
            TaskRunResultTyped::Failure { .. } => panic!("prepare must succeed"),
        }
    }

    #[test]
    fn command_task_builds_spec_from_deck() {
        let task = QcCommandTask::new(QcCommandParams {
            executable: "qcengine".to_string(),
            num_threads: Some(4),
        });
        let input = QcInputArtifact {
            deck: "$molecule\n$end\n".to_string(),
            job_type: "sp".to_string(),
            schema_version: 1,
        };
        let ctx = ExecutionContext::new(vec![input.into_artifact()], serde_json::Value::Null);
        let spec = task.command(&ctx).expect("command spec");
        assert_eq!(spec.program, "qcengine");
        assert_eq!(spec.args, vec!["-nt", "4"]);
        assert!(spec.stdin.unwrap().contains("$molecule"));
    }

    #[test]
    fn run_qc_feeds_engine_and_wraps_output() {
        use mat_core::task::{TaskRunResultTyped, TypedTask};
        let task = RunQcTask::new(Arc::new(StubQcEngine));
        let input = QcInputArtifact {
            deck: "$molecule\n$end\n".to_string(),
            job_type: "sp".to_string(),
            schema_version: 1,
        };
        match task.run_typed(Some(input), ()) {
            TaskRunResultTyped::Success { outputs } => {
                assert!(outputs[0].content.contains("Total energy"));
            }
            TaskRunResultTyped::Failure { .. } => panic!("stub engine must succeed"),
        }
    }
}
