//! Sink de fan-in: combina estructura, propiedades y simetría en el resumen
//! final del pipeline. Tres slots de entrada, así que implementa
//! `TaskDefinition` directamente en lugar de pasar por `TypedTask`.

use mat_core::errors::TaskExecutionError;
use mat_core::model::ArtifactSpec;
use mat_core::{ExecutionContext, SlotSpec, TaskDefinition, TaskKind, TaskRunResult};

use crate::artifacts::{PropertiesArtifact, ReportArtifact, StructureArtifact, SymmetryArtifact};

#[derive(Debug, Clone, Default)]
pub struct BuildReportTask;

impl BuildReportTask {
    pub fn new() -> Self {
        Self
    }
}

impl TaskDefinition for BuildReportTask {
    fn id(&self) -> &str {
        "build_report"
    }

    fn kind(&self) -> TaskKind {
        TaskKind::Sink
    }

    fn input_slots(&self) -> Vec<SlotSpec> {
        vec![
            SlotSpec::new("structure", StructureArtifact::SCHEMA_NAME),
            SlotSpec::new("properties", PropertiesArtifact::SCHEMA_NAME),
            SlotSpec::new("symmetry", SymmetryArtifact::SCHEMA_NAME),
        ]
    }

    fn output_slots(&self) -> Vec<SlotSpec> {
        vec![SlotSpec::new("out", ReportArtifact::SCHEMA_NAME)]
    }

    fn base_params(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    fn run(&self, ctx: &ExecutionContext) -> TaskRunResult {
        let decode = || -> Result<ReportArtifact, TaskExecutionError> {
            let structure: StructureArtifact = ctx
                .input_as(0)
                .map_err(|e| TaskExecutionError::Decode { message: e.to_string() })?;
            let properties: PropertiesArtifact = ctx
                .input_as(1)
                .map_err(|e| TaskExecutionError::Decode { message: e.to_string() })?;
            let symmetry: SymmetryArtifact = ctx
                .input_as(2)
                .map_err(|e| TaskExecutionError::Decode { message: e.to_string() })?;
            Ok(ReportArtifact {
                formula: structure.structure.formula(),
                properties: properties.properties,
                symmetry: symmetry.descriptor,
                schema_version: 1,
            })
        };
        match decode() {
            Ok(report) => TaskRunResult::Success { outputs: vec![report.into_artifact()] },
            Err(error) => TaskRunResult::Failure { error },
        }
    }
}
