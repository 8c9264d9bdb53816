//! Análisis de simetría de la estructura normalizada.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use mat_core::errors::TaskExecutionError;
use mat_core::typed_task;
use mat_core::TaskKind;

use crate::artifacts::{StructureArtifact, SymmetryArtifact};
use crate::ports::SymmetryAnalyzer;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymmetryParams {
    pub tolerance: f64,
}

impl Default for SymmetryParams {
    fn default() -> Self {
        Self { tolerance: 1e-2 }
    }
}

typed_task! {
    task AnalyzeSymmetryTask {
        id: "analyze_symmetry",
        kind: TaskKind::Transform,
        input: StructureArtifact,
        output: SymmetryArtifact,
        params: SymmetryParams,
        fields { analyzer: Arc<dyn SymmetryAnalyzer> }
        , run(_self, inp, p) {
            _self
                .analyzer
                .analyze(&inp.structure, p.tolerance)
                .map(|descriptor| SymmetryArtifact { descriptor, schema_version: 1 })
                .map_err(|e| TaskExecutionError::task(e.to_string()))
        }
    }
}
