//! Normalización de estructuras vía el conversor externo.

use std::sync::Arc;

use mat_core::errors::TaskExecutionError;
use mat_core::typed_task;
use mat_core::TaskKind;

use crate::artifacts::{RawStructureArtifact, StructureArtifact};
use crate::ports::StructureConverter;

typed_task! {
    task ConvertStructureTask {
        id: "convert_structure",
        kind: TaskKind::Transform,
        input: RawStructureArtifact,
        output: StructureArtifact,
        params: (),
        fields { converter: Arc<dyn StructureConverter> }
        , run(_self, inp, _p) {
            _self
                .converter
                .convert(&inp.format, &inp.content)
                .map(|structure| StructureArtifact { structure, schema_version: 1 })
                .map_err(|e| TaskExecutionError::task(e.to_string()))
        }
    }
}
