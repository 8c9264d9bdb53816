//! Extracción de propiedades estructuradas desde la salida cruda del motor.

use std::sync::Arc;

use mat_core::errors::TaskExecutionError;
use mat_core::typed_task;
use mat_core::TaskKind;

use crate::artifacts::{PropertiesArtifact, QcOutputArtifact};
use crate::ports::QcOutputParser;

typed_task! {
    task ParseQcOutputTask {
        id: "parse_qc_output",
        kind: TaskKind::Transform,
        input: QcOutputArtifact,
        output: PropertiesArtifact,
        params: (),
        fields { parser: Arc<dyn QcOutputParser> }
        , run(_self, inp, _p) {
            _self
                .parser
                .parse(&inp.content)
                .map(|properties| PropertiesArtifact { properties, schema_version: 1 })
                .map_err(|e| TaskExecutionError::task(e.to_string()))
        }
    }
}
