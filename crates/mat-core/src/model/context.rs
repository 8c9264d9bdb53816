use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{Artifact, ArtifactDecodeError, ArtifactSpec};

/// Contexto de ejecución entregado a `TaskDefinition::run`.
///
/// `inputs` viene alineado con el orden de declaración de los slots de
/// entrada del task; el scheduler garantiza que todos están materializados
/// antes de construir el contexto.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub inputs: Vec<Artifact>,
    pub params: Value,
}

impl ExecutionContext {
    pub fn new(inputs: Vec<Artifact>, params: Value) -> Self {
        Self { inputs, params }
    }

    /// Decodifica los params al tipo dado.
    pub fn params_as<P: DeserializeOwned>(&self) -> Result<P, serde_json::Error> {
        serde_json::from_value(self.params.clone())
    }

    /// Decodifica el input en la posición `idx` como artifact tipado.
    pub fn input_as<T: ArtifactSpec>(&self, idx: usize) -> Result<T, ArtifactDecodeError> {
        let raw = self
            .inputs
            .get(idx)
            .ok_or_else(|| ArtifactDecodeError::Deserialize(format!("missing input at slot {idx}")))?;
        T::from_artifact(raw)
    }

    /// Primer input, para los tasks encadenados de un solo slot.
    pub fn single_input(&self) -> Option<&Artifact> {
        self.inputs.first()
    }
}
