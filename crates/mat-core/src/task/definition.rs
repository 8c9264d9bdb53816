use serde_json::Value;

use super::run_result::TaskRunResult;
use crate::backend::CommandSpec;
use crate::hashing::hash_value;
use crate::model::ExecutionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Source,
    Transform,
    Sink,
    Check,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Source => "source",
            TaskKind::Transform => "transform",
            TaskKind::Sink => "sink",
            TaskKind::Check => "check",
        }
    }
}

/// Slot tipado de entrada o salida. `ty` es el nombre estable de esquema del
/// artifact esperado (`ArtifactSpec::SCHEMA_NAME`); el grafo lo usa para
/// rechazar edges incompatibles en construcción.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSpec {
    pub name: String,
    pub ty: String,
}

impl SlotSpec {
    pub fn new(name: &str, ty: &str) -> Self {
        Self { name: name.to_string(), ty: ty.to_string() }
    }
}

/// Trait que define un Task. Implementaciones deben ser puras respecto a
/// inputs + params: misma entrada, misma salida.
pub trait TaskDefinition: Send + Sync {
    /// Identificador estable y único dentro del grafo.
    fn id(&self) -> &str;

    /// Nombre opcional amigable.
    fn name(&self) -> &str {
        self.id()
    }

    /// Tipo general del task.
    fn kind(&self) -> TaskKind;

    /// Slots de entrada, en orden. Vacío para sources.
    fn input_slots(&self) -> Vec<SlotSpec>;

    /// Slots de salida, en orden.
    fn output_slots(&self) -> Vec<SlotSpec>;

    /// Parámetros base deterministas (defaults). Se fusionan con overrides
    /// inyectados antes de calcular el fingerprint.
    fn base_params(&self) -> Value;

    /// Ejecución pura del task. Debe usar únicamente inputs + params.
    fn run(&self, ctx: &ExecutionContext) -> TaskRunResult;

    /// Invocación de programa externo equivalente a `run`, para backends de
    /// procesos o de cola de cluster. `None` si el task sólo corre in-process.
    fn command(&self, _ctx: &ExecutionContext) -> Option<CommandSpec> {
        None
    }

    /// Hash estable de la definición: identifica la implementación del task
    /// dentro del fingerprint. Cambiar slots o params base lo invalida.
    fn definition_hash(&self) -> String {
        let slots = |v: Vec<SlotSpec>| -> Vec<Value> {
            v.into_iter()
                .map(|s| serde_json::json!({ "name": s.name, "ty": s.ty }))
                .collect()
        };
        let hash_input = serde_json::json!({
            "id": self.id(),
            "kind": self.kind().as_str(),
            "inputs": slots(self.input_slots()),
            "outputs": slots(self.output_slots()),
            "base_params": self.base_params(),
        });
        hash_value(&hash_input)
    }
}
