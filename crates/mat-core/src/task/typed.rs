use serde::{de::DeserializeOwned, Serialize};

use super::{SlotSpec, TaskKind, TaskRunResult};
use crate::errors::TaskExecutionError;
use crate::model::ArtifactSpec;

/// Resultado tipado de ejecutar un `TypedTask`.
///
/// Permite trabajar con outputs fuertemente tipados durante la implementación
/// de tasks y convertirlos a la representación neutra que el engine usa.
pub enum TaskRunResultTyped<Out: ArtifactSpec + Clone> {
    Success { outputs: Vec<Out> },
    Failure { error: TaskExecutionError },
}

impl<Out: ArtifactSpec + Clone> TaskRunResultTyped<Out> {
    /// Convierte a `TaskRunResult` neutro serializando los outputs a
    /// `Artifact` usando `ArtifactSpec::into_artifact`.
    pub fn into_neutral(self) -> TaskRunResult {
        match self {
            TaskRunResultTyped::Success { outputs } => {
                let arts = outputs.into_iter().map(|o| o.into_artifact()).collect();
                TaskRunResult::Success { outputs: arts }
            }
            TaskRunResultTyped::Failure { error } => TaskRunResult::Failure { error },
        }
    }
}

impl<Out: ArtifactSpec + Clone> From<Result<Out, TaskExecutionError>> for TaskRunResultTyped<Out> {
    fn from(r: Result<Out, TaskExecutionError>) -> Self {
        match r {
            Ok(out) => TaskRunResultTyped::Success { outputs: vec![out] },
            Err(error) => TaskRunResultTyped::Failure { error },
        }
    }
}

/// Interfaz de alto nivel para definir Tasks con tipos fuertes
/// (Params / Input / Output).
///
/// Implementadores escriben `run_typed` con tipos concretos; el adaptador de
/// abajo convierte esa ejecución a la interfaz neutra `TaskDefinition`.
/// Cubre los casos de 0 y 1 slot de entrada; tasks con fan-in de varios
/// slots implementan `TaskDefinition` directamente.
pub trait TypedTask {
    /// Parámetros deserializables y clonables (soportan `Default`).
    type Params: DeserializeOwned + Serialize + Clone + Default;
    /// Tipo concreto esperado como input (implementa `ArtifactSpec`).
    type Input: ArtifactSpec + Clone;
    /// Tipo concreto producido como output (implementa `ArtifactSpec`).
    type Output: ArtifactSpec + Clone;

    /// Identificador estable del task dentro del grafo.
    fn id(&self) -> &'static str;

    /// Nombre amigable (por defecto usa el id).
    fn name(&self) -> &str {
        self.id()
    }

    /// Tipo general del task.
    fn kind(&self) -> TaskKind;

    /// Parámetros por defecto deterministas.
    fn params_default(&self) -> Self::Params {
        Default::default()
    }

    /// Identidad del valor capturado por la instancia (p. ej. el contenido
    /// fijo de un source). Entra al definition hash: dos sources con el mismo
    /// id pero distinto valor no comparten cache. `Null` si el task no
    /// captura datos hasheables.
    fn seed(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    /// Ejecución tipada. Para `Source`, `input` será `None`.
    fn run_typed(&self, input: Option<Self::Input>, params: Self::Params) -> TaskRunResultTyped<Self::Output>;
}

// -------------------------------------------------------------
// Adaptador: cualquier `TypedTask` implementa `TaskDefinition` neutro.
// -------------------------------------------------------------
impl<T> crate::task::TaskDefinition for T
where
    T: TypedTask + Send + Sync + 'static + std::fmt::Debug,
{
    fn id(&self) -> &str {
        <Self as TypedTask>::id(self)
    }

    fn name(&self) -> &str {
        <Self as TypedTask>::name(self)
    }

    fn kind(&self) -> TaskKind {
        <Self as TypedTask>::kind(self)
    }

    fn input_slots(&self) -> Vec<SlotSpec> {
        match <Self as TypedTask>::kind(self) {
            TaskKind::Source => vec![],
            _ => vec![SlotSpec::new("in", <Self as TypedTask>::Input::SCHEMA_NAME)],
        }
    }

    fn output_slots(&self) -> Vec<SlotSpec> {
        vec![SlotSpec::new("out", <Self as TypedTask>::Output::SCHEMA_NAME)]
    }

    fn base_params(&self) -> serde_json::Value {
        serde_json::to_value(self.params_default()).unwrap_or(serde_json::Value::Null)
    }

    fn run(&self, ctx: &crate::model::ExecutionContext) -> TaskRunResult {
        // Params inválidos caen a los defaults del task
        let params: <Self as TypedTask>::Params =
            ctx.params_as().unwrap_or_else(|_| self.params_default());

        // Decodifica el input si el task lo declara; un artifact incompatible
        // es un fallo permanente, no un panic.
        let typed_in: Option<<Self as TypedTask>::Input> = match <Self as TypedTask>::kind(self) {
            TaskKind::Source => None,
            _ => match ctx.input_as::<<Self as TypedTask>::Input>(0) {
                Ok(v) => Some(v),
                Err(e) => {
                    return TaskRunResult::Failure {
                        error: TaskExecutionError::Decode { message: e.to_string() },
                    }
                }
            },
        };

        <Self as TypedTask>::run_typed(self, typed_in, params).into_neutral()
    }

    fn definition_hash(&self) -> String {
        // El tipo concreto entra al hash como proxy de la implementación:
        // dos tasks con el mismo id pero distinto código no comparten cache.
        let hash_input = serde_json::json!({
            "id": <Self as TypedTask>::id(self),
            "kind": <Self as TypedTask>::kind(self).as_str(),
            "base_params": crate::task::TaskDefinition::base_params(self),
            "seed": <Self as TypedTask>::seed(self),
            "type": std::any::type_name::<T>(),
        });
        crate::hashing::hash_value(&hash_input)
    }
}
