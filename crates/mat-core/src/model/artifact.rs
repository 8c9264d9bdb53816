//! Artifact neutral del pipeline.
//!
//! Un `Artifact` es la unidad de datos intercambiada entre tasks. Es neutral:
//! - `payload` es JSON genérico; el motor no interpreta su semántica.
//! - `hash` se calcula sobre el JSON canonicalizado (ver
//!   `hashing::to_canonical_json`) y es la identidad del valor: alimenta los
//!   fingerprints de los tasks consumidores.
//! - `metadata` anota información auxiliar que no entra al hash.
//! - Inmutable una vez producido: los consumidores sólo leen.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hashing::hash_value;

/// Tipos neutrales de artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// JSON genérico sin semántica
    GenericJson,
}

/// Artifact neutral producido/consumido por tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub hash: String,            // hash canonical del payload
    pub payload: Value,          // contenido neutro JSON
    pub metadata: Option<Value>, // información auxiliar (no entra al hash)
}

impl Artifact {
    /// Constructor interno; preferir crear artifacts a través de
    /// `ArtifactSpec::into_artifact`.
    pub(crate) fn new_unhashed(kind: ArtifactKind, payload: Value, metadata: Option<Value>) -> Self {
        Self { kind, hash: String::new(), payload, metadata }
    }

    /// Asigna el hash canónico del payload si aún no fue calculado.
    pub fn ensure_hashed(&mut self) -> &str {
        if self.hash.is_empty() {
            self.hash = hash_value(&self.payload);
        }
        &self.hash
    }
}
