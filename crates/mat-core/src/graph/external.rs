use std::collections::HashMap;

use crate::model::{Artifact, ArtifactKind, ArtifactSpec};
use serde_json::Value;

/// Inputs externos: valores suministrados por el caller para slots de entrada
/// que ningún edge alimenta. Se hashean al ingresar, de modo que participan
/// del fingerprint igual que un artifact producido por un task upstream.
#[derive(Debug, Clone, Default)]
pub struct ExternalInputs {
    inner: HashMap<(String, String), Artifact>,
}

impl ExternalInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suministra un artifact para el slot `slot` del task `task_id`.
    pub fn supply(&mut self, task_id: &str, slot: &str, mut artifact: Artifact) -> &mut Self {
        artifact.ensure_hashed();
        self.inner.insert((task_id.to_string(), slot.to_string()), artifact);
        self
    }

    /// Variante tipada de `supply`.
    pub fn supply_typed<T: ArtifactSpec>(&mut self, task_id: &str, slot: &str, value: T) -> &mut Self {
        self.supply(task_id, slot, value.into_artifact())
    }

    /// Variante cruda: payload JSON sin esquema.
    pub fn supply_value(&mut self, task_id: &str, slot: &str, payload: Value) -> &mut Self {
        self.supply(task_id, slot, Artifact::new_unhashed(ArtifactKind::GenericJson, payload, None))
    }

    pub fn get(&self, task_id: &str, slot: &str) -> Option<&Artifact> {
        self.inner.get(&(task_id.to_string(), slot.to_string()))
    }

    pub fn contains(&self, task_id: &str, slot: &str) -> bool {
        self.get(task_id, slot).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(String, String), &Artifact)> {
        self.inner.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
