//! Artifact Store: cache direccionada por contenido.
//!
//! Mapea el fingerprint de una invocación de task al conjunto ordenado de
//! outputs que produjo. Contrato:
//! - `get` nunca bloquea indefinidamente: responde hit o miss de inmediato.
//! - `put` es atómico con semántica first-writer-wins: un segundo `put` del
//!   mismo fingerprint es un no-op benigno (se loguea, no se propaga).
//! - La evicción es explícita: `evict` manual o cap de capacidad LRU
//!   configurado al construir la store. Nunca evicción silenciosa.

use dashmap::DashMap;
use std::sync::Mutex;

use crate::errors::StoreError;
use crate::model::Artifact;

/// Resultado de un `put`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// Primera escritura para este fingerprint.
    Stored,
    /// Ya había un valor: first-writer-wins, la escritura se descartó.
    AlreadyPresent,
}

/// Cache fingerprint -> outputs. Leída por muchos, escrita una vez por
/// fingerprint.
pub trait ArtifactStore: Send + Sync {
    fn get(&self, fingerprint: &str) -> Option<Vec<Artifact>>;
    fn put(&self, fingerprint: &str, outputs: Vec<Artifact>) -> Result<PutOutcome, StoreError>;
    fn evict(&self, fingerprint: &str) -> bool;
}

/// Store en memoria sobre `DashMap`, con cap LRU opcional.
pub struct InMemoryArtifactStore {
    inner: DashMap<String, Vec<Artifact>>,
    recency: Mutex<Vec<String>>, // frente = menos usado
    capacity: Option<usize>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self { inner: DashMap::new(), recency: Mutex::new(Vec::new()), capacity: None }
    }

    /// Cap de capacidad con descarte LRU al insertarse por encima del límite.
    pub fn with_capacity_cap(capacity: usize) -> Self {
        Self {
            inner: DashMap::new(),
            recency: Mutex::new(Vec::new()),
            capacity: Some(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn touch(&self, fingerprint: &str) {
        if let Ok(mut recency) = self.recency.lock() {
            if let Some(pos) = recency.iter().position(|f| f == fingerprint) {
                let fp = recency.remove(pos);
                recency.push(fp);
            }
        }
    }
}

impl Default for InMemoryArtifactStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn get(&self, fingerprint: &str) -> Option<Vec<Artifact>> {
        let hit = self.inner.get(fingerprint).map(|v| v.clone());
        if hit.is_some() {
            self.touch(fingerprint);
        }
        hit
    }

    fn put(&self, fingerprint: &str, outputs: Vec<Artifact>) -> Result<PutOutcome, StoreError> {
        use dashmap::mapref::entry::Entry;
        let outcome = match self.inner.entry(fingerprint.to_string()) {
            Entry::Occupied(_) => {
                log::debug!("cache write conflict for {fingerprint}: first writer wins");
                PutOutcome::AlreadyPresent
            }
            Entry::Vacant(v) => {
                v.insert(outputs);
                PutOutcome::Stored
            }
        };
        if outcome == PutOutcome::Stored {
            if let Ok(mut recency) = self.recency.lock() {
                recency.push(fingerprint.to_string());
                if let Some(cap) = self.capacity {
                    while recency.len() > cap {
                        let lru = recency.remove(0);
                        self.inner.remove(&lru);
                        log::debug!("capacity cap reached, discarded LRU entry {lru}");
                    }
                }
            }
        }
        Ok(outcome)
    }

    fn evict(&self, fingerprint: &str) -> bool {
        if let Ok(mut recency) = self.recency.lock() {
            if let Some(pos) = recency.iter().position(|f| f == fingerprint) {
                recency.remove(pos);
            }
        }
        self.inner.remove(fingerprint).is_some()
    }
}
