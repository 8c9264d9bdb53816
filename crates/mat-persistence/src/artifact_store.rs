//! Store de artifacts sobre un directorio direccionado por contenido.
//!
//! Layout: `<root>/<fp[0..2]>/<fp>.json` con el `Vec<Artifact>` serializado.
//! La escritura es atómica con first-writer-wins real entre procesos: el
//! archivo se escribe completo en un temporal y se publica con `hard_link`,
//! que falla con `AlreadyExists` si otro escritor llegó primero. Ningún
//! lector puede observar un artifact a medio escribir.
//!
//! La evicción es explícita (`evict`); esta store nunca descarta sola.

use std::fs;
use std::path::{Path, PathBuf};

use mat_core::errors::StoreError;
use mat_core::model::Artifact;
use mat_core::store::{ArtifactStore, PutOutcome};

use crate::PersistenceError;

pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| PersistenceError::io(root.display().to_string(), e))?;
        Ok(Self { root })
    }

    fn entry_path(&self, fingerprint: &str) -> PathBuf {
        let shard = if fingerprint.len() >= 2 { &fingerprint[..2] } else { "xx" };
        self.root.join(shard).join(format!("{fingerprint}.json"))
    }

    fn tmp_path(&self, fingerprint: &str) -> PathBuf {
        self.root.join(format!(".tmp-{}-{}", std::process::id(), fingerprint))
    }
}

fn read_entry(path: &Path) -> Option<Vec<Artifact>> {
    match fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(outputs) => Some(outputs),
            Err(e) => {
                log::warn!("corrupt artifact entry {}: {e}", path.display());
                None
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            log::warn!("unreadable artifact entry {}: {e}", path.display());
            None
        }
    }
}

impl ArtifactStore for FsArtifactStore {
    fn get(&self, fingerprint: &str) -> Option<Vec<Artifact>> {
        read_entry(&self.entry_path(fingerprint))
    }

    fn put(&self, fingerprint: &str, outputs: Vec<Artifact>) -> Result<PutOutcome, StoreError> {
        let path = self.entry_path(fingerprint);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }

        let serialized = serde_json::to_string(&outputs).map_err(|e| StoreError::Serde(e.to_string()))?;
        let tmp = self.tmp_path(fingerprint);
        fs::write(&tmp, serialized).map_err(|e| StoreError::Io(e.to_string()))?;

        // hard_link publica el archivo completo o falla si ya existe
        let outcome = match fs::hard_link(&tmp, &path) {
            Ok(()) => PutOutcome::Stored,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                log::debug!("cache write conflict for {fingerprint}: first writer wins");
                PutOutcome::AlreadyPresent
            }
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                return Err(StoreError::Io(e.to_string()));
            }
        };
        let _ = fs::remove_file(&tmp);
        Ok(outcome)
    }

    fn evict(&self, fingerprint: &str) -> bool {
        fs::remove_file(self.entry_path(fingerprint)).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mat_core::model::{Artifact, ArtifactKind};
    use serde_json::json;

    fn temp_root(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("mat-store-{tag}-{}", uuid::Uuid::new_v4()))
    }

    fn artifact(v: i64) -> Artifact {
        let mut a = Artifact {
            kind: ArtifactKind::GenericJson,
            hash: String::new(),
            payload: json!({ "v": v }),
            metadata: None,
        };
        a.ensure_hashed();
        a
    }

    #[test]
    fn put_survives_a_new_store_instance_on_the_same_root() {
        let root = temp_root("reopen");
        {
            let store = FsArtifactStore::new(&root).unwrap();
            assert_eq!(store.put("abcdef", vec![artifact(1)]).unwrap(), PutOutcome::Stored);
        }
        let reopened = FsArtifactStore::new(&root).unwrap();
        let got = reopened.get("abcdef").unwrap();
        assert_eq!(got[0].payload, json!({ "v": 1 }));
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn duplicate_put_is_first_writer_wins() {
        let root = temp_root("dup");
        let store = FsArtifactStore::new(&root).unwrap();
        store.put("abcdef", vec![artifact(1)]).unwrap();
        assert_eq!(store.put("abcdef", vec![artifact(2)]).unwrap(), PutOutcome::AlreadyPresent);
        assert_eq!(store.get("abcdef").unwrap()[0].payload, json!({ "v": 1 }));
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn concurrent_puts_from_threads_store_exactly_once() {
        use std::sync::Arc;
        let root = temp_root("conc");
        let store = Arc::new(FsArtifactStore::new(&root).unwrap());
        let handles: Vec<_> = (0..8i64)
            .map(|i| {
                let s = Arc::clone(&store);
                std::thread::spawn(move || s.put("shared", vec![artifact(i)]).unwrap())
            })
            .collect();
        let stored = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|o| *o == PutOutcome::Stored)
            .count();
        assert_eq!(stored, 1);
        assert!(store.get("shared").is_some());
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn evict_is_explicit_and_idempotent() {
        let root = temp_root("evict");
        let store = FsArtifactStore::new(&root).unwrap();
        store.put("abcdef", vec![artifact(1)]).unwrap();
        assert!(store.evict("abcdef"));
        assert!(store.get("abcdef").is_none());
        assert!(!store.evict("abcdef"));
        let _ = std::fs::remove_dir_all(&root);
    }
}
