//! Run-log durable: eventos append-only en JSON lines, un archivo por run.
//!
//! El log es la serialización de los Execution Records: el `RunRepository`
//! del core los reconstruye por replay para inspección post-hoc, incluso en
//! otro proceso.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use mat_core::errors::CoreEngineError;
use mat_core::event::{EventStore, RunEvent, RunEventKind};

use crate::PersistenceError;

pub struct FsEventStore {
    root: PathBuf,
    next_seq: HashMap<Uuid, u64>,
}

impl FsEventStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| PersistenceError::io(root.display().to_string(), e))?;
        Ok(Self { root, next_seq: HashMap::new() })
    }

    fn log_path(&self, run_id: Uuid) -> PathBuf {
        self.root.join(format!("{run_id}.jsonl"))
    }

    fn load_events(path: &Path) -> Vec<RunEvent> {
        let Ok(raw) = fs::read_to_string(path) else {
            return Vec::new();
        };
        let mut events: Vec<RunEvent> = raw
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(ev) => Some(ev),
                Err(e) => {
                    log::warn!("skipping corrupt run-log line in {}: {e}", path.display());
                    None
                }
            })
            .collect();
        events.sort_by_key(|e: &RunEvent| e.seq);
        events
    }

    /// Cuántos eventos ya tiene el log (para continuar la secuencia al
    /// reabrir un run existente).
    fn hydrate_seq(&mut self, run_id: Uuid) -> u64 {
        if let Some(seq) = self.next_seq.get(&run_id) {
            return *seq;
        }
        let count = Self::load_events(&self.log_path(run_id)).len() as u64;
        self.next_seq.insert(run_id, count);
        count
    }
}

impl EventStore for FsEventStore {
    fn append_kind(&mut self, run_id: Uuid, kind: RunEventKind) -> Result<RunEvent, CoreEngineError> {
        let seq = self.hydrate_seq(run_id);
        let ev = RunEvent { seq, run_id, kind, ts: Utc::now() };

        let path = self.log_path(run_id);
        let line = serde_json::to_string(&ev).map_err(|e| CoreEngineError::EventStore(e.to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| CoreEngineError::EventStore(format!("{}: {e}", path.display())))?;
        writeln!(file, "{line}").map_err(|e| CoreEngineError::EventStore(e.to_string()))?;

        self.next_seq.insert(run_id, seq + 1);
        Ok(ev)
    }

    fn list(&self, run_id: Uuid) -> Vec<RunEvent> {
        Self::load_events(&self.log_path(run_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mat_core::runner::RunStatus;

    fn temp_root(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("mat-runlog-{tag}-{}", Uuid::new_v4()))
    }

    #[test]
    fn events_roundtrip_through_the_log_file() {
        let root = temp_root("roundtrip");
        let run_id = Uuid::new_v4();
        {
            let mut store = FsEventStore::new(&root).unwrap();
            store
                .append_kind(run_id, RunEventKind::RunInitialized { graph_hash: "h".into(), task_count: 2 })
                .unwrap();
            store
                .append_kind(
                    run_id,
                    RunEventKind::RunCompleted { status: RunStatus::Succeeded, run_fingerprint: "fp".into() },
                )
                .unwrap();
        }
        // otro proceso lógico: instancia nueva sobre el mismo root
        let store = FsEventStore::new(&root).unwrap();
        let events = store.list(run_id);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].seq, 0);
        assert!(matches!(events[0].kind, RunEventKind::RunInitialized { .. }));
        assert!(matches!(events[1].kind, RunEventKind::RunCompleted { .. }));
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn reopened_store_continues_the_sequence() {
        let root = temp_root("seq");
        let run_id = Uuid::new_v4();
        {
            let mut store = FsEventStore::new(&root).unwrap();
            store
                .append_kind(run_id, RunEventKind::RunInitialized { graph_hash: "h".into(), task_count: 1 })
                .unwrap();
        }
        let mut store = FsEventStore::new(&root).unwrap();
        let ev = store
            .append_kind(
                run_id,
                RunEventKind::TaskStarted { task_id: "t".into(), fingerprint: "f".into(), attempt: 1 },
            )
            .unwrap();
        assert_eq!(ev.seq, 1);
        let _ = std::fs::remove_dir_all(&root);
    }
}
