//! Backends de ejecución externa probados sin cluster: el backend de
//! procesos corre comandos reales y el de cola se ejercita con una cola
//! falsa hecha de comandos `sh`.

#![cfg(unix)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mat_core::{typed_artifact, typed_task};
use mat_core::{
    CommandSpec, ExecutionContext, ExternalInputs, InMemoryArtifactStore, InMemoryEventStore,
    InMemoryRunRepository, PipelineRunner, ProcessBackend, QueueBackend, QueueConfig, RunConfig,
    RunStatus, SlotSpec, TaskDefinition, TaskGraph, TaskKind, TaskRunResult, TaskStatus,
};

typed_artifact!(NumSpec { value: i64 });

/// Task externo: imprime su payload JSON por stdout vía `sh`.
#[derive(Debug)]
struct EchoTask {
    result_file: Option<PathBuf>,
}

impl TaskDefinition for EchoTask {
    fn id(&self) -> &str {
        "echo"
    }
    fn kind(&self) -> TaskKind {
        TaskKind::Source
    }
    fn input_slots(&self) -> Vec<SlotSpec> {
        vec![]
    }
    fn output_slots(&self) -> Vec<SlotSpec> {
        vec![SlotSpec::new("out", "NumSpec")]
    }
    fn base_params(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
    fn run(&self, _ctx: &ExecutionContext) -> TaskRunResult {
        TaskRunResult::Failure {
            error: mat_core::TaskExecutionError::NotRunnable { backend: "in-process".to_string() },
        }
    }
    fn command(&self, _ctx: &ExecutionContext) -> Option<CommandSpec> {
        let mut spec = CommandSpec::new("sh")
            .arg("-c")
            .arg(r#"echo '{"value": 7, "schema_version": 1}'"#);
        if let Some(path) = &self.result_file {
            spec = spec.result_file(path.clone());
        }
        Some(spec)
    }
}

typed_task! {
    source InProcessOnly {
        id: "in_process_only",
        output: NumSpec,
        params: (),
        run(_self, _p) {
            Ok(NumSpec { value: 1, schema_version: 1 })
        }
    }
}

fn fast_config() -> RunConfig {
    RunConfig { poll_interval: Duration::from_millis(5), ..RunConfig::default() }
}

fn runner() -> PipelineRunner<InMemoryEventStore, InMemoryRunRepository> {
    PipelineRunner::new(InMemoryEventStore::default(), InMemoryRunRepository::new())
}

#[test]
fn process_backend_runs_external_command_and_captures_stdout() {
    let mut graph = TaskGraph::new();
    graph.add_task(Arc::new(EchoTask { result_file: None })).unwrap();

    let store = InMemoryArtifactStore::new();
    let backend = ProcessBackend::new();
    let mut runner = runner();
    let report = runner
        .run(&graph, &ExternalInputs::new(), &fast_config(), &store, &backend)
        .unwrap();

    assert_eq!(report.status, RunStatus::Succeeded);
    assert_eq!(report.sink_outputs["echo"][0].payload["value"], serde_json::json!(7));
}

#[test]
fn process_backend_rejects_tasks_without_command() {
    let mut graph = TaskGraph::new();
    graph.add_task(Arc::new(InProcessOnly::new())).unwrap();

    let store = InMemoryArtifactStore::new();
    let backend = ProcessBackend::new();
    let mut runner = runner();
    let report = runner
        .run(&graph, &ExternalInputs::new(), &fast_config(), &store, &backend)
        .unwrap();

    // NotRunnable es permanente: sin retry, task Failed
    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(report.records["in_process_only"].status, TaskStatus::Failed);
}

#[test]
fn queue_backend_round_trips_through_a_fake_queue() {
    let result_file =
        std::env::temp_dir().join(format!("mat-queue-result-{}.json", uuid::Uuid::new_v4()));
    // el "job de cluster" ya dejó su resultado en el storage compartido
    std::fs::write(&result_file, r#"{"value": 11, "schema_version": 1}"#).unwrap();

    let config = QueueConfig {
        submit_cmd: vec!["sh".into(), "-c".into(), "echo job-42".into()],
        status_cmd: vec!["sh".into(), "-c".into(), "echo COMPLETED".into()],
        cancel_cmd: vec!["sh".into(), "-c".into(), "true".into()],
    };

    let mut graph = TaskGraph::new();
    graph
        .add_task(Arc::new(EchoTask { result_file: Some(result_file.clone()) }))
        .unwrap();

    let store = InMemoryArtifactStore::new();
    let backend = QueueBackend::new(config);
    let mut runner = runner();
    let report = runner
        .run(&graph, &ExternalInputs::new(), &fast_config(), &store, &backend)
        .unwrap();

    assert_eq!(report.status, RunStatus::Succeeded);
    assert_eq!(report.sink_outputs["echo"][0].payload["value"], serde_json::json!(11));

    let _ = std::fs::remove_file(&result_file);
}
