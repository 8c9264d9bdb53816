//! Comportamiento dinámico del scheduler: retries, propagación de fallos,
//! invalidación selectiva de cache y deadline global.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mat_core::{typed_artifact, typed_task};
use mat_core::EventStore;
use mat_core::{
    DeadlinePolicy, ExternalInputs, ImmediateBackend, InMemoryArtifactStore, InMemoryEventStore,
    InMemoryRunRepository, PipelineRunner, RetryPolicy, RunConfig, RunEventKind, RunStatus,
    TaskExecutionError, TaskGraph, TaskKind, TaskStatus, ThreadPoolBackend,
};

typed_artifact!(NumSpec { value: i64 });

typed_task! {
    source Fixed {
        id: "fixed",
        output: NumSpec,
        params: (),
        fields { seed: i64 }
        , run(_self, _p) {
            Ok(NumSpec { value: _self.seed, schema_version: 1 })
        }
    }
}

typed_task! {
    task AddOne {
        id: "add_one",
        kind: TaskKind::Transform,
        input: NumSpec,
        output: NumSpec,
        params: (),
        run(_self, inp, _p) {
            Ok(NumSpec { value: inp.value + 1, schema_version: 1 })
        }
    }
}

// Falla con error de backend (transitorio) las primeras `fail_times`
// ejecuciones, después devuelve el input sin cambios.
typed_task! {
    task Flaky {
        id: "flaky",
        kind: TaskKind::Transform,
        input: NumSpec,
        output: NumSpec,
        params: (),
        fields { fail_times: u32, calls: Arc<AtomicU32> }
        , run(_self, inp, _p) {
            let call = _self.calls.fetch_add(1, Ordering::SeqCst);
            if call < _self.fail_times {
                Err(TaskExecutionError::backend("synthetic queue error"))
            } else {
                Ok(inp)
            }
        }
    }
}

// Fallo permanente incondicional.
typed_task! {
    task Broken {
        id: "broken",
        kind: TaskKind::Transform,
        input: NumSpec,
        output: NumSpec,
        params: (),
        run(_self, _inp, _p) {
            Err(TaskExecutionError::task("unparseable tool output"))
        }
    }
}

typed_task! {
    source Slow {
        id: "slow",
        output: NumSpec,
        params: (),
        run(_self, _p) {
            std::thread::sleep(Duration::from_millis(200));
            Ok(NumSpec { value: 0, schema_version: 1 })
        }
    }
}

fn fast_retry_config(bound: u32) -> RunConfig {
    RunConfig {
        retry_bound: bound,
        retry: RetryPolicy {
            base_delay: Duration::from_millis(1),
            multiplier: 2.0,
            max_delay: Duration::from_millis(10),
        },
        poll_interval: Duration::from_millis(1),
        ..RunConfig::default()
    }
}

fn runner() -> PipelineRunner<InMemoryEventStore, InMemoryRunRepository> {
    PipelineRunner::new(InMemoryEventStore::default(), InMemoryRunRepository::new())
}

#[test]
fn transient_failure_retries_until_success() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut graph = TaskGraph::new();
    graph.add_task(Arc::new(Fixed::new(10))).unwrap();
    graph.add_task(Arc::new(Flaky::new(1, Arc::clone(&calls)))).unwrap();
    graph.add_edge("fixed", "out", "flaky", "in").unwrap();

    let store = InMemoryArtifactStore::new();
    let backend = ImmediateBackend::new();
    let mut runner = runner();
    let report = runner
        .run(&graph, &ExternalInputs::new(), &fast_retry_config(2), &store, &backend)
        .unwrap();

    assert_eq!(report.status, RunStatus::Succeeded);
    assert_eq!(calls.load(Ordering::SeqCst), 2, "one failure + one successful retry");
    let events = runner.event_store().list(report.run_id);
    assert_eq!(
        events.iter().filter(|e| matches!(e.kind, RunEventKind::RetryScheduled { .. })).count(),
        1
    );
    assert_eq!(report.records["flaky"].attempts, 2);
}

#[test]
fn retry_bound_limits_attempts_then_marks_failed() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut graph = TaskGraph::new();
    graph.add_task(Arc::new(Fixed::new(10))).unwrap();
    graph.add_task(Arc::new(Flaky::new(u32::MAX, Arc::clone(&calls)))).unwrap();
    graph.add_edge("fixed", "out", "flaky", "in").unwrap();

    let bound = 3;
    let store = InMemoryArtifactStore::new();
    let backend = ImmediateBackend::new();
    let mut runner = runner();
    let report = runner
        .run(&graph, &ExternalInputs::new(), &fast_retry_config(bound), &store, &backend)
        .unwrap();

    assert_eq!(report.status, RunStatus::Failed);
    // intento inicial + como máximo `bound` reintentos
    assert_eq!(calls.load(Ordering::SeqCst), 1 + bound);
    assert_eq!(report.records["flaky"].status, TaskStatus::Failed);
    assert_eq!(report.failed, vec!["flaky".to_string()]);
}

#[test]
fn permanent_failure_propagates_to_dependents_but_spares_independents() {
    // a(broken) -> b -> c, d independiente
    let mut graph = TaskGraph::new();
    graph.add_task(Arc::new(Fixed::new(1))).unwrap();
    graph.add_task(Arc::new(Broken::new())).unwrap();
    graph.add_task(Arc::new(AddOne::new())).unwrap();
    graph.add_task(Arc::new(Fixed2::new())).unwrap();
    graph.add_edge("fixed", "out", "broken", "in").unwrap();
    graph.add_edge("broken", "out", "add_one", "in").unwrap();

    let store = InMemoryArtifactStore::new();
    let backend = ImmediateBackend::new();
    let mut runner = runner();
    let report = runner
        .run(&graph, &ExternalInputs::new(), &RunConfig::default(), &store, &backend)
        .unwrap();

    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(report.records["broken"].status, TaskStatus::Failed);
    assert_eq!(report.records["add_one"].status, TaskStatus::Failed);
    assert_eq!(report.records["iso"].status, TaskStatus::Succeeded, "independent subgraph must complete");
    assert!(report.failed.contains(&"broken".to_string()));
    assert!(report.failed.contains(&"add_one".to_string()));
    assert!(!report.failed.contains(&"iso".to_string()));

    let events = runner.event_store().list(report.run_id);
    assert!(events.iter().any(
        |e| matches!(&e.kind, RunEventKind::TaskSkipped { task_id, ancestor } if task_id == "add_one" && ancestor == "broken")
    ));
}

typed_task! {
    source Fixed2 {
        id: "iso",
        output: NumSpec,
        params: (),
        run(_self, _p) {
            Ok(NumSpec { value: 99, schema_version: 1 })
        }
    }
}

#[test]
fn changing_one_external_input_invalidates_only_its_cone() {
    // ext -> add_one (cono afectado); iso (no relacionado)
    let mut graph = TaskGraph::new();
    graph.add_task(Arc::new(AddOne::new())).unwrap();
    graph.add_task(Arc::new(Fixed2::new())).unwrap();

    let store = InMemoryArtifactStore::new();
    let backend = ImmediateBackend::new();
    let mut runner = runner();
    let config = RunConfig::default();

    let mut externals = ExternalInputs::new();
    externals.supply_typed("add_one", "in", NumSpec { value: 1, schema_version: 1 });
    let first = runner.run(&graph, &externals, &config, &store, &backend).unwrap();

    let mut externals2 = ExternalInputs::new();
    externals2.supply_typed("add_one", "in", NumSpec { value: 2, schema_version: 1 });
    let second = runner.run(&graph, &externals2, &config, &store, &backend).unwrap();

    // el task alimentado por el input cambiado se recalcula...
    assert_eq!(second.records["add_one"].status, TaskStatus::Succeeded);
    assert_ne!(first.records["add_one"].fingerprint, second.records["add_one"].fingerprint);
    // ...y el subgrafo sin relación conserva fingerprint y cache
    assert_eq!(second.records["iso"].status, TaskStatus::Cached);
    assert_eq!(first.records["iso"].fingerprint, second.records["iso"].fingerprint);
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ScaleParams {
    factor: i64,
}

impl Default for ScaleParams {
    fn default() -> Self {
        Self { factor: 1 }
    }
}

typed_task! {
    task Scaled {
        id: "scaled",
        kind: TaskKind::Sink,
        input: NumSpec,
        output: NumSpec,
        params: ScaleParams,
        run(_self, inp, p) {
            Ok(NumSpec { value: inp.value * p.factor, schema_version: 1 })
        }
    }
}

#[test]
fn injected_param_overrides_reach_the_task_and_its_fingerprint() {
    use mat_core::{ExecutionContext, ParamInjector};
    use serde_json::Value;

    #[derive(Debug)]
    struct FactorOverride;
    impl ParamInjector for FactorOverride {
        fn inject(&self, base: &Value, _ctx: &ExecutionContext) -> Value {
            // sólo toca params que declaran `factor`
            if base.get("factor").is_some() {
                serde_json::json!({ "factor": 3 })
            } else {
                serde_json::json!({})
            }
        }
    }

    fn scaled_graph() -> TaskGraph {
        let mut g = TaskGraph::new();
        g.add_task(Arc::new(Fixed::new(10))).unwrap();
        g.add_task(Arc::new(Scaled::new())).unwrap();
        g.add_edge("fixed", "out", "scaled", "in").unwrap();
        g
    }

    let store = InMemoryArtifactStore::new();
    let backend = ImmediateBackend::new();
    let config = RunConfig::default();
    let externals = ExternalInputs::new();

    let mut plain = runner();
    let base = plain.run(&scaled_graph(), &externals, &config, &store, &backend).unwrap();
    assert_eq!(base.sink_outputs["scaled"][0].payload["value"], serde_json::json!(10));

    let mut overridden = runner();
    overridden.add_injector(Box::new(FactorOverride));
    let report = overridden.run(&scaled_graph(), &externals, &config, &store, &backend).unwrap();

    assert_eq!(report.sink_outputs["scaled"][0].payload["value"], serde_json::json!(30));
    // el override entra al fingerprint: no puede reusar la entrada anterior
    assert_ne!(base.records["scaled"].fingerprint, report.records["scaled"].fingerprint);
    assert_eq!(report.records["scaled"].status, TaskStatus::Succeeded);
}

#[test]
fn deadline_reports_partial_with_never_attempted_tasks() {
    let mut graph = TaskGraph::new();
    graph.add_task(Arc::new(Slow::new())).unwrap();
    graph.add_task(Arc::new(AddOne::new())).unwrap();
    graph.add_edge("slow", "out", "add_one", "in").unwrap();

    let store = InMemoryArtifactStore::new();
    let backend = ThreadPoolBackend::new(2).unwrap();
    let mut runner = runner();
    let config = RunConfig {
        poll_interval: Duration::from_millis(5),
        ..RunConfig::default()
    }
    .with_deadline(Duration::from_millis(40), DeadlinePolicy::Drain);

    let report = runner
        .run(&graph, &ExternalInputs::new(), &config, &store, &backend)
        .unwrap();

    assert_eq!(report.status, RunStatus::Partial);
    // el source drenó hasta terminar, el dependiente nunca se intentó
    assert_eq!(report.records["slow"].status, TaskStatus::Succeeded);
    assert_eq!(report.never_attempted, vec!["add_one".to_string()]);
}

#[test]
fn deadline_cancel_policy_marks_outstanding_work_failed() {
    let mut graph = TaskGraph::new();
    graph.add_task(Arc::new(Slow::new())).unwrap();
    graph.add_task(Arc::new(AddOne::new())).unwrap();
    graph.add_edge("slow", "out", "add_one", "in").unwrap();

    let store = InMemoryArtifactStore::new();
    let backend = ThreadPoolBackend::new(2).unwrap();
    let mut runner = runner();
    let config = RunConfig {
        poll_interval: Duration::from_millis(5),
        ..RunConfig::default()
    }
    .with_deadline(Duration::from_millis(40), DeadlinePolicy::Cancel);

    let report = runner
        .run(&graph, &ExternalInputs::new(), &config, &store, &backend)
        .unwrap();

    assert_eq!(report.status, RunStatus::Partial);
    assert_eq!(report.records["slow"].status, TaskStatus::Failed);
    assert_eq!(report.records["slow"].failure.as_deref(), Some("cancelled"));
    // el dependiente cae por propagación del ancestro cancelado
    assert_eq!(report.records["add_one"].status, TaskStatus::Failed);
}

#[test]
fn diamond_graph_runs_on_thread_pool() {
    // fixed -> (left, right) -> join por dos slots
    use mat_core::{ExecutionContext, SlotSpec, TaskDefinition, TaskRunResult};

    typed_task! {
        task Left {
            id: "left",
            kind: TaskKind::Transform,
            input: NumSpec,
            output: NumSpec,
            params: (),
            run(_self, inp, _p) {
                Ok(NumSpec { value: inp.value * 2, schema_version: 1 })
            }
        }
    }
    typed_task! {
        task Right {
            id: "right",
            kind: TaskKind::Transform,
            input: NumSpec,
            output: NumSpec,
            params: (),
            run(_self, inp, _p) {
                Ok(NumSpec { value: inp.value * 3, schema_version: 1 })
            }
        }
    }

    // fan-in de dos slots: implementa TaskDefinition a mano
    #[derive(Debug)]
    struct Join;
    impl TaskDefinition for Join {
        fn id(&self) -> &str {
            "join"
        }
        fn kind(&self) -> TaskKind {
            TaskKind::Sink
        }
        fn input_slots(&self) -> Vec<SlotSpec> {
            vec![SlotSpec::new("left", "NumSpec"), SlotSpec::new("right", "NumSpec")]
        }
        fn output_slots(&self) -> Vec<SlotSpec> {
            vec![SlotSpec::new("out", "NumSpec")]
        }
        fn base_params(&self) -> serde_json::Value {
            serde_json::Value::Null
        }
        fn run(&self, ctx: &ExecutionContext) -> TaskRunResult {
            let l = match ctx.input_as::<NumSpec>(0) {
                Ok(v) => v,
                Err(e) => {
                    return TaskRunResult::Failure {
                        error: TaskExecutionError::Decode { message: e.to_string() },
                    }
                }
            };
            let r = match ctx.input_as::<NumSpec>(1) {
                Ok(v) => v,
                Err(e) => {
                    return TaskRunResult::Failure {
                        error: TaskExecutionError::Decode { message: e.to_string() },
                    }
                }
            };
            use mat_core::ArtifactSpec;
            TaskRunResult::Success {
                outputs: vec![NumSpec { value: l.value + r.value, schema_version: 1 }.into_artifact()],
            }
        }
    }

    let mut graph = TaskGraph::new();
    graph.add_task(Arc::new(Fixed::new(5))).unwrap();
    graph.add_task(Arc::new(Left::new())).unwrap();
    graph.add_task(Arc::new(Right::new())).unwrap();
    graph.add_task(Arc::new(Join)).unwrap();
    graph.add_edge("fixed", "out", "left", "in").unwrap();
    graph.add_edge("fixed", "out", "right", "in").unwrap();
    graph.add_edge("left", "out", "join", "left").unwrap();
    graph.add_edge("right", "out", "join", "right").unwrap();

    let store = InMemoryArtifactStore::new();
    let backend = ThreadPoolBackend::new(4).unwrap();
    let mut runner = runner();
    let config = RunConfig { poll_interval: Duration::from_millis(1), ..RunConfig::default() };
    let report = runner
        .run(&graph, &ExternalInputs::new(), &config, &store, &backend)
        .unwrap();

    assert_eq!(report.status, RunStatus::Succeeded);
    // 5*2 + 5*3
    assert_eq!(report.sink_outputs["join"][0].payload["value"], serde_json::json!(25));
}
