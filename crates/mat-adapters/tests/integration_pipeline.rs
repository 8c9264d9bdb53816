//! Pipeline completo de materiales: estructura cruda -> conversión ->
//! input deck -> motor QC (stub) -> parser -> simetría -> reporte final.

use std::sync::Arc;

use mat_adapters::ports::{InversionAnalyzer, PlainOutputParser, StubQcEngine, XyzConverter};
use mat_adapters::tasks::{
    AnalyzeSymmetryTask, BuildReportTask, ConvertStructureTask, ParseQcOutputTask,
    PrepareQcInputTask, RunQcTask, SupplyStructureTask,
};
use mat_core::{
    ExternalInputs, ImmediateBackend, InMemoryArtifactStore, InMemoryEventStore,
    InMemoryRunRepository, PipelineRunner, RunConfig, RunStatus, TaskGraph, TaskStatus,
    ThreadPoolBackend,
};

const WATER_XYZ: &str = "3\ncharge=0 mult=1 water\nO 0.0 0.0 0.117\nH 0.0 0.757 -0.469\nH 0.0 -0.757 -0.469\n";

fn materials_graph() -> TaskGraph {
    let mut graph = TaskGraph::new();
    graph
        .add_task(Arc::new(SupplyStructureTask::new("xyz".to_string(), WATER_XYZ.to_string())))
        .expect("add supply");
    graph
        .add_task(Arc::new(ConvertStructureTask::new(Arc::new(XyzConverter))))
        .expect("add convert");
    graph.add_task(Arc::new(PrepareQcInputTask::new())).expect("add prepare");
    graph.add_task(Arc::new(RunQcTask::new(Arc::new(StubQcEngine)))).expect("add qc");
    graph
        .add_task(Arc::new(ParseQcOutputTask::new(Arc::new(PlainOutputParser))))
        .expect("add parse");
    graph
        .add_task(Arc::new(AnalyzeSymmetryTask::new(Arc::new(InversionAnalyzer))))
        .expect("add symmetry");
    graph.add_task(Arc::new(BuildReportTask::new())).expect("add report");

    graph.add_edge("supply_structure", "out", "convert_structure", "in").expect("edge");
    graph.add_edge("convert_structure", "out", "prepare_qc_input", "in").expect("edge");
    graph.add_edge("prepare_qc_input", "out", "run_qc", "in").expect("edge");
    graph.add_edge("run_qc", "out", "parse_qc_output", "in").expect("edge");
    graph.add_edge("convert_structure", "out", "analyze_symmetry", "in").expect("edge");
    graph.add_edge("convert_structure", "out", "build_report", "structure").expect("edge");
    graph.add_edge("parse_qc_output", "out", "build_report", "properties").expect("edge");
    graph.add_edge("analyze_symmetry", "out", "build_report", "symmetry").expect("edge");
    graph
}

fn runner() -> PipelineRunner<InMemoryEventStore, InMemoryRunRepository> {
    PipelineRunner::new(InMemoryEventStore::default(), InMemoryRunRepository::new())
}

#[test]
fn full_pipeline_produces_report_for_water() {
    let graph = materials_graph();
    let store = InMemoryArtifactStore::new();
    let backend = ImmediateBackend::new();
    let mut runner = runner();
    let report = runner
        .run(&graph, &ExternalInputs::new(), &RunConfig::default(), &store, &backend)
        .expect("pipeline run");

    assert_eq!(report.status, RunStatus::Succeeded);
    let sink = &report.sink_outputs["build_report"][0];
    assert_eq!(sink.payload["formula"], serde_json::json!("H2O"));
    assert!(sink.payload["properties"]["total_energy_ev"].as_f64().unwrap() < 0.0);
    // el agua no es centrosimétrica
    assert_eq!(sink.payload["symmetry"]["spacegroup_number"], serde_json::json!(1));
}

#[test]
fn rerun_against_same_store_is_all_cache_hits() {
    let graph = materials_graph();
    let store = InMemoryArtifactStore::new();
    let backend = ImmediateBackend::new();
    let mut runner = runner();
    let config = RunConfig::default();
    let externals = ExternalInputs::new();

    let first = runner.run(&graph, &externals, &config, &store, &backend).expect("first run");
    let second = runner.run(&graph, &externals, &config, &store, &backend).expect("second run");

    assert_eq!(first.run_fingerprint, second.run_fingerprint);
    for record in second.records.values() {
        assert_eq!(record.status, TaskStatus::Cached, "{} should be cached", record.task_id);
    }
    assert_eq!(
        first.sink_outputs["build_report"][0].hash,
        second.sink_outputs["build_report"][0].hash,
    );
}

#[test]
fn thread_pool_backend_matches_immediate_results() {
    let store_a = InMemoryArtifactStore::new();
    let store_b = InMemoryArtifactStore::new();
    let mut runner_a = runner();
    let mut runner_b = runner();
    let config = RunConfig { poll_interval: std::time::Duration::from_millis(1), ..RunConfig::default() };
    let externals = ExternalInputs::new();

    let immediate = runner_a
        .run(&materials_graph(), &externals, &config, &store_a, &ImmediateBackend::new())
        .expect("immediate run");
    let pooled = runner_b
        .run(
            &materials_graph(),
            &externals,
            &config,
            &store_b,
            &ThreadPoolBackend::new(4).expect("pool"),
        )
        .expect("pooled run");

    assert_eq!(immediate.status, RunStatus::Succeeded);
    assert_eq!(pooled.status, RunStatus::Succeeded);
    assert_eq!(
        immediate.sink_outputs["build_report"][0].hash,
        pooled.sink_outputs["build_report"][0].hash,
        "backends must not change results"
    );
}

#[test]
fn changing_supplied_structure_invalidates_the_whole_chain() {
    let store = InMemoryArtifactStore::new();
    let backend = ImmediateBackend::new();
    let mut runner = runner();
    let config = RunConfig::default();
    let externals = ExternalInputs::new();

    let first = runner
        .run(&materials_graph(), &externals, &config, &store, &backend)
        .expect("first run");

    // mismo cableado inicial, otra molécula suministrada por el source
    let mut modified = TaskGraph::new();
    modified
        .add_task(Arc::new(SupplyStructureTask::new(
            "xyz".to_string(),
            "1\ncharge=0 mult=1 helium\nHe 0.0 0.0 0.0\n".to_string(),
        )))
        .expect("add supply");
    modified
        .add_task(Arc::new(ConvertStructureTask::new(Arc::new(XyzConverter))))
        .expect("add convert");
    modified.add_edge("supply_structure", "out", "convert_structure", "in").expect("edge");

    let second = runner.run(&modified, &externals, &config, &store, &backend).expect("second run");

    assert_ne!(
        first.records["convert_structure"].fingerprint,
        second.records["convert_structure"].fingerprint,
        "a different upstream structure must force recomputation"
    );
    assert_eq!(second.records["convert_structure"].status, TaskStatus::Succeeded);
}
