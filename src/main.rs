//! Driver de demostración del motor de pipelines de materiales.
//!
//! Corre tres escenarios de validación contra el motor real:
//! 1. Pipeline completo de una molécula de agua (backend in-process).
//! 2. Segunda corrida sobre la misma cache: 100 % hits.
//! 3. Fallo permanente con subgrafo independiente que completa igual.

use std::sync::Arc;

use mat_adapters::ports::{InversionAnalyzer, PlainOutputParser, StubQcEngine, XyzConverter};
use mat_adapters::tasks::{
    AnalyzeSymmetryTask, BuildReportTask, ConvertStructureTask, ParseQcOutputTask,
    PrepareQcInputTask, RunQcTask, SupplyStructureTask,
};
use mat_core::{
    ExternalInputs, InMemoryArtifactStore, InMemoryEventStore, InMemoryRunRepository,
    PipelineRunner, RunConfig, RunStatus, TaskGraph, TaskStatus, ThreadPoolBackend,
};

const WATER_XYZ: &str = "3\ncharge=0 mult=1 water\nO 0.0 0.0 0.117\nH 0.0 0.757 -0.469\nH 0.0 -0.757 -0.469\n";

fn materials_graph() -> Result<TaskGraph, mat_core::ValidationError> {
    let mut graph = TaskGraph::new();
    graph.add_task(Arc::new(SupplyStructureTask::new("xyz".to_string(), WATER_XYZ.to_string())))?;
    graph.add_task(Arc::new(ConvertStructureTask::new(Arc::new(XyzConverter))))?;
    graph.add_task(Arc::new(PrepareQcInputTask::new()))?;
    graph.add_task(Arc::new(RunQcTask::new(Arc::new(StubQcEngine))))?;
    graph.add_task(Arc::new(ParseQcOutputTask::new(Arc::new(PlainOutputParser))))?;
    graph.add_task(Arc::new(AnalyzeSymmetryTask::new(Arc::new(InversionAnalyzer))))?;
    graph.add_task(Arc::new(BuildReportTask::new()))?;

    graph.add_edge("supply_structure", "out", "convert_structure", "in")?;
    graph.add_edge("convert_structure", "out", "prepare_qc_input", "in")?;
    graph.add_edge("prepare_qc_input", "out", "run_qc", "in")?;
    graph.add_edge("run_qc", "out", "parse_qc_output", "in")?;
    graph.add_edge("convert_structure", "out", "analyze_symmetry", "in")?;
    graph.add_edge("convert_structure", "out", "build_report", "structure")?;
    graph.add_edge("parse_qc_output", "out", "build_report", "properties")?;
    graph.add_edge("analyze_symmetry", "out", "build_report", "symmetry")?;
    Ok(graph)
}

fn run_pipeline_demo() -> Result<(), Box<dyn std::error::Error>> {
    let graph = materials_graph()?;
    let store = InMemoryArtifactStore::new();
    let backend = ThreadPoolBackend::new(4)?;
    let mut runner = PipelineRunner::new(InMemoryEventStore::default(), InMemoryRunRepository::new());
    let config = RunConfig::default();
    let externals = ExternalInputs::new();

    let report = runner.run(&graph, &externals, &config, &store, &backend)?;
    assert!(report.is_success(), "demo pipeline should succeed");

    let sink = &report.sink_outputs["build_report"][0];
    println!("!Validación 1: pipeline completo OK");
    println!("  formula   : {}", sink.payload["formula"]);
    println!("  energy    : {} eV", sink.payload["properties"]["total_energy_ev"]);
    println!("  spacegroup: {}", sink.payload["symmetry"]["symbol"]);
    println!("  run fp    : {}", report.run_fingerprint);

    // Validación 2: misma cache, segunda corrida cacheada por completo
    let second = runner.run(&graph, &externals, &config, &store, &backend)?;
    let cached = second
        .records
        .values()
        .filter(|r| r.status == TaskStatus::Cached)
        .count();
    assert_eq!(cached, second.records.len(), "all tasks must be cache hits");
    assert_eq!(second.run_fingerprint, report.run_fingerprint);
    println!("!Validación 2: re-corrida con {cached}/{} cache hits", second.records.len());
    Ok(())
}

fn run_failure_demo() -> Result<(), Box<dyn std::error::Error>> {
    use mat_core::errors::TaskExecutionError;
    use mat_core::{typed_artifact, typed_task, TaskKind};

    typed_artifact!(Num { value: i64 });

    typed_task! {
        source Seed {
            id: "seed",
            output: Num,
            params: (),
            run(_self, _p) {
                Ok(Num { value: 1, schema_version: 1 })
            }
        }
    }
    typed_task! {
        task Fails {
            id: "fails",
            kind: TaskKind::Transform,
            input: Num,
            output: Num,
            params: (),
            run(_self, _inp, _p) {
                Err(TaskExecutionError::task("simulated engine crash"))
            }
        }
    }
    typed_task! {
        task Downstream {
            id: "downstream",
            kind: TaskKind::Sink,
            input: Num,
            output: Num,
            params: (),
            run(_self, inp, _p) {
                Ok(inp)
            }
        }
    }
    typed_task! {
        source Independent {
            id: "independent",
            output: Num,
            params: (),
            run(_self, _p) {
                Ok(Num { value: 42, schema_version: 1 })
            }
        }
    }

    let mut graph = TaskGraph::new();
    graph.add_task(Arc::new(Seed::new()))?;
    graph.add_task(Arc::new(Fails::new()))?;
    graph.add_task(Arc::new(Downstream::new()))?;
    graph.add_task(Arc::new(Independent::new()))?;
    graph.add_edge("seed", "out", "fails", "in")?;
    graph.add_edge("fails", "out", "downstream", "in")?;

    let store = InMemoryArtifactStore::new();
    let backend = ThreadPoolBackend::new(2)?;
    let mut runner = PipelineRunner::new(InMemoryEventStore::default(), InMemoryRunRepository::new());
    let report = runner.run(&graph, &ExternalInputs::new(), &RunConfig::default(), &store, &backend)?;

    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(report.records["independent"].status, TaskStatus::Succeeded);
    println!(
        "!Validación 3: fallo aislado OK (failed: {:?}, independiente completó)",
        report.failed
    );
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run_pipeline_demo() {
        eprintln!("pipeline demo failed: {e}");
        std::process::exit(1);
    }
    if let Err(e) = run_failure_demo() {
        eprintln!("failure demo failed: {e}");
        std::process::exit(1);
    }
}
