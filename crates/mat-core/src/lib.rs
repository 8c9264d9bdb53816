//! mat-core: motor determinista de pipelines sobre grafos de tasks
pub mod backend;
pub mod config;
pub mod constants;
pub mod errors;
pub mod event;
pub mod graph;
pub mod hashing;
pub mod injection;
pub mod model;
pub mod repo;
pub mod runner;
pub mod scheduler;
pub mod store;
pub mod task;

pub use backend::{
    BackendHandle, BackendStatus, CommandSpec, ExecutorBackend, ImmediateBackend, ProcessBackend,
    QueueBackend, QueueConfig, ThreadPoolBackend,
};
pub use config::{DeadlinePolicy, RunConfig};
pub use errors::{CoreEngineError, FailureKind, StoreError, TaskExecutionError, ValidationError};
pub use event::{EventStore, InMemoryEventStore, RunEvent, RunEventKind};
pub use graph::{Edge, ExternalInputs, TaskGraph};
pub use injection::{CompositeInjector, ParamInjector};
pub use model::{Artifact, ArtifactKind, ArtifactSpec, ExecutionContext};
pub use repo::{ExecutionRecord, InMemoryRunRepository, RunInstance, RunRepository};
pub use runner::{PipelineRunner, RunReport, RunStatus};
pub use scheduler::RetryPolicy;
pub use store::{ArtifactStore, InMemoryArtifactStore, PutOutcome};
pub use task::{SlotSpec, TaskDefinition, TaskKind, TaskRunResult, TaskStatus, TypedTask};
