pub mod types;
pub use types::{ExecutionRecord, InMemoryRunRepository, RunInstance, RunRepository};
