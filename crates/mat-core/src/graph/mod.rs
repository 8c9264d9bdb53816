//! Grafo de dependencias entre tasks.

mod dag;
mod external;

pub use dag::{Edge, TaskGraph, TopoIter};
pub use external::ExternalInputs;
