pub mod acquire;
pub mod convert;
pub mod parse;
pub mod qchem;
pub mod report;
pub mod symmetry;

pub use acquire::SupplyStructureTask;
pub use convert::ConvertStructureTask;
pub use parse::ParseQcOutputTask;
pub use qchem::{PrepareQcInputTask, QcCommandTask, QcParams, RunQcTask};
pub use report::BuildReportTask;
pub use symmetry::AnalyzeSymmetryTask;
