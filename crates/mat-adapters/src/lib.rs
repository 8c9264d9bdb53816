//! mat-adapters: tasks que envuelven los colaboradores de química
//! (conversión de estructuras, motor QC, parser de salidas, análisis de
//! simetría) detrás de los slots tipados del core.
pub mod artifacts;
pub mod ports;
pub mod tasks;
