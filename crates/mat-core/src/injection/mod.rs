//! Inyección determinista de parámetros.
//!
//! Los overrides externos (config de corrida, credenciales de herramienta,
//! paths) se fusionan sobre los params base de cada task ANTES de calcular el
//! fingerprint: un override distinto produce una clave de cache distinta.

mod composite;
mod merge;
mod param_injector;

pub use composite::CompositeInjector;
pub use merge::merge_json;
pub use param_injector::ParamInjector;
