//! Constantes del motor core.
//!
//! `ENGINE_VERSION` participa en el cálculo de fingerprints: un cambio de
//! versión del motor invalida la cache de forma determinista aunque los
//! grafos y los datos no cambien. Mantener estable mientras no haya cambios
//! incompatibles en el esquema de fingerprint.

/// Versión lógica del motor de pipelines.
pub const ENGINE_VERSION: &str = "M1.0";
