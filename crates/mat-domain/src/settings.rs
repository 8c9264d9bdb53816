//! Modelo del input deck de química cuántica.
//!
//! Un deck se compone de bloques nombrados (`$rem`, `$molecule`, ...) con
//! pares clave/valor ordenados. El orden estable (BTreeMap) importa: el deck
//! renderizado entra al hashing de artifacts y debe ser determinista.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::Structure;

/// Tipo de cálculo soportado por los tasks de preparación de input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobType {
    SinglePoint,
    Optimization,
    FrontierOrbitals,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::SinglePoint => "sp",
            JobType::Optimization => "opt",
            JobType::FrontierOrbitals => "sp",
        }
    }
}

/// Bloques de configuración del deck, con defaults por tipo de job al estilo
/// de un motor QC real (exchange/basis/jobtype si el usuario no los fijó).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QcSettings {
    blocks: BTreeMap<String, BTreeMap<String, Value>>,
}

impl QcSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, block: &str, key: &str, value: impl Into<Value>) -> &mut Self {
        self.blocks
            .entry(block.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
        self
    }

    pub fn contains(&self, block: &str, key: &str) -> bool {
        self.blocks.get(block).map(|b| b.contains_key(key)).unwrap_or(false)
    }

    pub fn get(&self, block: &str, key: &str) -> Option<&Value> {
        self.blocks.get(block).and_then(|b| b.get(key))
    }

    /// Completa los defaults del tipo de job sin pisar lo ya configurado.
    pub fn apply_defaults(&mut self, job: JobType) {
        if !self.contains("rem", "exchange") && !self.contains("rem", "method") {
            self.set("rem", "exchange", "HF");
        }
        if !self.contains("rem", "basis") {
            self.set("rem", "basis", "3-21G");
        }
        if !self.contains("rem", "jobtype") {
            self.set("rem", "jobtype", job.as_str());
        }
    }

    /// Renderiza el deck completo: bloque de molécula + bloques de settings.
    pub fn render(&self, structure: &Structure) -> String {
        let mut out = String::new();
        out.push_str("$molecule\n");
        out.push_str(&format!("  {} {}\n", structure.charge(), structure.multiplicity()));
        for (el, p) in structure.species().iter().zip(structure.coords()) {
            out.push_str(&format!("  {}  {}  {}  {}\n", el, p[0], p[1], p[2]));
        }
        out.push_str("$end\n");
        for (name, params) in &self.blocks {
            out.push('\n');
            out.push_str(&format!("${name}\n"));
            let width = params.keys().map(|k| k.len()).max().unwrap_or(0);
            for (k, v) in params {
                let rendered = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                out.push_str(&format!("  {k}{} {rendered}\n", " ".repeat(width - k.len() + 1)));
            }
            out.push_str("$end\n");
        }
        out
    }
}
