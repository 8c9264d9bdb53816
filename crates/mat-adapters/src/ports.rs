//! Puertos hacia los colaboradores externos de química.
//!
//! El core orquesta; la química es caja negra detrás de estos traits. Las
//! implementaciones built-in son deterministas y autocontenidas: cubren demos
//! y tests sin herramientas instaladas. Un despliegue real sustituye el
//! puerto por el binding a su toolkit (openbabel, cclib, spglib, ...).

use std::fmt::Debug;

use mat_core::hashing::hash_str;
use mat_domain::{DomainError, PropertySet, Structure, SymmetryDescriptor};

/// Conversión de descripciones crudas a `Structure` normalizada.
pub trait StructureConverter: Debug + Send + Sync {
    fn convert(&self, format: &str, content: &str) -> Result<Structure, DomainError>;
}

/// Motor de química cuántica: deck de entrada -> salida cruda.
pub trait QcEngine: Debug + Send + Sync {
    fn execute(&self, deck: &str) -> Result<String, DomainError>;
}

/// Parser de salidas crudas del motor QC.
pub trait QcOutputParser: Debug + Send + Sync {
    fn parse(&self, content: &str) -> Result<PropertySet, DomainError>;
}

/// Análisis de simetría sobre una estructura.
pub trait SymmetryAnalyzer: Debug + Send + Sync {
    fn analyze(&self, structure: &Structure, tolerance: f64) -> Result<SymmetryDescriptor, DomainError>;
}

// ---------------------------------------------------------------------
// Implementaciones built-in
// ---------------------------------------------------------------------

/// Parser del formato xyz clásico: línea de conteo opcional, comentario
/// opcional (puede traer `charge=N mult=M`), una línea `El x y z` por átomo.
#[derive(Debug, Clone, Default)]
pub struct XyzConverter;

impl StructureConverter for XyzConverter {
    fn convert(&self, format: &str, content: &str) -> Result<Structure, DomainError> {
        if format != "xyz" {
            return Err(DomainError::ParseError(format!("unsupported structure format: {format}")));
        }
        let mut lines = content.lines().peekable();
        // línea de conteo opcional
        if let Some(first) = lines.peek() {
            if first.trim().parse::<usize>().is_ok() {
                lines.next();
            }
        }
        let mut charge = 0i64;
        let mut multiplicity = 1u32;
        // comentario opcional, con charge/mult embebidos
        if let Some(second) = lines.peek() {
            let looks_like_atom = second
                .split_whitespace()
                .nth(1)
                .map(|tok| tok.parse::<f64>().is_ok())
                .unwrap_or(false);
            if !looks_like_atom {
                for token in second.split_whitespace() {
                    if let Some(v) = token.strip_prefix("charge=") {
                        charge = v
                            .parse()
                            .map_err(|_| DomainError::ParseError(format!("bad charge: {token}")))?;
                    }
                    if let Some(v) = token.strip_prefix("mult=") {
                        multiplicity = v
                            .parse()
                            .map_err(|_| DomainError::ParseError(format!("bad multiplicity: {token}")))?;
                    }
                }
                lines.next();
            }
        }

        let mut species = Vec::new();
        let mut coords = Vec::new();
        for line in lines {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut parts = trimmed.split_whitespace();
            let el = parts
                .next()
                .ok_or_else(|| DomainError::ParseError(format!("bad atom line: {trimmed}")))?;
            let mut xyz = [0.0f64; 3];
            for slot in xyz.iter_mut() {
                *slot = parts
                    .next()
                    .ok_or_else(|| DomainError::ParseError(format!("bad atom line: {trimmed}")))?
                    .parse()
                    .map_err(|_| DomainError::ParseError(format!("bad coordinate in: {trimmed}")))?;
            }
            species.push(el.to_string());
            coords.push(xyz);
        }
        Structure::new(species, coords, None, charge, multiplicity)
    }
}

/// Motor QC stub: produce una salida con el formato que `PlainOutputParser`
/// entiende, con valores deterministas derivados del hash del deck. Permite
/// ejercitar el pipeline completo (incluida la cache) sin un motor instalado.
#[derive(Debug, Clone, Default)]
pub struct StubQcEngine;

impl QcEngine for StubQcEngine {
    fn execute(&self, deck: &str) -> Result<String, DomainError> {
        let digest = hash_str(deck);
        let seed = u32::from_str_radix(&digest[..8], 16)
            .map_err(|e| DomainError::ExternalError(e.to_string()))?;
        let energy = -20.0 - (seed % 100_000) as f64 / 1000.0;
        let homo = -5.0 - (seed % 7_000) as f64 / 1000.0;
        let lumo = 0.5 + (seed % 3_000) as f64 / 1000.0;
        Ok(format!(
            "stub quantum chemistry engine\n\
             deck hash: {digest}\n\
             Total energy = {energy:.5} eV\n\
             HOMO = {homo:.4} eV\n\
             LUMO = {lumo:.4} eV\n\
             Total job time: 0.00 s\n"
        ))
    }
}

/// Parser por líneas de la salida del motor: energía total, orbitales
/// frontera y walltime del pie del archivo.
#[derive(Debug, Clone, Default)]
pub struct PlainOutputParser;

fn trailing_number(line: &str, prefix: &str) -> Option<f64> {
    let rest = line.trim().strip_prefix(prefix)?;
    rest.split_whitespace().next()?.parse().ok()
}

impl QcOutputParser for PlainOutputParser {
    fn parse(&self, content: &str) -> Result<PropertySet, DomainError> {
        let mut props = PropertySet::default();
        for line in content.lines() {
            if let Some(v) = trailing_number(line, "Total energy =") {
                props.total_energy_ev = Some(v);
            } else if let Some(v) = trailing_number(line, "HOMO =") {
                props.homo_ev = Some(v);
            } else if let Some(v) = trailing_number(line, "LUMO =") {
                props.lumo_ev = Some(v);
            } else if let Some(v) = trailing_number(line, "Total job time:") {
                props.walltime_s = Some(v);
            } else if let Some(v) = trailing_number(line, "Dipole norm =") {
                props.dipole_norm_debye = Some(v);
            }
        }
        if props.is_empty() {
            return Err(DomainError::ParseError("no recognizable properties in output".to_string()));
        }
        Ok(props)
    }
}

/// Analizador naive: detecta el centro de inversión respecto del centroide.
/// Con inversión reporta P-1 (grupo 2); sin ella, P1 (grupo 1).
#[derive(Debug, Clone, Default)]
pub struct InversionAnalyzer;

impl SymmetryAnalyzer for InversionAnalyzer {
    fn analyze(&self, structure: &Structure, tolerance: f64) -> Result<SymmetryDescriptor, DomainError> {
        let centroid = structure.centroid();
        let inverted = structure.coords().iter().enumerate().all(|(i, p)| {
            let mirror = [
                2.0 * centroid[0] - p[0],
                2.0 * centroid[1] - p[1],
                2.0 * centroid[2] - p[2],
            ];
            structure
                .coords()
                .iter()
                .enumerate()
                .any(|(j, q)| {
                    structure.species()[i] == structure.species()[j]
                        && (q[0] - mirror[0]).abs() <= tolerance
                        && (q[1] - mirror[1]).abs() <= tolerance
                        && (q[2] - mirror[2]).abs() <= tolerance
                })
        });
        if inverted {
            SymmetryDescriptor::new(2, "P-1", 2, tolerance)
        } else {
            SymmetryDescriptor::new(1, "P1", 1, tolerance)
        }
    }
}
