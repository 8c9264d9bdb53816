use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::DomainError;

/// Estructura atómica normalizada: especies + coordenadas cartesianas (Å),
/// con celda opcional para sistemas periódicos. Es el valor que fluye entre
/// tasks; la conversión desde formatos crudos (xyz, cif, ...) es
/// responsabilidad de un colaborador externo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    species: Vec<String>,
    coords: Vec<[f64; 3]>,
    lattice: Option<[[f64; 3]; 3]>,
    charge: i64,
    multiplicity: u32,
}

impl Structure {
    /// Constructor validado: especies y coordenadas deben tener la misma
    /// longitud y la multiplicidad debe ser >= 1.
    pub fn new(
        species: Vec<String>,
        coords: Vec<[f64; 3]>,
        lattice: Option<[[f64; 3]; 3]>,
        charge: i64,
        multiplicity: u32,
    ) -> Result<Self, DomainError> {
        if species.is_empty() {
            return Err(DomainError::ValidationError("structure has no atoms".to_string()));
        }
        if species.len() != coords.len() {
            return Err(DomainError::ValidationError(format!(
                "species/coords length mismatch: {} vs {}",
                species.len(),
                coords.len()
            )));
        }
        if multiplicity == 0 {
            return Err(DomainError::ValidationError("multiplicity must be >= 1".to_string()));
        }
        Ok(Structure { species, coords, lattice, charge, multiplicity })
    }

    /// Molécula neutra singlete, el caso más común en los demos.
    pub fn neutral(species: Vec<String>, coords: Vec<[f64; 3]>) -> Result<Self, DomainError> {
        Structure::new(species, coords, None, 0, 1)
    }

    pub fn species(&self) -> &[String] {
        &self.species
    }

    pub fn coords(&self) -> &[[f64; 3]] {
        &self.coords
    }

    pub fn lattice(&self) -> Option<&[[f64; 3]; 3]> {
        self.lattice.as_ref()
    }

    pub fn charge(&self) -> i64 {
        self.charge
    }

    pub fn multiplicity(&self) -> u32 {
        self.multiplicity
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    /// Fórmula de Hill simplificada: conteo por especie en orden alfabético.
    pub fn formula(&self) -> String {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for s in &self.species {
            *counts.entry(s.as_str()).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .map(|(el, n)| if n == 1 { el.to_string() } else { format!("{el}{n}") })
            .collect()
    }

    /// Centroide geométrico (sin pesos de masa).
    pub fn centroid(&self) -> [f64; 3] {
        let n = self.coords.len() as f64;
        let mut c = [0.0; 3];
        for p in &self.coords {
            c[0] += p[0];
            c[1] += p[1];
            c[2] += p[2];
        }
        [c[0] / n, c[1] / n, c[2] / n]
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} ({} atoms, charge {}, mult {})>", self.formula(), self.len(), self.charge, self.multiplicity)
    }
}
