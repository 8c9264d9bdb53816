use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Descriptor de simetría producido por el analizador externo.
/// El número de grupo espacial sigue las tablas internacionales (1..=230).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymmetryDescriptor {
    spacegroup_number: u16,
    symbol: String,
    n_operations: u32,
    tolerance: f64,
}

impl SymmetryDescriptor {
    pub fn new(
        spacegroup_number: u16,
        symbol: &str,
        n_operations: u32,
        tolerance: f64,
    ) -> Result<Self, DomainError> {
        if !(1..=230).contains(&spacegroup_number) {
            return Err(DomainError::ValidationError(format!(
                "spacegroup number out of range: {spacegroup_number}"
            )));
        }
        if n_operations == 0 {
            return Err(DomainError::ValidationError("symmetry group needs at least identity".to_string()));
        }
        Ok(SymmetryDescriptor {
            spacegroup_number,
            symbol: symbol.to_string(),
            n_operations,
            tolerance,
        })
    }

    pub fn spacegroup_number(&self) -> u16 {
        self.spacegroup_number
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn n_operations(&self) -> u32 {
        self.n_operations
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}
