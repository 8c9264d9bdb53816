use serde::{Deserialize, Serialize};

/// Propiedades extraídas de la salida de un cálculo de química cuántica.
/// Todos los campos son opcionales: cada tipo de job produce un subconjunto.
/// Energías en eV, walltime en segundos.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertySet {
    pub total_energy_ev: Option<f64>,
    pub homo_ev: Option<f64>,
    pub lumo_ev: Option<f64>,
    pub dipole_norm_debye: Option<f64>,
    pub walltime_s: Option<f64>,
}

impl PropertySet {
    /// Gap HOMO-LUMO si ambos orbitales frontera están presentes.
    pub fn gap_ev(&self) -> Option<f64> {
        match (self.homo_ev, self.lumo_ev) {
            (Some(h), Some(l)) => Some(l - h),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_energy_ev.is_none()
            && self.homo_ev.is_none()
            && self.lumo_ev.is_none()
            && self.dipole_norm_debye.is_none()
            && self.walltime_s.is_none()
    }
}
