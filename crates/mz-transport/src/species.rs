//! Airborne species definitions.

use mz_core::SpeciesId;
use serde::{Deserialize, Serialize};

/// One transported species.
///
/// Trace species ride on the airflow without affecting it; a non-trace
/// species shifts the local gas constant and feeds back into zone density
/// (handled by the transient driver's coupling loop).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub id: SpeciesId,
    pub name: String,
    /// Molar mass (kg/mol), e.g. CO₂ = 0.044.
    pub molar_mass: f64,
    /// First-order decay constant (1/s); 0 = stable.
    pub decay_rate: f64,
    /// Outdoor background concentration (kg/m³).
    pub outdoor_conc: f64,
    /// Whether the species is dilute enough to ignore in the density model.
    pub is_trace: bool,
}

impl Species {
    pub fn new(id: SpeciesId, name: impl Into<String>, molar_mass: f64) -> Self {
        Self {
            id,
            name: name.into(),
            molar_mass,
            decay_rate: 0.0,
            outdoor_conc: 0.0,
            is_trace: true,
        }
    }

    pub fn with_decay_rate(mut self, decay_rate: f64) -> Self {
        self.decay_rate = decay_rate;
        self
    }

    pub fn with_outdoor_conc(mut self, outdoor_conc: f64) -> Self {
        self.outdoor_conc = outdoor_conc;
        self
    }

    /// Mark the species as dense enough to alter zone air density.
    pub fn non_trace(mut self) -> Self {
        self.is_trace = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mz_core::Id;

    #[test]
    fn builder_chain() {
        let radon = Species::new(Id::from_index(0), "Rn", 0.222)
            .with_decay_rate(2.1e-6)
            .with_outdoor_conc(1e-9);
        assert_eq!(radon.decay_rate, 2.1e-6);
        assert!(radon.is_trace);

        let sf6 = Species::new(Id::from_index(1), "SF6", 0.146).non_trace();
        assert!(!sf6.is_trace);
    }
}
