//! HVAC terminals: supply diffusers and return grilles.
//!
//! Both behave as sharp-edged openings (power law with n = 0.5); they exist
//! as their own kinds so HVAC bookkeeping and reporting can tell them apart
//! from envelope leakage.

use crate::element::LinkFlow;
use crate::error::ElementResult;
use crate::power_law::PowerLawOrifice;

/// Ceiling/wall supply diffuser.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplyDiffuser {
    inner: PowerLawOrifice,
}

impl SupplyDiffuser {
    pub fn new(c: f64) -> ElementResult<Self> {
        Ok(Self {
            inner: PowerLawOrifice::new(c, 0.5)?,
        })
    }

    pub fn flow(&self, delta_p: f64, density: f64) -> LinkFlow {
        self.inner.flow(delta_p, density)
    }
}

/// Return-air grille.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnGrille {
    inner: PowerLawOrifice,
}

impl ReturnGrille {
    pub fn new(c: f64) -> ElementResult<Self> {
        Ok(Self {
            inner: PowerLawOrifice::new(c, 0.5)?,
        })
    }

    pub fn flow(&self, delta_p: f64, density: f64) -> LinkFlow {
        self.inner.flow(delta_p, density)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminals_share_orifice_behaviour() {
        let d = SupplyDiffuser::new(0.05).unwrap();
        let g = ReturnGrille::new(0.05).unwrap();
        let a = d.flow(25.0, 1.2);
        let b = g.flow(25.0, 1.2);
        assert!((a.mass_flow - b.mass_flow).abs() < 1e-15);
        // n = 0.5: flow scales with sqrt of pressure
        let c = d.flow(100.0, 1.2);
        assert!((c.mass_flow / a.mass_flow - 2.0).abs() < 1e-9);
    }
}
