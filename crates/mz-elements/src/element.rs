//! The polymorphic flow element.
//!
//! A link owns exactly one [`FlowElement`]; the control loop swaps modified
//! clones in atomically, which is why the element is a plain `Clone` sum type
//! rather than a trait object.

use crate::backdraft::BackdraftDamper;
use crate::check_valve::CheckValve;
use crate::damper::Damper;
use crate::duct::Duct;
use crate::fan::Fan;
use crate::filter::{GaseousFilter, ParticleFilter, SuperFilter, UvgiFilter};
use crate::power_law::PowerLawOrifice;
use crate::quadratic::QuadraticElement;
use crate::terminal::{ReturnGrille, SupplyDiffuser};
use crate::vent::SelfRegulatingVent;

/// Result of one element evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LinkFlow {
    /// Mass flow (kg/s), positive from the link's from-node to its to-node.
    pub mass_flow: f64,
    /// dṁ/d(ΔP) (kg/(s·Pa)), non-negative.
    pub derivative: f64,
}

/// Discriminant for reporting and control-target checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    PowerLaw,
    Damper,
    Quadratic,
    Backdraft,
    CheckValve,
    Vent,
    Duct,
    Fan,
    SupplyDiffuser,
    ReturnGrille,
    ParticleFilter,
    GaseousFilter,
    Uvgi,
    SuperFilter,
}

/// A link's constitutive ΔP ↔ ṁ relation.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowElement {
    PowerLaw(PowerLawOrifice),
    Damper(Damper),
    Quadratic(QuadraticElement),
    Backdraft(BackdraftDamper),
    CheckValve(CheckValve),
    Vent(SelfRegulatingVent),
    Duct(Duct),
    Fan(Fan),
    SupplyDiffuser(SupplyDiffuser),
    ReturnGrille(ReturnGrille),
    ParticleFilter(ParticleFilter),
    GaseousFilter(GaseousFilter),
    Uvgi(UvgiFilter),
    SuperFilter(SuperFilter),
}

impl FlowElement {
    /// Evaluate the element at an effective pressure difference (Pa) and a
    /// reference density (kg/m³, mean of the connected nodes).
    pub fn flow(&self, delta_p: f64, density: f64) -> LinkFlow {
        match self {
            Self::PowerLaw(e) => e.flow(delta_p, density),
            Self::Damper(e) => e.flow(delta_p, density),
            Self::Quadratic(e) => e.flow(delta_p, density),
            Self::Backdraft(e) => e.flow(delta_p, density),
            Self::CheckValve(e) => e.flow(delta_p, density),
            Self::Vent(e) => e.flow(delta_p, density),
            Self::Duct(e) => e.flow(delta_p, density),
            Self::Fan(e) => e.flow(delta_p, density),
            Self::SupplyDiffuser(e) => e.flow(delta_p, density),
            Self::ReturnGrille(e) => e.flow(delta_p, density),
            Self::ParticleFilter(e) => e.flow(delta_p, density),
            Self::GaseousFilter(e) => e.flow(delta_p, density),
            Self::Uvgi(e) => e.flow(delta_p, density),
            Self::SuperFilter(e) => e.flow(delta_p, density),
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Self::PowerLaw(_) => ElementKind::PowerLaw,
            Self::Damper(_) => ElementKind::Damper,
            Self::Quadratic(_) => ElementKind::Quadratic,
            Self::Backdraft(_) => ElementKind::Backdraft,
            Self::CheckValve(_) => ElementKind::CheckValve,
            Self::Vent(_) => ElementKind::Vent,
            Self::Duct(_) => ElementKind::Duct,
            Self::Fan(_) => ElementKind::Fan,
            Self::SupplyDiffuser(_) => ElementKind::SupplyDiffuser,
            Self::ReturnGrille(_) => ElementKind::ReturnGrille,
            Self::ParticleFilter(_) => ElementKind::ParticleFilter,
            Self::GaseousFilter(_) => ElementKind::GaseousFilter,
            Self::Uvgi(_) => ElementKind::Uvgi,
            Self::SuperFilter(_) => ElementKind::SuperFilter,
        }
    }

    /// Apply a `DamperFraction` command. Returns false when the element has
    /// no opening fraction.
    pub fn set_fraction(&mut self, fraction: f64) -> bool {
        match self {
            Self::Damper(e) => {
                e.set_fraction(fraction);
                true
            }
            _ => false,
        }
    }

    /// Apply a `FanSpeed` command. Returns false for non-fan elements.
    pub fn set_speed(&mut self, speed: f64) -> bool {
        match self {
            Self::Fan(e) => {
                e.set_speed(speed);
                true
            }
            _ => false,
        }
    }

    /// Apply a `FilterBypass` command. Returns false for non-filter elements.
    pub fn set_bypass(&mut self, bypass: f64) -> bool {
        match self {
            Self::ParticleFilter(e) => {
                e.set_bypass(bypass);
                true
            }
            Self::GaseousFilter(e) => {
                e.set_bypass(bypass);
                true
            }
            Self::Uvgi(e) => {
                e.set_bypass(bypass);
                true
            }
            Self::SuperFilter(e) => {
                e.set_bypass(bypass);
                true
            }
            _ => false,
        }
    }

    /// Fraction of species `species_idx` that survives passage through this
    /// element at a volumetric flow (m³/s) and air temperature (K).
    /// Non-filter elements pass everything.
    pub fn penetration(&self, species_idx: usize, flow_rate: f64, temperature: f64) -> f64 {
        match self {
            Self::ParticleFilter(e) => e.penetration(species_idx),
            Self::GaseousFilter(e) => e.penetration(species_idx),
            Self::Uvgi(e) => e.penetration(flow_rate, temperature),
            Self::SuperFilter(e) => e.penetration(species_idx),
            _ => 1.0,
        }
    }
}

impl From<PowerLawOrifice> for FlowElement {
    fn from(e: PowerLawOrifice) -> Self {
        Self::PowerLaw(e)
    }
}

impl From<Damper> for FlowElement {
    fn from(e: Damper) -> Self {
        Self::Damper(e)
    }
}

impl From<QuadraticElement> for FlowElement {
    fn from(e: QuadraticElement) -> Self {
        Self::Quadratic(e)
    }
}

impl From<BackdraftDamper> for FlowElement {
    fn from(e: BackdraftDamper) -> Self {
        Self::Backdraft(e)
    }
}

impl From<CheckValve> for FlowElement {
    fn from(e: CheckValve) -> Self {
        Self::CheckValve(e)
    }
}

impl From<SelfRegulatingVent> for FlowElement {
    fn from(e: SelfRegulatingVent) -> Self {
        Self::Vent(e)
    }
}

impl From<Duct> for FlowElement {
    fn from(e: Duct) -> Self {
        Self::Duct(e)
    }
}

impl From<Fan> for FlowElement {
    fn from(e: Fan) -> Self {
        Self::Fan(e)
    }
}

impl From<SupplyDiffuser> for FlowElement {
    fn from(e: SupplyDiffuser) -> Self {
        Self::SupplyDiffuser(e)
    }
}

impl From<ReturnGrille> for FlowElement {
    fn from(e: ReturnGrille) -> Self {
        Self::ReturnGrille(e)
    }
}

impl From<ParticleFilter> for FlowElement {
    fn from(e: ParticleFilter) -> Self {
        Self::ParticleFilter(e)
    }
}

impl From<GaseousFilter> for FlowElement {
    fn from(e: GaseousFilter) -> Self {
        Self::GaseousFilter(e)
    }
}

impl From<UvgiFilter> for FlowElement {
    fn from(e: UvgiFilter) -> Self {
        Self::Uvgi(e)
    }
}

impl From<SuperFilter> for FlowElement {
    fn from(e: SuperFilter) -> Self {
        Self::SuperFilter(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_modify_swap_does_not_alias() {
        let original: FlowElement = Damper::new(0.01, 0.5, 1.0).unwrap().into();
        let mut replacement = original.clone();
        assert!(replacement.set_fraction(0.25));
        let f_orig = original.flow(10.0, 1.2).mass_flow;
        let f_mod = replacement.flow(10.0, 1.2).mass_flow;
        assert!(f_mod < f_orig);
    }

    #[test]
    fn actuator_hooks_reject_wrong_kinds() {
        let mut orifice: FlowElement = PowerLawOrifice::new(0.001, 0.65).unwrap().into();
        assert!(!orifice.set_fraction(0.5));
        assert!(!orifice.set_speed(0.5));
        assert!(!orifice.set_bypass(0.5));
    }

    #[test]
    fn non_filters_pass_everything() {
        let orifice: FlowElement = PowerLawOrifice::new(0.001, 0.65).unwrap().into();
        assert_eq!(orifice.penetration(0, 0.1, 293.15), 1.0);
    }
}
