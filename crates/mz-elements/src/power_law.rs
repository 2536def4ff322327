//! Power-law orifice, the workhorse crack/opening model.

use mz_core::units::constants::RHO_STD;
use mz_core::units::Area;

use crate::common::{dp_sign, power_law_chord_slope, validate_power_law, DP_MIN};
use crate::element::LinkFlow;
use crate::error::ElementResult;

/// Power-law leakage element: `ṁ = ρ · C · |ΔP|^n · sign(ΔP)`.
///
/// `C` is a volume-flow coefficient (m³/(s·Pa^n)); the exponent `n` spans
/// 0.5 (sharp orifice) to 1.0 (fully developed laminar crack).
#[derive(Debug, Clone, PartialEq)]
pub struct PowerLawOrifice {
    c: f64,
    n: f64,
    linear_slope: f64,
}

impl PowerLawOrifice {
    pub fn new(c: f64, n: f64) -> ElementResult<Self> {
        validate_power_law(c, n)?;
        Ok(Self {
            c,
            n,
            linear_slope: power_law_chord_slope(c, n),
        })
    }

    /// ASHRAE effective-leakage-area conversion.
    ///
    /// At the reference pressure difference the ELA passes
    /// `Q_ref = A · sqrt(2·ΔP_ref/ρ_ref)`, so
    /// `C = A · sqrt(2/ρ_ref) · ΔP_ref^(0.5−n)`.
    pub fn from_leakage_area(area: Area, n: f64, dp_ref: f64, rho_ref: f64) -> ElementResult<Self> {
        if area.value <= 0.0 || dp_ref <= 0.0 || rho_ref <= 0.0 {
            return Err(crate::ElementError::InvalidArg {
                what: "leakage area, reference dP and reference density must be positive",
            });
        }
        let c = area.value * (2.0 / rho_ref).sqrt() * dp_ref.powf(0.5 - n);
        Self::new(c, n)
    }

    /// Sharp-edged orifice of area `A` and discharge coefficient `Cd`
    /// (`n = 0.5`): `Q = Cd·A·sqrt(2·ΔP/ρ)`.
    pub fn from_orifice_area(area: Area, cd: f64, rho_ref: f64) -> ElementResult<Self> {
        if area.value <= 0.0 || cd <= 0.0 || rho_ref <= 0.0 {
            return Err(crate::ElementError::InvalidArg {
                what: "orifice area, Cd and reference density must be positive",
            });
        }
        let c = cd * area.value * (2.0 / rho_ref).sqrt();
        Self::new(c, 0.5)
    }

    /// Convenience factory using standard air density for the reference.
    pub fn from_orifice_area_std(area: Area, cd: f64) -> ElementResult<Self> {
        Self::from_orifice_area(area, cd, RHO_STD)
    }

    pub fn flow_coefficient(&self) -> f64 {
        self.c
    }

    pub fn flow_exponent(&self) -> f64 {
        self.n
    }

    pub fn flow(&self, delta_p: f64, density: f64) -> LinkFlow {
        let abs_dp = delta_p.abs();
        if abs_dp < DP_MIN {
            return LinkFlow {
                mass_flow: density * self.linear_slope * delta_p,
                derivative: density * self.linear_slope,
            };
        }
        let q = self.c * abs_dp.powf(self.n);
        LinkFlow {
            mass_flow: density * q * dp_sign(delta_p),
            derivative: density * self.n * self.c * abs_dp.powf(self.n - 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mz_core::units::m2;

    #[test]
    fn rejects_bad_parameters() {
        assert!(PowerLawOrifice::new(-0.001, 0.65).is_err());
        assert!(PowerLawOrifice::new(0.001, 1.5).is_err());
    }

    #[test]
    fn flow_is_odd_in_delta_p() {
        let e = PowerLawOrifice::new(0.001, 0.65).unwrap();
        let fwd = e.flow(10.0, 1.2);
        let rev = e.flow(-10.0, 1.2);
        assert!((fwd.mass_flow + rev.mass_flow).abs() < 1e-15);
        assert!((fwd.derivative - rev.derivative).abs() < 1e-15);
        assert!(fwd.mass_flow > 0.0);
    }

    #[test]
    fn derivative_positive_and_continuous_at_dp_min() {
        let e = PowerLawOrifice::new(0.002, 0.5).unwrap();
        let below = e.flow(DP_MIN * 0.999, 1.2);
        let above = e.flow(DP_MIN * 1.001, 1.2);
        assert!(below.derivative > 0.0);
        assert!((below.mass_flow - above.mass_flow).abs() / above.mass_flow.abs() < 1e-2);
    }

    #[test]
    fn leakage_area_reproduces_reference_flow() {
        let e = PowerLawOrifice::from_leakage_area(m2(0.01), 0.65, 4.0, 1.2).unwrap();
        let result = e.flow(4.0, 1.2);
        let q = result.mass_flow / 1.2;
        let q_expected = 0.01 * (2.0 * 4.0 / 1.2_f64).sqrt();
        assert!((q - q_expected).abs() < q_expected * 0.01);
    }

    #[test]
    fn orifice_area_has_half_exponent() {
        let e = PowerLawOrifice::from_orifice_area_std(m2(0.05), 0.6).unwrap();
        assert_eq!(e.flow_exponent(), 0.5);
        let dp = 10.0;
        let q = e.flow(dp, 1.2).mass_flow / 1.2;
        let q_expected = 0.6 * 0.05 * (2.0 * dp / 1.2_f64).sqrt();
        assert!((q - q_expected).abs() < q_expected * 0.01);
    }
}
