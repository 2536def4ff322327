//! Circular duct with Darcy-Weisbach friction.

use std::f64::consts::PI;

use crate::common::{dp_sign, DP_MIN, MU_AIR};
use crate::element::LinkFlow;
use crate::error::{ElementError, ElementResult};

/// Duct segment: iterative Darcy-Weisbach with laminar (64/Re) and
/// Swamee-Jain turbulent friction, plus a lumped fitting loss `sum_k`.
#[derive(Debug, Clone, PartialEq)]
pub struct Duct {
    length: f64,
    diameter: f64,
    roughness: f64,
    sum_k: f64,
    area: f64,
    linear_slope: f64,
}

impl Duct {
    pub fn new(length: f64, diameter: f64, roughness: f64, sum_k: f64) -> ElementResult<Self> {
        if length <= 0.0 {
            return Err(ElementError::InvalidArg {
                what: "duct length must be positive",
            });
        }
        if diameter <= 0.0 {
            return Err(ElementError::InvalidArg {
                what: "duct diameter must be positive",
            });
        }
        if roughness < 0.0 {
            return Err(ElementError::InvalidArg {
                what: "duct roughness must be non-negative",
            });
        }
        if sum_k < 0.0 {
            return Err(ElementError::InvalidArg {
                what: "duct fitting loss sum must be non-negative",
            });
        }

        let area = PI * diameter * diameter / 4.0;

        // Linearisation slope from a turbulent guess (f ≈ 0.02) at DP_MIN.
        let f_guess = 0.02;
        let mut k_total = f_guess * length / diameter + sum_k;
        if k_total < 1e-10 {
            k_total = 1.0;
        }
        let rho_ref = 1.2;
        let v_min = (2.0 * DP_MIN / (rho_ref * k_total)).sqrt();
        let mdot_min = rho_ref * area * v_min;

        Ok(Self {
            length,
            diameter,
            roughness,
            sum_k,
            area,
            linear_slope: mdot_min / DP_MIN,
        })
    }

    pub fn flow(&self, delta_p: f64, density: f64) -> LinkFlow {
        let abs_dp = delta_p.abs();
        if abs_dp < DP_MIN {
            return LinkFlow {
                mass_flow: self.linear_slope * delta_p,
                derivative: self.linear_slope,
            };
        }

        // Fixed-point on the friction factor: ΔP = (f·L/D + ΣK)·ρV²/2
        let mut f = 0.02;
        let mut v = 0.0;
        for _ in 0..10 {
            let mut k_total = f * self.length / self.diameter + self.sum_k;
            if k_total < 1e-10 {
                k_total = 1e-10;
            }
            v = (2.0 * abs_dp / (density * k_total)).sqrt();

            let re = (density * v * self.diameter / MU_AIR).max(1.0);
            let f_new = if re < 2300.0 {
                64.0 / re
            } else {
                // Swamee-Jain approximation of Colebrook-White
                let e_d = self.roughness / self.diameter;
                let term = e_d / 3.7 + 5.74 / re.powf(0.9);
                let log_term = term.log10();
                0.25 / (log_term * log_term)
            };

            if (f_new - f).abs() < 1e-6 {
                f = f_new;
                break;
            }
            f = f_new;
        }

        let mass_flow = density * self.area * v * dp_sign(delta_p);
        // From V = sqrt(2ΔP/(ρK)): dṁ/dΔP = ṁ/(2ΔP)
        LinkFlow {
            mass_flow,
            derivative: mass_flow.abs() / (2.0 * abs_dp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_geometry_rejected() {
        assert!(Duct::new(0.0, 0.2, 1e-4, 0.0).is_err());
        assert!(Duct::new(5.0, -0.2, 1e-4, 0.0).is_err());
        assert!(Duct::new(5.0, 0.2, -1e-4, 0.0).is_err());
    }

    #[test]
    fn flow_increases_with_pressure() {
        let d = Duct::new(10.0, 0.25, 1.5e-4, 0.5).unwrap();
        let lo = d.flow(5.0, 1.2).mass_flow;
        let hi = d.flow(50.0, 1.2).mass_flow;
        assert!(lo > 0.0);
        assert!(hi > lo);
    }

    #[test]
    fn derivative_is_half_secant() {
        let d = Duct::new(10.0, 0.25, 1.5e-4, 0.5).unwrap();
        let r = d.flow(20.0, 1.2);
        assert!((r.derivative - r.mass_flow.abs() / 40.0).abs() < 1e-12);
    }

    #[test]
    fn reverse_flow_mirrors_forward() {
        let d = Duct::new(10.0, 0.25, 1.5e-4, 0.5).unwrap();
        let fwd = d.flow(30.0, 1.2).mass_flow;
        let rev = d.flow(-30.0, 1.2).mass_flow;
        assert!((fwd + rev).abs() < 1e-12);
    }
}
