//! One-way check valve.

use mz_core::units::constants::RHO_STD;

use crate::common::{validate_power_law, DP_MIN};
use crate::element::LinkFlow;
use crate::error::ElementResult;

/// Power-law element that only passes flow in the positive direction.
/// Blocked reverse operation returns zero flow with a tiny derivative so the
/// Jacobian keeps full rank.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckValve {
    c: f64,
    n: f64,
    linear_slope: f64,
}

impl CheckValve {
    pub fn new(c: f64, n: f64) -> ElementResult<Self> {
        validate_power_law(c, n)?;
        // Chord slope on the mass-flow curve at a reference density; the
        // original model linearises the already-densified flow here.
        let flow_at_min = RHO_STD * c * DP_MIN.powf(n);
        Ok(Self {
            c,
            n,
            linear_slope: flow_at_min / DP_MIN,
        })
    }

    pub fn flow(&self, delta_p: f64, density: f64) -> LinkFlow {
        if delta_p <= 0.0 {
            return LinkFlow {
                mass_flow: 0.0,
                derivative: density * 1e-12,
            };
        }

        if delta_p < DP_MIN {
            return LinkFlow {
                mass_flow: self.linear_slope * delta_p,
                derivative: self.linear_slope,
            };
        }

        LinkFlow {
            mass_flow: density * self.c * delta_p.powf(self.n),
            derivative: density * self.n * self.c * delta_p.powf(self.n - 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PowerLawOrifice;

    #[test]
    fn forward_matches_power_law() {
        let cv = CheckValve::new(0.001, 0.65).unwrap();
        let plo = PowerLawOrifice::new(0.001, 0.65).unwrap();
        let a = cv.flow(10.0, 1.2);
        let b = plo.flow(10.0, 1.2);
        assert!((a.mass_flow - b.mass_flow).abs() < 1e-15);
        assert!((a.derivative - b.derivative).abs() < 1e-15);
    }

    #[test]
    fn reverse_is_blocked() {
        let cv = CheckValve::new(0.001, 0.65).unwrap();
        let r = cv.flow(-50.0, 1.2);
        assert_eq!(r.mass_flow, 0.0);
        assert!(r.derivative > 0.0);
        assert!(r.derivative < 1e-10);
    }

    #[test]
    fn zero_dp_is_blocked() {
        let cv = CheckValve::new(0.001, 0.65).unwrap();
        assert_eq!(cv.flow(0.0, 1.2).mass_flow, 0.0);
    }
}
