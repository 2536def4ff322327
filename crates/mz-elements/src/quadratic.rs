//! Quadratic crack model: `ΔP = a·F + b·F²`, inverted for the volume flow F.

use crate::common::{dp_sign, DP_MIN, EPS};
use crate::element::LinkFlow;
use crate::error::{ElementError, ElementResult};

/// Quadratic pressure-flow element.
///
/// The forward relation `ΔP = a·F + b·F²` mixes a viscous (linear) and an
/// inertial (quadratic) loss; the element inverts it analytically.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadraticElement {
    a: f64,
    b: f64,
}

impl QuadraticElement {
    pub fn new(a: f64, b: f64) -> ElementResult<Self> {
        if a < 0.0 {
            return Err(ElementError::InvalidArg {
                what: "linear coefficient a must be non-negative",
            });
        }
        if b < 0.0 {
            return Err(ElementError::InvalidArg {
                what: "quadratic coefficient b must be non-negative",
            });
        }
        if a == 0.0 && b == 0.0 {
            return Err(ElementError::InvalidArg {
                what: "at least one quadratic-element coefficient must be positive",
            });
        }
        Ok(Self { a, b })
    }

    /// Crack description via Poiseuille flow plus entrance/exit losses:
    /// `a = 12·μ·depth/(width³·length·…)`, `b = 1.5·ρ/(2·A²)` with
    /// `A = width·length`.
    pub fn from_crack(
        length: f64,
        width: f64,
        depth: f64,
        viscosity: f64,
        density: f64,
    ) -> ElementResult<Self> {
        if length <= 0.0 || width <= 0.0 || depth <= 0.0 {
            return Err(ElementError::InvalidArg {
                what: "crack dimensions must be positive",
            });
        }
        let area = width * length;
        let a = 12.0 * viscosity * depth / (width * width * area);
        let b = 1.5 * density / (2.0 * area * area);
        Self::new(a, b)
    }

    pub fn flow(&self, delta_p: f64, density: f64) -> LinkFlow {
        let abs_dp = delta_p.abs();
        let sign = dp_sign(delta_p);

        if abs_dp < DP_MIN {
            let slope = if self.a > 0.0 {
                1.0 / self.a
            } else {
                (1.0 / (self.b * DP_MIN)).sqrt()
            };
            return LinkFlow {
                mass_flow: density * slope * delta_p,
                derivative: density * slope,
            };
        }

        if self.b < EPS {
            // Pure linear: F = ΔP / a
            let f = abs_dp / self.a;
            return LinkFlow {
                mass_flow: density * f * sign,
                derivative: density / self.a,
            };
        }
        if self.a < EPS {
            // Pure quadratic: F = sqrt(ΔP / b)
            let f = (abs_dp / self.b).sqrt();
            return LinkFlow {
                mass_flow: density * f * sign,
                derivative: density / (2.0 * (self.b * abs_dp).sqrt()),
            };
        }

        // General: F = (-a + sqrt(a² + 4b·ΔP)) / (2b); dF/dΔP = 2/sqrt(disc)
        let disc = self.a * self.a + 4.0 * self.b * abs_dp;
        let f = (-self.a + disc.sqrt()) / (2.0 * self.b);
        LinkFlow {
            mass_flow: density * f * sign,
            derivative: density * 2.0 / disc.sqrt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::MU_AIR;

    #[test]
    fn rejects_degenerate_coefficients() {
        assert!(QuadraticElement::new(0.0, 0.0).is_err());
        assert!(QuadraticElement::new(-1.0, 1.0).is_err());
        assert!(QuadraticElement::new(1.0, -1.0).is_err());
    }

    #[test]
    fn inverts_forward_relation() {
        let e = QuadraticElement::new(100.0, 5000.0).unwrap();
        let rho = 1.2;
        let result = e.flow(25.0, rho);
        let f = result.mass_flow / rho;
        // ΔP = a·F + b·F² should reproduce the input
        let dp = 100.0 * f + 5000.0 * f * f;
        assert!((dp - 25.0).abs() < 1e-9);
    }

    #[test]
    fn pure_linear_and_pure_quadratic_limits() {
        let lin = QuadraticElement::new(50.0, 0.0).unwrap();
        let r = lin.flow(10.0, 1.2);
        assert!((r.mass_flow / 1.2 - 0.2).abs() < 1e-12);

        let quad = QuadraticElement::new(0.0, 400.0).unwrap();
        let r = quad.flow(16.0, 1.2);
        assert!((r.mass_flow / 1.2 - 0.2).abs() < 1e-12);
    }

    #[test]
    fn crack_factory_produces_valid_element() {
        let e = QuadraticElement::from_crack(1.0, 0.002, 0.1, MU_AIR, 1.2).unwrap();
        let r = e.flow(4.0, 1.2);
        assert!(r.mass_flow > 0.0);
        assert!(r.derivative > 0.0);
    }

    #[test]
    fn negative_dp_gives_negative_flow() {
        let e = QuadraticElement::new(100.0, 5000.0).unwrap();
        assert!(e.flow(-25.0, 1.2).mass_flow < 0.0);
        assert!(e.flow(-25.0, 1.2).derivative > 0.0);
    }
}
