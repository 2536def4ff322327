//! Self-regulating trickle vent.

use crate::common::{dp_sign, DP_MIN};
use crate::element::LinkFlow;
use crate::error::{ElementError, ElementResult};

/// Self-regulating vent: ramps linearly up to `p_min`, holds a constant
/// target volume flow between `p_min` and `p_max`, and overflows as a square
/// root above `p_max`. The regulation band reports a tiny derivative rather
/// than zero so the Jacobian stays non-singular.
#[derive(Debug, Clone, PartialEq)]
pub struct SelfRegulatingVent {
    target_flow: f64,
    p_min: f64,
    p_max: f64,
}

impl SelfRegulatingVent {
    pub fn new(target_flow: f64, p_min: f64, p_max: f64) -> ElementResult<Self> {
        if target_flow <= 0.0 {
            return Err(ElementError::InvalidArg {
                what: "vent target flow must be positive",
            });
        }
        let p_min = if p_min <= 0.0 { 1.0 } else { p_min };
        let p_max = if p_max <= p_min { p_min * 50.0 } else { p_max };
        Ok(Self {
            target_flow,
            p_min,
            p_max,
        })
    }

    pub fn flow(&self, delta_p: f64, density: f64) -> LinkFlow {
        let abs_dp = delta_p.abs();
        let sign = dp_sign(delta_p);

        if abs_dp < DP_MIN {
            let slope = density * self.target_flow / self.p_min;
            return LinkFlow {
                mass_flow: slope * delta_p,
                derivative: slope,
            };
        }
        if abs_dp < self.p_min {
            // Ramp-up: linear from 0 to target flow at p_min
            let q = self.target_flow * abs_dp / self.p_min;
            return LinkFlow {
                mass_flow: density * q * sign,
                derivative: density * self.target_flow / self.p_min,
            };
        }
        if abs_dp <= self.p_max {
            // Regulation band: constant flow
            return LinkFlow {
                mass_flow: density * self.target_flow * sign,
                derivative: density * 1e-8,
            };
        }
        // Overflow: Q = Q_target · sqrt(ΔP / p_max)
        let q = self.target_flow * (abs_dp / self.p_max).sqrt();
        LinkFlow {
            mass_flow: density * q * sign,
            derivative: 0.5 * density * self.target_flow / (abs_dp * self.p_max).sqrt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vent() -> SelfRegulatingVent {
        SelfRegulatingVent::new(0.01, 2.0, 40.0).unwrap()
    }

    #[test]
    fn ramp_region_scales_linearly() {
        let v = vent();
        let r = v.flow(1.0, 1.2);
        assert!((r.mass_flow - 1.2 * 0.01 * 0.5).abs() < 1e-12);
    }

    #[test]
    fn regulation_band_holds_target() {
        let v = vent();
        let a = v.flow(5.0, 1.2).mass_flow;
        let b = v.flow(35.0, 1.2).mass_flow;
        assert!((a - 1.2 * 0.01).abs() < 1e-12);
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn overflow_grows_as_sqrt() {
        let v = vent();
        let r = v.flow(160.0, 1.2);
        let q_expected = 0.01 * (160.0_f64 / 40.0).sqrt();
        assert!((r.mass_flow - 1.2 * q_expected).abs() < 1e-12);
        assert!(r.mass_flow > 1.2 * 0.01);
    }

    #[test]
    fn negative_pressure_mirrors() {
        let v = vent();
        assert!((v.flow(5.0, 1.2).mass_flow + v.flow(-5.0, 1.2).mass_flow).abs() < 1e-15);
    }

    #[test]
    fn degenerate_limits_are_repaired() {
        let v = SelfRegulatingVent::new(0.01, -1.0, 0.0).unwrap();
        // p_min coerced to 1.0, p_max to 50·p_min
        assert!(v.flow(25.0, 1.2).mass_flow > 0.0);
    }
}
