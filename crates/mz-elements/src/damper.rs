//! Controllable damper: a power-law opening scaled by an actuated fraction.

use crate::common::{dp_sign, power_law_chord_slope, validate_power_law, DP_MIN};
use crate::element::LinkFlow;
use crate::error::ElementResult;

/// Minimum opening fraction kept when a damper is commanded fully shut.
/// A truly zero opening would sever the node from the Jacobian.
pub const MIN_OPEN_FRACTION: f64 = 1e-4;

/// Motorised damper: power-law flow with the coefficient scaled by the
/// current opening fraction. The fraction is the target of a
/// `DamperFraction` actuator; the control loop clones the element, calls
/// [`Damper::set_fraction`] and swaps it into the link.
#[derive(Debug, Clone, PartialEq)]
pub struct Damper {
    c: f64,
    n: f64,
    fraction: f64,
}

impl Damper {
    /// `c`, `n` describe the fully open damper; `fraction` is the initial
    /// opening in [0, 1].
    pub fn new(c: f64, n: f64, fraction: f64) -> ElementResult<Self> {
        validate_power_law(c, n)?;
        Ok(Self {
            c,
            n,
            fraction: fraction.clamp(0.0, 1.0),
        })
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    /// Set the opening fraction (clamped to [0, 1]).
    pub fn set_fraction(&mut self, fraction: f64) {
        self.fraction = fraction.clamp(0.0, 1.0);
    }

    fn effective_c(&self) -> f64 {
        self.c * self.fraction.max(MIN_OPEN_FRACTION)
    }

    pub fn flow(&self, delta_p: f64, density: f64) -> LinkFlow {
        let c_eff = self.effective_c();
        let abs_dp = delta_p.abs();
        if abs_dp < DP_MIN {
            let slope = power_law_chord_slope(c_eff, self.n);
            return LinkFlow {
                mass_flow: density * slope * delta_p,
                derivative: density * slope,
            };
        }
        let q = c_eff * abs_dp.powf(self.n);
        LinkFlow {
            mass_flow: density * q * dp_sign(delta_p),
            derivative: density * self.n * c_eff * abs_dp.powf(self.n - 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_scales_with_fraction() {
        let open = Damper::new(0.01, 0.5, 1.0).unwrap();
        let half = Damper::new(0.01, 0.5, 0.5).unwrap();
        let f_open = open.flow(10.0, 1.2).mass_flow;
        let f_half = half.flow(10.0, 1.2).mass_flow;
        assert!((f_half - 0.5 * f_open).abs() < 1e-12);
    }

    #[test]
    fn closed_damper_keeps_tiny_leak() {
        let mut d = Damper::new(0.01, 0.5, 1.0).unwrap();
        d.set_fraction(0.0);
        let r = d.flow(10.0, 1.2);
        assert!(r.mass_flow > 0.0);
        assert!(r.derivative > 0.0);
        assert!(r.mass_flow < 1e-4);
    }

    #[test]
    fn set_fraction_clamps() {
        let mut d = Damper::new(0.01, 0.65, 0.5).unwrap();
        d.set_fraction(2.0);
        assert_eq!(d.fraction(), 1.0);
        d.set_fraction(-1.0);
        assert_eq!(d.fraction(), 0.0);
    }
}
