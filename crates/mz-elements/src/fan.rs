//! Fan element: linear or polynomial pressure-flow curve, speed-controllable.

use mz_core::numeric::ensure_finite;

use crate::element::LinkFlow;
use crate::error::{ElementError, ElementResult};

/// Pressure rise curve of the fan at rated speed.
#[derive(Debug, Clone, PartialEq)]
enum FanCurve {
    /// Straight line from shutoff pressure at Q=0 to zero rise at `max_flow`.
    Linear,
    /// `ΔP_fan(Q) = Σ coeffs[i]·Q^i`, inverted by Newton iteration.
    Polynomial(Vec<f64>),
}

/// Fan with an actuated speed multiplier.
///
/// The curve is stored at rated speed; an off-rated speed `s` rescales flow
/// by `s` and pressure by `s²` (fan affinity laws). Delivery is
/// one-directional: the returned mass flow is never negative, and the
/// derivative is reported with the non-negative magnitude the Jacobian
/// assembly expects.
#[derive(Debug, Clone, PartialEq)]
pub struct Fan {
    curve: FanCurve,
    max_flow: f64,
    shutoff_pressure: f64,
    speed: f64,
}

impl Fan {
    /// Linear fan: `Q = max_flow · (1 − ΔP/shutoff)`.
    pub fn new_linear(max_flow: f64, shutoff_pressure: f64) -> ElementResult<Self> {
        if max_flow <= 0.0 {
            return Err(ElementError::InvalidArg {
                what: "fan max flow must be positive",
            });
        }
        if shutoff_pressure <= 0.0 {
            return Err(ElementError::InvalidArg {
                what: "fan shutoff pressure must be positive",
            });
        }
        Ok(Self {
            curve: FanCurve::Linear,
            max_flow,
            shutoff_pressure: shutoff_pressure.abs(),
            speed: 1.0,
        })
    }

    /// Polynomial fan curve `ΔP_fan(Q)`. Needs at least two coefficients;
    /// `coeffs[0]` is the shutoff pressure.
    pub fn new_polynomial(coeffs: Vec<f64>) -> ElementResult<Self> {
        if coeffs.len() < 2 {
            return Err(ElementError::InvalidArg {
                what: "fan polynomial needs at least 2 coefficients",
            });
        }
        for &c in &coeffs {
            ensure_finite(c, "fan curve coefficient").map_err(|_| ElementError::NonPhysical {
                what: "fan curve coefficients must be finite",
            })?;
        }
        let shutoff_pressure = coeffs[0].abs();
        let mut fan = Self {
            curve: FanCurve::Polynomial(coeffs),
            max_flow: 0.0,
            shutoff_pressure,
            speed: 1.0,
        };
        // Free delivery: the flow where the curve crosses zero pressure rise.
        fan.max_flow = fan.invert_curve(0.0);
        if fan.max_flow <= 0.0 {
            fan.max_flow = 0.1;
        }
        Ok(fan)
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Set the speed multiplier (clamped to [0, 1]); `FanSpeed` actuator target.
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed.clamp(0.0, 1.0);
    }

    fn eval_curve(&self, coeffs: &[f64], q: f64) -> f64 {
        let mut result = 0.0;
        let mut q_pow = 1.0;
        for &c in coeffs {
            result += c * q_pow;
            q_pow *= q;
        }
        result
    }

    fn eval_curve_derivative(&self, coeffs: &[f64], q: f64) -> f64 {
        let mut result = 0.0;
        let mut q_pow = 1.0;
        for (i, &c) in coeffs.iter().enumerate().skip(1) {
            result += (i as f64) * c * q_pow;
            q_pow *= q;
        }
        result
    }

    /// Newton-invert the polynomial curve for the flow at a given pressure
    /// rise. Non-convergence is tolerated: the last iterate is returned.
    fn invert_curve(&self, delta_p: f64) -> f64 {
        let coeffs = match &self.curve {
            FanCurve::Polynomial(c) => c,
            FanCurve::Linear => return self.max_flow * (1.0 - delta_p / self.shutoff_pressure),
        };
        let mut q = if self.max_flow > 0.0 {
            self.max_flow * 0.5
        } else {
            0.05
        };
        for _ in 0..50 {
            let f = self.eval_curve(coeffs, q) - delta_p;
            let fp = self.eval_curve_derivative(coeffs, q);
            if fp.abs() < 1e-20 {
                break;
            }
            let dq = -f / fp;
            q += dq;
            if q < 0.0 {
                q = 0.0;
            }
            if dq.abs() < 1e-12 {
                break;
            }
        }
        q
    }

    pub fn flow(&self, delta_p: f64, density: f64) -> LinkFlow {
        if self.speed < 1e-6 {
            return LinkFlow {
                mass_flow: 0.0,
                derivative: density * 1e-10,
            };
        }

        // Affinity laws: at speed s the rated curve sees ΔP/s² and delivers s·Q.
        let s = self.speed;
        let dp_rated = delta_p / (s * s);

        let (q, dq_dp_mag) = match &self.curve {
            FanCurve::Linear => {
                let q = s * self.max_flow * (1.0 - dp_rated / self.shutoff_pressure);
                (q.max(0.0), self.max_flow / (s * self.shutoff_pressure))
            }
            FanCurve::Polynomial(coeffs) => {
                let q_rated = self.invert_curve(dp_rated);
                let dp_dq = self.eval_curve_derivative(coeffs, q_rated);
                let mag = if dp_dq.abs() > 1e-15 {
                    1.0 / (s * dp_dq.abs())
                } else {
                    1e-10
                };
                ((s * q_rated).max(0.0), mag)
            }
        };

        if q <= 0.0 {
            return LinkFlow {
                mass_flow: 0.0,
                derivative: density * 1e-10,
            };
        }
        LinkFlow {
            mass_flow: density * q,
            derivative: density * dq_dp_mag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_fan_free_delivery_and_shutoff() {
        let fan = Fan::new_linear(0.5, 100.0).unwrap();
        let free = fan.flow(0.0, 1.2);
        assert!((free.mass_flow - 1.2 * 0.5).abs() < 1e-12);
        let shutoff = fan.flow(100.0, 1.2);
        assert_eq!(shutoff.mass_flow, 0.0);
        // Beyond shutoff the fan cannot reverse
        assert_eq!(fan.flow(200.0, 1.2).mass_flow, 0.0);
    }

    #[test]
    fn polynomial_fan_inverts_its_curve() {
        // ΔP = 100 − 400·Q  (same shape as the linear fan)
        let fan = Fan::new_polynomial(vec![100.0, -400.0]).unwrap();
        let r = fan.flow(60.0, 1.2);
        let q = r.mass_flow / 1.2;
        assert!((q - 0.1).abs() < 1e-6);
    }

    #[test]
    fn derivative_never_negative() {
        let fan = Fan::new_linear(0.5, 100.0).unwrap();
        for dp in [-50.0, 0.0, 50.0, 100.0, 150.0] {
            assert!(fan.flow(dp, 1.2).derivative >= 0.0);
        }
    }

    #[test]
    fn speed_scales_delivery() {
        let mut fan = Fan::new_linear(0.5, 100.0).unwrap();
        fan.set_speed(0.5);
        let half = fan.flow(0.0, 1.2).mass_flow;
        assert!((half - 1.2 * 0.25).abs() < 1e-12);
        fan.set_speed(0.0);
        assert_eq!(fan.flow(0.0, 1.2).mass_flow, 0.0);
    }

    #[test]
    fn short_polynomial_rejected() {
        assert!(Fan::new_polynomial(vec![100.0]).is_err());
        assert!(Fan::new_polynomial(vec![100.0, f64::NAN]).is_err());
        assert!(Fan::new_linear(-0.5, 100.0).is_err());
    }
}
