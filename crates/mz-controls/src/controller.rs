//! Incremental PI controller with deadband and anti-windup.

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};

/// PI controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiController {
    /// Target value for the measured signal.
    pub setpoint: f64,
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain (1/s).
    pub ki: f64,
    /// No action while |error| is below this band.
    pub deadband: f64,
    /// Output clamp range.
    pub out_min: f64,
    pub out_max: f64,
}

impl PiController {
    pub fn new(setpoint: f64, kp: f64, ki: f64) -> ControlResult<Self> {
        Self::with_limits(setpoint, kp, ki, 0.0, 0.0, 1.0)
    }

    pub fn with_limits(
        setpoint: f64,
        kp: f64,
        ki: f64,
        deadband: f64,
        out_min: f64,
        out_max: f64,
    ) -> ControlResult<Self> {
        if deadband < 0.0 {
            return Err(ControlError::InvalidArg {
                what: "deadband must be non-negative",
            });
        }
        if out_min >= out_max {
            return Err(ControlError::InvalidArg {
                what: "out_min must be less than out_max",
            });
        }
        Ok(Self {
            setpoint,
            kp,
            ki,
            deadband,
            out_min,
            out_max,
        })
    }

    /// Advance one sample.
    ///
    /// The anti-windup is the one-step back-out of the saturating sample's
    /// integration (`integral -= e·dt`), not an integral clamp; downstream
    /// behaviour depends on that exact form.
    pub fn update(&self, state: &PiState, measurement: f64, dt: f64) -> (PiState, f64) {
        let mut error = self.setpoint - measurement;
        if error.abs() < self.deadband {
            error = 0.0;
        }

        let mut integral = state.integral + error * dt;
        let raw = self.kp * error + self.ki * integral;
        let output = raw.clamp(self.out_min, self.out_max);

        if output != raw {
            integral -= error * dt;
        }

        (
            PiState {
                integral,
                prev_error: error,
                output,
            },
            output,
        )
    }
}

/// Mutable controller state carried between samples.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PiState {
    pub integral: f64,
    pub prev_error: f64,
    pub output: f64,
}
