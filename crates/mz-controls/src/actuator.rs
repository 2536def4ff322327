//! Actuator references: where controller outputs land.

use mz_core::LinkId;
use serde::{Deserialize, Serialize};

/// Which element property the actuator writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActuatorKind {
    /// Damper opening fraction (0..1).
    DamperFraction,
    /// Fan speed multiplier (0..1).
    FanSpeed,
    /// Filter bypass fraction (0 = full filtering, 1 = full bypass).
    FilterBypass,
}

/// An actuator bound to one link's flow element. The driver clones the
/// element, applies the command, and swaps the clone into the link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actuator {
    pub name: String,
    pub kind: ActuatorKind,
    pub link: LinkId,
    /// Last commanded position.
    pub current_value: f64,
}

impl Actuator {
    pub fn new(name: impl Into<String>, kind: ActuatorKind, link: LinkId) -> Self {
        Self {
            name: name.into(),
            kind,
            link,
            current_value: 0.0,
        }
    }
}
