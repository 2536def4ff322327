//! Sensor references into the simulation state.

use mz_core::{LinkId, NodeId};
use serde::{Deserialize, Serialize};

/// What a sensor measures. Resolution against the network happens in the
/// transient driver; this crate only carries the reference and the latest
/// reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SensorKind {
    /// Species concentration (kg/m³) in a zone.
    Concentration { zone: NodeId, species: usize },
    /// Gauge pressure (Pa) at a node.
    Pressure { node: NodeId },
    /// Temperature (K) at a node.
    Temperature { node: NodeId },
    /// Mass flow (kg/s) through a link.
    MassFlow { link: LinkId },
}

/// One sensor with its most recent reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub name: String,
    pub kind: SensorKind,
    /// Written by the driver at the top of each step.
    pub last_reading: f64,
}

impl Sensor {
    pub fn new(name: impl Into<String>, kind: SensorKind) -> Self {
        Self {
            name: name.into(),
            kind,
            last_reading: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mz_core::Id;

    #[test]
    fn reading_starts_at_zero() {
        let s = Sensor::new(
            "co2-room1",
            SensorKind::Concentration {
                zone: Id::from_index(1),
                species: 0,
            },
        );
        assert_eq!(s.last_reading, 0.0);
    }
}
