//! Simple air-handling systems.
//!
//! An AHS mixes outdoor air with recirculated return air and distributes the
//! supply across its zones. It enters the contaminant balance as per-step
//! dynamic sources: supply injection at the mixed concentration and
//! first-order extraction at the return grilles.

use std::collections::HashMap;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use mz_core::{Schedule, ScheduleId};
use mz_network::Network;
use mz_transport::{Source, Species};

/// Share of an AHS's supply or return assigned to one zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneConnection {
    pub zone: mz_core::NodeId,
    /// Fraction of the system total handled by this zone.
    pub fraction: f64,
}

/// A constant-volume air handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirHandlingSystem {
    pub name: String,
    /// Design flows (m³/s).
    pub supply_flow: f64,
    pub return_flow: f64,
    pub outdoor_air_flow: f64,
    pub exhaust_flow: f64,
    /// Supply air temperature (K).
    pub supply_temperature: f64,
    pub supply_zones: Vec<ZoneConnection>,
    pub return_zones: Vec<ZoneConnection>,
    /// Modulates the outdoor-air fraction (economizer behaviour).
    pub outdoor_air_schedule: Option<ScheduleId>,
    /// Modulates the supply flow.
    pub supply_flow_schedule: Option<ScheduleId>,
}

impl AirHandlingSystem {
    pub fn new(name: impl Into<String>, supply: f64, ret: f64, outdoor: f64, exhaust: f64) -> Self {
        Self {
            name: name.into(),
            supply_flow: supply,
            return_flow: ret,
            outdoor_air_flow: outdoor,
            exhaust_flow: exhaust,
            supply_temperature: 295.15,
            supply_zones: Vec::new(),
            return_zones: Vec::new(),
            outdoor_air_schedule: None,
            supply_flow_schedule: None,
        }
    }

    /// Design outdoor-air fraction of the supply stream.
    pub fn outdoor_air_fraction(&self) -> f64 {
        if self.supply_flow <= 0.0 {
            0.0
        } else {
            self.outdoor_air_flow / self.supply_flow
        }
    }

    pub fn recirculated_flow(&self) -> f64 {
        self.supply_flow - self.outdoor_air_flow
    }

    /// Supply and return should match within tolerance for a balanced system.
    pub fn is_balanced(&self, tolerance: f64) -> bool {
        (self.supply_flow - self.return_flow).abs() < tolerance
    }

    /// Build this step's dynamic contaminant sources.
    ///
    /// Supply concentration per species is
    /// `OA·C_outdoor + (1−OA)·Σ frac·C_return`; each supply zone receives
    /// its share as a constant generation, each return zone loses air at a
    /// first-order removal rate `Q_return_zone / V_zone`.
    pub fn dynamic_sources(
        &self,
        network: &Network,
        concentrations: &DMatrix<f64>,
        species: &[Species],
        schedules: &HashMap<ScheduleId, Schedule>,
        t: f64,
    ) -> Vec<Source> {
        let schedule_value = |id: Option<ScheduleId>| -> f64 {
            id.and_then(|s| schedules.get(&s))
                .map(|s| s.value(t))
                .unwrap_or(1.0)
        };

        let supply_flow = self.supply_flow * schedule_value(self.supply_flow_schedule);
        if supply_flow <= 0.0 {
            return Vec::new();
        }
        let oa = (self.outdoor_air_fraction() * schedule_value(self.outdoor_air_schedule))
            .clamp(0.0, 1.0);
        let return_flow = self.return_flow * schedule_value(self.supply_flow_schedule);

        let mut sources = Vec::new();
        for (k, spec) in species.iter().enumerate() {
            // Flow-weighted return concentration.
            let mut c_return = 0.0;
            let mut frac_total = 0.0;
            for conn in &self.return_zones {
                if let Some(zone_idx) = network.node_index(conn.zone) {
                    c_return += conn.fraction * concentrations[(zone_idx, k)];
                    frac_total += conn.fraction;
                }
            }
            if frac_total > 0.0 {
                c_return /= frac_total;
            }

            let c_supply = oa * spec.outdoor_conc + (1.0 - oa) * c_return;

            for conn in &self.supply_zones {
                let q_zone = supply_flow * conn.fraction;
                if q_zone <= 0.0 {
                    continue;
                }
                sources.push(Source::constant(conn.zone, spec.id, q_zone * c_supply));
            }

            for conn in &self.return_zones {
                let Some(zone_idx) = network.node_index(conn.zone) else {
                    continue;
                };
                let volume = network.node(zone_idx).volume;
                if volume <= 0.0 {
                    continue;
                }
                let q_zone = return_flow * conn.fraction;
                if q_zone <= 0.0 {
                    continue;
                }
                sources.push(
                    Source::constant(conn.zone, spec.id, 0.0)
                        .with_removal_rate(q_zone / volume),
                );
            }
        }
        sources
    }
}
