//! Contaminant sources and sinks.

use mz_core::{NodeId, ScheduleId, SpeciesId};
use serde::{Deserialize, Serialize};

use crate::error::{TransportError, TransportResult};

/// How a source's generation term varies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SourceModel {
    /// Fixed generation, modulated only by the schedule.
    Constant,
    /// `G_eff = multiplier · G₀ · exp(−(t − start_time)/time_constant)`.
    ExponentialDecay {
        time_constant: f64,
        start_time: f64,
        multiplier: f64,
    },
    /// Generation scaled by the zone's gauge pressure magnitude:
    /// `G_eff = G₀ · |P_zone|^exponent`.
    PressureDriven { exponent: f64 },
    /// Generation tapering to zero as the zone concentration approaches the
    /// cutoff: `S = G₀ · (1 − C/C_cut)`, stamped implicitly.
    CutoffConcentration { cutoff: f64 },
}

/// A contaminant source/sink bound to one zone and one species.
///
/// The full term is `S = G_eff · schedule(t) − R · C · V`; either half may
/// be zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub zone: NodeId,
    pub species: SpeciesId,
    pub model: SourceModel,
    /// Base generation rate G₀ (kg/s).
    pub generation_rate: f64,
    /// First-order removal coefficient R (1/s).
    pub removal_rate: f64,
    /// Optional modulation schedule; absent means always on.
    pub schedule: Option<ScheduleId>,
}

impl Source {
    /// Constant source, optionally with a first-order removal sink.
    pub fn constant(zone: NodeId, species: SpeciesId, generation_rate: f64) -> Self {
        Self {
            zone,
            species,
            model: SourceModel::Constant,
            generation_rate,
            removal_rate: 0.0,
            schedule: None,
        }
    }

    /// Exponentially decaying release (e.g. a spill evaporating away).
    pub fn exponential_decay(
        zone: NodeId,
        species: SpeciesId,
        generation_rate: f64,
        time_constant: f64,
        start_time: f64,
        multiplier: f64,
    ) -> TransportResult<Self> {
        if time_constant <= 0.0 {
            return Err(TransportError::InvalidArg {
                what: "decay source time constant must be positive",
            });
        }
        Ok(Self {
            zone,
            species,
            model: SourceModel::ExponentialDecay {
                time_constant,
                start_time,
                multiplier,
            },
            generation_rate,
            removal_rate: 0.0,
            schedule: None,
        })
    }

    /// Source tapering to zero at the cutoff concentration.
    pub fn cutoff_concentration(
        zone: NodeId,
        species: SpeciesId,
        generation_rate: f64,
        cutoff: f64,
    ) -> TransportResult<Self> {
        if cutoff <= 0.0 {
            return Err(TransportError::InvalidArg {
                what: "cutoff concentration must be positive",
            });
        }
        Ok(Self {
            zone,
            species,
            model: SourceModel::CutoffConcentration { cutoff },
            generation_rate,
            removal_rate: 0.0,
            schedule: None,
        })
    }

    pub fn with_removal_rate(mut self, removal_rate: f64) -> Self {
        self.removal_rate = removal_rate;
        self
    }

    pub fn with_schedule(mut self, schedule: ScheduleId) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Effective generation rate before schedule modulation, at the end of
    /// the step being assembled.
    pub fn effective_generation(&self, t_next: f64, zone_pressure: f64) -> f64 {
        match self.model {
            SourceModel::Constant | SourceModel::CutoffConcentration { .. } => self.generation_rate,
            SourceModel::ExponentialDecay {
                time_constant,
                start_time,
                multiplier,
            } => {
                if t_next < start_time {
                    0.0
                } else {
                    multiplier
                        * self.generation_rate
                        * (-(t_next - start_time) / time_constant).exp()
                }
            }
            SourceModel::PressureDriven { exponent } => {
                self.generation_rate * zone_pressure.abs().powf(exponent)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mz_core::Id;

    fn ids() -> (NodeId, SpeciesId) {
        (Id::from_index(1), Id::from_index(0))
    }

    #[test]
    fn decay_source_halves_over_time_constant() {
        let (zone, species) = ids();
        let src = Source::exponential_decay(zone, species, 1e-5, 100.0, 0.0, 1.0).unwrap();
        let g0 = src.effective_generation(0.0, 0.0);
        let g1 = src.effective_generation(100.0, 0.0);
        assert!((g0 - 1e-5).abs() < 1e-18);
        assert!((g1 - 1e-5 * (-1.0_f64).exp()).abs() < 1e-18);
    }

    #[test]
    fn decay_source_silent_before_start() {
        let (zone, species) = ids();
        let src = Source::exponential_decay(zone, species, 1e-5, 100.0, 60.0, 1.0).unwrap();
        assert_eq!(src.effective_generation(30.0, 0.0), 0.0);
        assert!(src.effective_generation(60.0, 0.0) > 0.0);
    }

    #[test]
    fn invalid_parameters_rejected() {
        let (zone, species) = ids();
        assert!(Source::exponential_decay(zone, species, 1e-5, 0.0, 0.0, 1.0).is_err());
        assert!(Source::cutoff_concentration(zone, species, 1e-5, 0.0).is_err());
    }

    #[test]
    fn pressure_driven_scales_with_gauge_pressure() {
        let (zone, species) = ids();
        let src = Source {
            zone,
            species,
            model: SourceModel::PressureDriven { exponent: 0.5 },
            generation_rate: 1e-6,
            removal_rate: 0.0,
            schedule: None,
        };
        let low = src.effective_generation(0.0, 4.0);
        let high = src.effective_generation(0.0, 16.0);
        assert!((high / low - 2.0).abs() < 1e-12);
    }
}
