//! Occupants: exposure tracking and breathing CO₂ generation.

use serde::{Deserialize, Serialize};

use mz_core::{ScheduleId, SpeciesId};

/// Exhaled-air CO₂ mass fraction used for occupant generation.
// Hard-coded for parity with the reference engine; review candidate.
pub const EXHALED_CO2_FRACTION: f64 = 0.04;

/// Air density assumed when converting breathing volume to mass.
// Hard-coded for parity with the reference engine; review candidate.
pub const BREATH_AIR_DENSITY: f64 = 1.2;

/// Per-species exposure statistics for one occupant.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpeciesExposure {
    /// ∫ breathing_rate · C dt (kg inhaled).
    pub cumulative_dose: f64,
    /// Highest concentration encountered (kg/m³).
    pub peak_concentration: f64,
    /// Time of the peak (s).
    pub peak_time: f64,
    /// ∫ C dt, for the time-weighted mean.
    pub concentration_integral: f64,
    /// Occupied time accumulated so far (s).
    pub exposed_time: f64,
}

impl SpeciesExposure {
    /// Time-weighted mean concentration over the occupied period.
    pub fn time_weighted_mean(&self) -> f64 {
        if self.exposed_time > 0.0 {
            self.concentration_integral / self.exposed_time
        } else {
            0.0
        }
    }
}

/// One tracked occupant.
///
/// The zone-occupancy schedule's value is rounded to the nearest zone index
/// each step; a negative value means the occupant is out of the building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occupant {
    pub name: String,
    /// Dense node index currently occupied; `None` while away.
    pub zone: Option<usize>,
    /// Breathing volume flow (m³/s).
    pub breathing_rate: f64,
    /// Zone-occupancy schedule.
    pub schedule: Option<ScheduleId>,
    /// Species charged with exhaled CO₂; `None` disables generation.
    pub co2_species: Option<SpeciesId>,
    /// Per-species exposure, indexed like the solver's species list.
    pub exposure: Vec<SpeciesExposure>,
}

impl Occupant {
    pub fn new(name: impl Into<String>, zone: usize, breathing_rate: f64) -> Self {
        Self {
            name: name.into(),
            zone: Some(zone),
            breathing_rate,
            schedule: None,
            co2_species: None,
            exposure: Vec::new(),
        }
    }

    pub fn with_schedule(mut self, schedule: ScheduleId) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn generating_co2(mut self, species: SpeciesId) -> Self {
        self.co2_species = Some(species);
        self
    }

    /// Size the exposure table for `num_species` species.
    pub fn init_exposure(&mut self, num_species: usize) {
        self.exposure = vec![SpeciesExposure::default(); num_species];
    }

    /// CO₂ mass generation while present:
    /// `breathing_rate · ρ_air · exhaled fraction` (kg/s).
    pub fn co2_generation_rate(&self) -> f64 {
        self.breathing_rate * BREATH_AIR_DENSITY * EXHALED_CO2_FRACTION
    }

    /// Accumulate exposure over `[t, t+dt]` from the occupant's current
    /// zone concentrations (one value per species). No-op while away.
    pub fn update_exposure(&mut self, zone_concentrations: &[f64], t: f64, dt: f64) {
        if self.zone.is_none() {
            return;
        }
        for (k, exposure) in self.exposure.iter_mut().enumerate() {
            let c = zone_concentrations.get(k).copied().unwrap_or(0.0);
            exposure.cumulative_dose += self.breathing_rate * c * dt;
            exposure.concentration_integral += c * dt;
            exposure.exposed_time += dt;
            if c > exposure.peak_concentration {
                exposure.peak_concentration = c;
                exposure.peak_time = t + dt;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dose_accumulates_across_zone_moves() {
        let mut occ = Occupant::new("Worker", 0, 1.2e-4);
        occ.init_exposure(1);

        occ.update_exposure(&[0.001], 0.0, 60.0);
        let dose0 = 1.2e-4 * 0.001 * 60.0;
        assert!((occ.exposure[0].cumulative_dose - dose0).abs() < 1e-12);

        occ.zone = Some(1);
        occ.update_exposure(&[0.005], 60.0, 60.0);
        let total = dose0 + 1.2e-4 * 0.005 * 60.0;
        assert!((occ.exposure[0].cumulative_dose - total).abs() < 1e-12);
        assert_eq!(occ.exposure[0].peak_concentration, 0.005);
        assert_eq!(occ.exposure[0].peak_time, 120.0);
    }

    #[test]
    fn away_occupant_accumulates_nothing() {
        let mut occ = Occupant::new("Visitor", 0, 1.2e-4);
        occ.init_exposure(1);
        occ.zone = None;
        occ.update_exposure(&[0.01], 0.0, 600.0);
        assert_eq!(occ.exposure[0].cumulative_dose, 0.0);
        assert_eq!(occ.exposure[0].exposed_time, 0.0);
    }

    #[test]
    fn time_weighted_mean() {
        let mut occ = Occupant::new("Worker", 0, 1.0e-4);
        occ.init_exposure(1);
        occ.update_exposure(&[2.0], 0.0, 10.0);
        occ.update_exposure(&[4.0], 10.0, 10.0);
        assert!((occ.exposure[0].time_weighted_mean() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn co2_generation_uses_fixed_constants() {
        let occ = Occupant::new("Worker", 0, 1.2e-4);
        assert!((occ.co2_generation_rate() - 1.2e-4 * 1.2 * 0.04).abs() < 1e-18);
    }
}
