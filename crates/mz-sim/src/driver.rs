//! The coupled transient loop.

use std::collections::HashMap;

use mz_airflow::{AirflowResult, AirflowSolver, SolveMethod};
use mz_controls::{ActuatorKind, ControlSystem, SensorKind};
use mz_core::units::constants::{M_AIR, R_AIR};
use mz_core::{LinkId, NodeId, Schedule, ScheduleId};
use mz_network::Network;
use mz_transport::{ReactionNetwork, Source, Species, TransportSolver, TransportStep};

use crate::error::{SimError, SimResult};
use crate::hvac::AirHandlingSystem;
use crate::occupant::Occupant;
use crate::weather::WeatherSeries;
use crate::wpc::{WpcConcentrations, WpcPressures};

/// Cap on the density/airflow fixed-point iterations per step.
const MAX_COUPLING_ITER: usize = 5;

/// Relative density change below which the coupling loop stops.
const DENSITY_TOL: f64 = 1e-4;

/// Time comparison slack for the stepping loop and output cadence.
const TIME_EPS: f64 = 1e-10;

/// Transient run configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransientConfig {
    /// Start time (s).
    pub start_time: f64,
    /// End time (s).
    pub end_time: f64,
    /// Fixed step (s); the final step is truncated to land on `end_time`.
    pub time_step: f64,
    /// Snapshot cadence (s).
    pub output_interval: f64,
    /// Globalisation used by the airflow solver.
    pub airflow_method: SolveMethod,
}

impl Default for TransientConfig {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            end_time: 3600.0,
            time_step: 60.0,
            output_interval: 60.0,
            airflow_method: SolveMethod::TrustRegion,
        }
    }
}

impl TransientConfig {
    fn validate(&self) -> SimResult<()> {
        if self.time_step <= 0.0 {
            return Err(SimError::InvalidArg {
                what: "time step must be positive",
            });
        }
        if self.end_time < self.start_time {
            return Err(SimError::InvalidArg {
                what: "end time must not precede start time",
            });
        }
        if self.output_interval <= 0.0 {
            return Err(SimError::InvalidArg {
                what: "output interval must be positive",
            });
        }
        Ok(())
    }
}

/// One recorded state.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub time: f64,
    pub airflow: AirflowResult,
    /// Absent when the model carries no species.
    pub contaminant: Option<TransportStep>,
}

/// Outcome of a transient run. `completed` is false only after cooperative
/// cancellation; the history built so far is returned intact either way.
#[derive(Debug, Clone, Default)]
pub struct TransientResult {
    pub completed: bool,
    pub history: Vec<Snapshot>,
}

type ProgressCallback = Box<dyn FnMut(f64, f64) -> bool>;

/// Transient simulation driver.
///
/// Owns every time-varying binding; borrows the network mutably for the
/// duration of [`TransientSimulation::run`]. Within a step the order is
/// fixed: boundary conditions → controls → airflow → contaminants (+ density
/// coupling) → occupants → snapshot → progress callback.
pub struct TransientSimulation {
    config: TransientConfig,
    species: Vec<Species>,
    sources: Vec<Source>,
    schedules: HashMap<ScheduleId, Schedule>,
    reactions: ReactionNetwork,
    initial_concentrations: Vec<(usize, usize, f64)>,
    controls: Option<ControlSystem>,
    occupants: Vec<Occupant>,
    zone_temp_schedules: HashMap<NodeId, ScheduleId>,
    weather: Option<WeatherSeries>,
    wpc_pressures: Option<(WpcPressures, Vec<LinkId>)>,
    wpc_concentrations: Option<(WpcConcentrations, Vec<LinkId>)>,
    hvac: Vec<AirHandlingSystem>,
    progress: Option<ProgressCallback>,
}

impl TransientSimulation {
    pub fn new(config: TransientConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            species: Vec::new(),
            sources: Vec::new(),
            schedules: HashMap::new(),
            reactions: ReactionNetwork::default(),
            initial_concentrations: Vec::new(),
            controls: None,
            occupants: Vec::new(),
            zone_temp_schedules: HashMap::new(),
            weather: None,
            wpc_pressures: None,
            wpc_concentrations: None,
            hvac: Vec::new(),
            progress: None,
        })
    }

    pub fn set_species(&mut self, species: Vec<Species>) {
        self.species = species;
    }

    pub fn set_sources(&mut self, sources: Vec<Source>) {
        self.sources = sources;
    }

    pub fn set_schedules(&mut self, schedules: HashMap<ScheduleId, Schedule>) {
        self.schedules = schedules;
    }

    pub fn set_reactions(&mut self, reactions: ReactionNetwork) {
        self.reactions = reactions;
    }

    /// Non-zero starting concentration for one zone/species pair.
    pub fn set_initial_concentration(&mut self, zone_idx: usize, species_idx: usize, conc: f64) {
        self.initial_concentrations.push((zone_idx, species_idx, conc));
    }

    pub fn set_controls(&mut self, controls: ControlSystem) {
        self.controls = Some(controls);
    }

    pub fn set_occupants(&mut self, occupants: Vec<Occupant>) {
        self.occupants = occupants;
    }

    /// Drive a zone's temperature from a schedule (values in K).
    pub fn set_zone_temperature_schedule(&mut self, node: NodeId, schedule: ScheduleId) {
        self.zone_temp_schedules.insert(node, schedule);
    }

    pub fn set_weather(&mut self, weather: WeatherSeries) {
        self.weather = Some(weather);
    }

    /// Bind per-opening WPC pressures; `links[opening]` names each opening's
    /// link, whose ambient-side node receives the pressure.
    pub fn bind_wpc_pressures(&mut self, series: WpcPressures, links: Vec<LinkId>) -> SimResult<()> {
        if links.len() != series.num_openings() {
            return Err(SimError::Inconsistent {
                what: format!(
                    "WPC pressure series has {} openings but {} links were bound",
                    series.num_openings(),
                    links.len()
                ),
            });
        }
        self.wpc_pressures = Some((series, links));
        Ok(())
    }

    /// Bind per-opening WPC ambient concentrations (overrides the ambient
    /// concentration seen through each bound link).
    pub fn bind_wpc_concentrations(
        &mut self,
        series: WpcConcentrations,
        links: Vec<LinkId>,
    ) -> SimResult<()> {
        if links.len() != series.num_openings() {
            return Err(SimError::Inconsistent {
                what: format!(
                    "WPC concentration series has {} openings but {} links were bound",
                    series.num_openings(),
                    links.len()
                ),
            });
        }
        self.wpc_concentrations = Some((series, links));
        Ok(())
    }

    pub fn set_hvac(&mut self, systems: Vec<AirHandlingSystem>) {
        self.hvac = systems;
    }

    /// Cooperative progress hook `(t, end_time) -> keep_going`. Returning
    /// false cancels the run at the current step.
    pub fn set_progress_callback(&mut self, callback: impl FnMut(f64, f64) -> bool + 'static) {
        self.progress = Some(Box::new(callback));
    }

    pub fn occupants(&self) -> &[Occupant] {
        &self.occupants
    }

    /// Run the transient simulation to completion or cancellation.
    pub fn run(&mut self, network: &mut Network) -> TransientResult {
        let mut result = TransientResult::default();

        let airflow = AirflowSolver::new(self.config.airflow_method);
        let has_contaminants = !self.species.is_empty();

        let mut transport = TransportSolver::new(self.species.clone());
        transport.set_sources(self.sources.clone());
        transport.set_schedules(self.schedules.clone());
        transport.set_reactions(self.reactions.clone());
        transport.initialize(network);
        for &(zone, spec, conc) in &self.initial_concentrations {
            transport.set_concentration(zone, spec, conc);
        }
        let num_species = self.species.len();
        for occ in &mut self.occupants {
            occ.init_exposure(num_species);
        }

        let mut t = self.config.start_time;
        let mut next_output = self.config.start_time;

        // Initial state at t = start is always part of the history.
        let mut air_result = airflow.solve(network);
        result.history.push(Snapshot {
            time: t,
            airflow: air_result.clone(),
            contaminant: has_contaminants.then(|| TransportStep {
                time: t,
                concentrations: transport.concentrations().clone(),
            }),
        });
        next_output += self.config.output_interval;

        while t < self.config.end_time - TIME_EPS {
            let dt = self.config.time_step.min(self.config.end_time - t);
            let t_next = t + dt;

            // 1. Scheduled zone temperatures.
            for (&node_id, &sched_id) in &self.zone_temp_schedules {
                if let (Some(idx), Some(sched)) =
                    (network.node_index(node_id), self.schedules.get(&sched_id))
                {
                    network.node_mut(idx).temperature = sched.value(t_next);
                }
            }

            // 2. Weather: ambient conditions and Ambient node state.
            if let Some(weather) = &self.weather {
                let wx = weather.interpolate(t_next);
                let ambient = network.ambient_mut();
                ambient.temperature = wx.temperature;
                ambient.pressure = wx.pressure;
                ambient.wind_speed = wx.wind_speed;
                ambient.wind_direction = wx.wind_direction;
                for i in 0..network.node_count() {
                    if network.node(i).is_known_pressure() {
                        let node = network.node_mut(i);
                        node.temperature = wx.temperature;
                        node.update_density(wx.pressure);
                    }
                }
            }

            // 3. Wind pressure folded into Ambient node pressures.
            let ambient = network.ambient();
            if ambient.wind_speed > 0.0 {
                for i in 0..network.node_count() {
                    if network.node(i).is_known_pressure() {
                        let pw = network
                            .node(i)
                            .wind_pressure(ambient.wind_speed, ambient.wind_direction);
                        network.node_mut(i).pressure = pw;
                    }
                }
            }

            // 4. Per-opening WPC pressures override the Cp-derived values.
            if let Some((series, links)) = &self.wpc_pressures {
                let pressures = series.interpolate(t_next);
                for (opening, &link_id) in links.iter().enumerate() {
                    let Some(link_idx) = network.link_index(link_id) else {
                        continue;
                    };
                    let link = network.link(link_idx);
                    let ambient_side = if network.node(link.from).is_known_pressure() {
                        Some(link.from)
                    } else if network.node(link.to).is_known_pressure() {
                        Some(link.to)
                    } else {
                        None
                    };
                    if let Some(node_idx) = ambient_side {
                        network.node_mut(node_idx).pressure = pressures[opening];
                    }
                }
            }

            // 5. Control pipeline: sensors → logic → controllers → actuators.
            if let Some(controls) = &mut self.controls {
                for sensor in &mut controls.sensors {
                    sensor.last_reading = match sensor.kind {
                        SensorKind::Concentration { zone, species } => network
                            .node_index(zone)
                            .map(|zi| transport.concentrations()[(zi, species)])
                            .unwrap_or(0.0),
                        SensorKind::Pressure { node } => network
                            .node_index(node)
                            .map(|i| network.node(i).pressure)
                            .unwrap_or(0.0),
                        SensorKind::Temperature { node } => network
                            .node_index(node)
                            .map(|i| network.node(i).temperature)
                            .unwrap_or(0.0),
                        SensorKind::MassFlow { link } => network
                            .link_index(link)
                            .map(|i| network.link(i).mass_flow())
                            .unwrap_or(0.0),
                    };
                }

                for command in controls.run_step(dt) {
                    let actuator = &controls.actuators[command.actuator];
                    let Some(link_idx) = network.link_index(actuator.link) else {
                        continue;
                    };
                    // Clone-modify-replace keeps element swaps atomic.
                    let mut element = network.link(link_idx).element().clone();
                    let applied = match actuator.kind {
                        ActuatorKind::DamperFraction => element.set_fraction(command.value),
                        ActuatorKind::FanSpeed => element.set_speed(command.value),
                        ActuatorKind::FilterBypass => element.set_bypass(command.value),
                    };
                    if applied {
                        network.link_mut(link_idx).replace_element(element);
                    }
                }
            }

            // 6. Quasi-steady airflow.
            air_result = airflow.solve(network);

            // 7. Contaminant transport with dynamic sources and, for
            //    non-trace species, the density fixed point.
            let mut transport_step = None;
            if has_contaminants {
                transport.clear_extra_sources();
                let mut dynamic = Vec::new();
                for system in &self.hvac {
                    dynamic.extend(system.dynamic_sources(
                        network,
                        transport.concentrations(),
                        &self.species,
                        &self.schedules,
                        t_next,
                    ));
                }
                for occ in &self.occupants {
                    if let (Some(zone_idx), Some(species_id)) = (occ.zone, occ.co2_species) {
                        dynamic.push(Source::constant(
                            network.node(zone_idx).id,
                            species_id,
                            occ.co2_generation_rate(),
                        ));
                    }
                }
                transport.add_extra_sources(dynamic);

                transport.clear_link_ambient_conc();
                if let Some((series, links)) = &self.wpc_concentrations {
                    let conc = series.interpolate(t_next);
                    for (opening, &link_id) in links.iter().enumerate() {
                        if let Some(link_idx) = network.link_index(link_id) {
                            transport.set_link_ambient_conc(link_idx, conc[opening].clone());
                        }
                    }
                }

                let step = transport.step(network, t, dt);

                if self.species.iter().any(|s| !s.is_trace) {
                    air_result = self.density_coupling(network, &airflow, &transport);
                }
                transport_step = Some(step);
            }

            // 8. Occupant movement and exposure.
            for occ in &mut self.occupants {
                if let Some(sched) = occ.schedule.and_then(|id| self.schedules.get(&id)) {
                    let target = sched.value(t_next).round();
                    occ.zone = if target < 0.0 {
                        None
                    } else {
                        let idx = target as usize;
                        (idx < network.node_count()).then_some(idx)
                    };
                }
                if let Some(zone_idx) = occ.zone {
                    let row: Vec<f64> = (0..num_species)
                        .map(|k| transport.concentrations()[(zone_idx, k)])
                        .collect();
                    occ.update_exposure(&row, t, dt);
                }
            }

            // 9. Advance and record.
            t = t_next;
            if t >= next_output - TIME_EPS || t >= self.config.end_time - TIME_EPS {
                result.history.push(Snapshot {
                    time: t,
                    airflow: air_result.clone(),
                    contaminant: transport_step,
                });
                next_output += self.config.output_interval;
            }

            // 10. Cooperative cancellation.
            if let Some(progress) = &mut self.progress {
                if !progress(t, self.config.end_time) {
                    return result;
                }
            }
        }

        result.completed = true;
        result
    }

    /// Bounded fixed point between mixture density and airflow.
    ///
    /// Mass fractions of the non-trace species shift each zone's effective
    /// gas constant, `R_mix = R_air·(1 + Σ w_k·(M_air/M_k − 1))`; the
    /// airflow is re-solved until densities settle (or the iteration cap).
    fn density_coupling(
        &self,
        network: &mut Network,
        airflow: &AirflowSolver,
        transport: &TransportSolver,
    ) -> AirflowResult {
        let mut air_result = AirflowResult::default();
        for _ in 0..MAX_COUPLING_ITER {
            let rho_prev: Vec<f64> = network.nodes().iter().map(|n| n.density).collect();

            for i in 0..network.node_count() {
                if network.node(i).is_known_pressure() {
                    continue;
                }
                let mut factor = 1.0;
                for (k, spec) in self.species.iter().enumerate() {
                    if spec.is_trace || spec.molar_mass <= 0.0 {
                        continue;
                    }
                    let w = transport.concentrations()[(i, k)] / rho_prev[i].max(1e-12);
                    factor += w * (M_AIR / spec.molar_mass - 1.0);
                }
                // A contaminated zone is still mostly air.
                network.node_mut(i).gas_constant = R_AIR * factor.clamp(0.1, 10.0);
            }

            air_result = airflow.solve(network);

            let max_rel_change = network
                .nodes()
                .iter()
                .zip(&rho_prev)
                .map(|(n, &prev)| (n.density - prev).abs() / prev.max(1e-12))
                .fold(0.0, f64::max);
            if max_rel_change < DENSITY_TOL {
                break;
            }
        }
        air_result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = TransientConfig::default();
        assert_eq!(config.start_time, 0.0);
        assert_eq!(config.end_time, 3600.0);
        assert_eq!(config.time_step, 60.0);
        assert_eq!(config.output_interval, 60.0);
    }

    #[test]
    fn invalid_configs_rejected() {
        let mut config = TransientConfig::default();
        config.time_step = 0.0;
        assert!(TransientSimulation::new(config).is_err());

        let mut config = TransientConfig::default();
        config.end_time = -10.0;
        assert!(TransientSimulation::new(config).is_err());

        let mut config = TransientConfig::default();
        config.output_interval = 0.0;
        assert!(TransientSimulation::new(config).is_err());
    }
}
