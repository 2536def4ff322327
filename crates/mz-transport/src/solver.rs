//! Implicit-Euler contaminant solver.

use std::collections::HashMap;

use log::warn;
use nalgebra::{DMatrix, DVector};

use mz_core::{Schedule, ScheduleId};
use mz_network::Network;

use crate::reaction::ReactionNetwork;
use crate::source::{Source, SourceModel};
use crate::species::Species;

/// Concentration state after one transport step.
#[derive(Debug, Clone)]
pub struct TransportStep {
    /// Simulation time at the end of the step (s).
    pub time: f64,
    /// `concentrations[(zone, species)]` in kg/m³.
    pub concentrations: DMatrix<f64>,
}

/// Advances zone concentrations with backward Euler over the airflow
/// solver's cached link flows.
///
/// The solver borrows the network immutably during [`TransportSolver::step`];
/// it owns the concentration matrix and all source/schedule bindings.
/// Dynamic per-step sources (HVAC supply, occupants) are merged through
/// [`TransportSolver::add_extra_sources`] and cleared by the driver each
/// step.
#[derive(Debug, Clone)]
pub struct TransportSolver {
    species: Vec<Species>,
    sources: Vec<Source>,
    extra_sources: Vec<Source>,
    schedules: HashMap<ScheduleId, Schedule>,
    reactions: ReactionNetwork,
    /// zones × species, kg/m³.
    concentrations: DMatrix<f64>,
    /// Per-link ambient-side concentration overrides (from WPC data),
    /// one value per species; keyed by dense link index.
    link_ambient_conc: HashMap<usize, Vec<f64>>,
}

impl TransportSolver {
    pub fn new(species: Vec<Species>) -> Self {
        Self {
            species,
            sources: Vec::new(),
            extra_sources: Vec::new(),
            schedules: HashMap::new(),
            reactions: ReactionNetwork::default(),
            concentrations: DMatrix::zeros(0, 0),
            link_ambient_conc: HashMap::new(),
        }
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

    /// Merge per-step dynamic sources (HVAC, occupants).
    pub fn add_extra_sources(&mut self, sources: Vec<Source>) {
        self.extra_sources.extend(sources);
    }

    pub fn clear_extra_sources(&mut self) {
        self.extra_sources.clear();
    }

    /// Override the ambient-side concentration seen through one link
    /// (per-opening WPC contaminant data). Takes precedence over the ambient
    /// zone's own concentration for that link only.
    pub fn set_link_ambient_conc(&mut self, link_idx: usize, per_species: Vec<f64>) {
        self.link_ambient_conc.insert(link_idx, per_species);
    }

    pub fn clear_link_ambient_conc(&mut self) {
        self.link_ambient_conc.clear();
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub fn num_species(&self) -> usize {
        self.species.len()
    }

    pub fn concentrations(&self) -> &DMatrix<f64> {
        &self.concentrations
    }

    /// Override an initial concentration (ignored for indices out of range).
    pub fn set_concentration(&mut self, zone_idx: usize, species_idx: usize, conc: f64) {
        if zone_idx < self.concentrations.nrows() && species_idx < self.concentrations.ncols() {
            self.concentrations[(zone_idx, species_idx)] = conc;
        }
    }

    /// Size the concentration matrix to the network and pin Ambient zones to
    /// the outdoor background. Non-Ambient zones start at zero unless
    /// overridden afterwards.
    pub fn initialize(&mut self, network: &Network) {
        let zones = network.node_count();
        let ns = self.species.len();
        self.concentrations = DMatrix::zeros(zones, ns);
        self.reset_ambient(network);
    }

    /// One backward-Euler step over `[t, t + dt]`.
    pub fn step(&mut self, network: &Network, t: f64, dt: f64) -> TransportStep {
        let ns = self.species.len();
        if ns == 0 {
            return TransportStep {
                time: t + dt,
                concentrations: self.concentrations.clone(),
            };
        }

        let (unknown_map, nu) = unknown_zone_map(network);
        if nu > 0 {
            if self.reactions.is_empty() {
                for spec_idx in 0..ns {
                    self.solve_species(network, &unknown_map, nu, spec_idx, t, dt);
                }
            } else {
                self.solve_coupled(network, &unknown_map, nu, t, dt);
            }
        }

        self.reset_ambient(network);

        TransportStep {
            time: t + dt,
            concentrations: self.concentrations.clone(),
        }
    }

    fn reset_ambient(&mut self, network: &Network) {
        for (i, node) in network.nodes().iter().enumerate() {
            if node.is_known_pressure() {
                for (k, spec) in self.species.iter().enumerate() {
                    self.concentrations[(i, k)] = spec.outdoor_conc;
                }
            }
        }
    }

    fn schedule_value(&self, schedule: Option<ScheduleId>, t: f64) -> f64 {
        match schedule.and_then(|id| self.schedules.get(&id)) {
            Some(s) => s.value(t),
            None => 1.0,
        }
    }

    /// Stamp one species' implicit system into `a`/`b` at a row/column
    /// offset (0 for the per-species path, `spec_idx · nu` when coupled).
    #[allow(clippy::too_many_arguments)]
    fn assemble_species(
        &self,
        network: &Network,
        unknown_map: &[Option<usize>],
        spec_idx: usize,
        t: f64,
        dt: f64,
        a: &mut DMatrix<f64>,
        b: &mut DVector<f64>,
        offset: usize,
    ) {
        let spec = &self.species[spec_idx];

        // Storage, decay.
        for (i, node) in network.nodes().iter().enumerate() {
            let Some(eq) = unknown_map[i] else { continue };
            let volume = effective_volume(node.volume);

            a[(offset + eq, offset + eq)] += volume / dt;
            b[offset + eq] += volume / dt * self.concentrations[(i, spec_idx)];

            if spec.decay_rate > 0.0 {
                a[(offset + eq, offset + eq)] += spec.decay_rate * volume;
            }
        }

        // Advective exchange: donor-upwinded volumetric flows from the
        // cached airflow solution.
        for (link_idx, link) in network.links().iter().enumerate() {
            let mass_flow = link.mass_flow();
            let (donor, receiver, q) = if mass_flow > 0.0 {
                let rho = network.node(link.from).density;
                (link.from, link.to, mass_flow / rho)
            } else if mass_flow < 0.0 {
                let rho = network.node(link.to).density;
                (link.to, link.from, -mass_flow / rho)
            } else {
                continue;
            };

            let donor_temp = network.node(donor).temperature;
            let penetration = link.element().penetration(spec_idx, q, donor_temp);

            if let Some(d_eq) = unknown_map[donor] {
                // Outflow carries the donor's full concentration away.
                a[(offset + d_eq, offset + d_eq)] += q;
                if let Some(r_eq) = unknown_map[receiver] {
                    a[(offset + r_eq, offset + d_eq)] -= q * penetration;
                }
            } else if let Some(r_eq) = unknown_map[receiver] {
                // Ambient donor: known concentration goes on the RHS,
                // per-link WPC override first.
                let c_donor = self
                    .link_ambient_conc
                    .get(&link_idx)
                    .and_then(|v| v.get(spec_idx).copied())
                    .unwrap_or(self.concentrations[(donor, spec_idx)]);
                b[offset + r_eq] += q * penetration * c_donor;
            }
        }

        // Sources and sinks, static and dynamic alike.
        let t_next = t + dt;
        for src in self.sources.iter().chain(&self.extra_sources) {
            if src.species != spec.id {
                continue;
            }
            let Some(zone_idx) = network.node_index(src.zone) else {
                continue;
            };
            let Some(eq) = unknown_map[zone_idx] else {
                continue;
            };
            let node = network.node(zone_idx);
            let volume = effective_volume(node.volume);

            let sched = self.schedule_value(src.schedule, t_next);
            let generation = src.effective_generation(t_next, node.pressure) * sched;
            b[offset + eq] += generation;

            if let SourceModel::CutoffConcentration { cutoff } = src.model {
                // S = G·(1 − C/C_cut): the concentration-dependent half goes
                // on the diagonal for stability.
                a[(offset + eq, offset + eq)] += generation / cutoff;
            }

            if src.removal_rate > 0.0 {
                a[(offset + eq, offset + eq)] += src.removal_rate * volume;
            }
        }
    }

    fn solve_species(
        &mut self,
        network: &Network,
        unknown_map: &[Option<usize>],
        nu: usize,
        spec_idx: usize,
        t: f64,
        dt: f64,
    ) {
        let mut a = DMatrix::zeros(nu, nu);
        let mut b = DVector::zeros(nu);
        self.assemble_species(network, unknown_map, spec_idx, t, dt, &mut a, &mut b, 0);

        let Some(c_new) = a.col_piv_qr().solve(&b) else {
            warn!(
                "transport: singular system for species '{}', keeping previous state",
                self.species[spec_idx].name
            );
            return;
        };

        for (i, entry) in unknown_map.iter().enumerate() {
            if let Some(eq) = entry {
                self.concentrations[(i, spec_idx)] = c_new[*eq].max(0.0);
            }
        }
    }

    /// Coupled zones × species solve, used whenever reactions are present.
    /// Species blocks are stacked (`eq(i, k) = k·nu + i`); reactions couple
    /// the blocks zone by zone.
    fn solve_coupled(
        &mut self,
        network: &Network,
        unknown_map: &[Option<usize>],
        nu: usize,
        t: f64,
        dt: f64,
    ) {
        let ns = self.species.len();
        let dim = nu * ns;
        let mut a = DMatrix::zeros(dim, dim);
        let mut b = DVector::zeros(dim);

        for spec_idx in 0..ns {
            self.assemble_species(
                network,
                unknown_map,
                spec_idx,
                t,
                dt,
                &mut a,
                &mut b,
                spec_idx * nu,
            );
        }

        let k = self.reactions.build_matrix(ns);
        for (i, entry) in unknown_map.iter().enumerate() {
            let Some(eq) = *entry else { continue };
            let volume = effective_volume(network.node(i).volume);
            for alpha in 0..ns {
                for beta in 0..ns {
                    let rate = k[(alpha, beta)];
                    if rate == 0.0 {
                        continue;
                    }
                    if alpha == beta {
                        // Self-consumption lands on the diagonal with its
                        // magnitude, keeping the implicit system stable.
                        a[(alpha * nu + eq, alpha * nu + eq)] += rate.abs() * volume;
                    } else {
                        a[(alpha * nu + eq, beta * nu + eq)] -= rate * volume;
                    }
                }
            }
        }

        let Some(c_new) = a.col_piv_qr().solve(&b) else {
            warn!("transport: singular coupled system, keeping previous state");
            return;
        };

        for (i, entry) in unknown_map.iter().enumerate() {
            if let Some(eq) = entry {
                for spec_idx in 0..ns {
                    self.concentrations[(i, spec_idx)] = c_new[spec_idx * nu + eq].max(0.0);
                }
            }
        }
    }
}

fn unknown_zone_map(network: &Network) -> (Vec<Option<usize>>, usize) {
    let mut map = vec![None; network.node_count()];
    let mut nu = 0;
    for (i, node) in network.nodes().iter().enumerate() {
        if !node.is_known_pressure() {
            map[i] = Some(nu);
            nu += 1;
        }
    }
    (map, nu)
}

/// Phantom zones participate with zero volume; treat them as a unit volume
/// so the implicit diagonal stays well posed.
fn effective_volume(volume: f64) -> f64 {
    if volume > 0.0 {
        volume
    } else {
        1.0
    }
}
