//! Newton-Raphson pressure solver with trust-region or under-relaxation
//! globalisation.

use log::warn;
use nalgebra::DVector;

use mz_network::Network;

use crate::jacobian::{assemble, compute_flows};
use crate::ordering::{invert_permutation, rcm_ordering};
use crate::sparse::{bicgstab, Ilu0, Triplets};

/// Unknown count above which the linear solves switch from dense LU to
/// BiCGSTAB with ILU(0) preconditioning.
const DIRECT_SOLVE_MAX_UNKNOWNS: usize = 50;

/// Iterative-solve settings for the large-system path.
const BICGSTAB_TOL: f64 = 1e-10;
const BICGSTAB_MAX_ITERATIONS: usize = 1000;

/// Pressure update strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolveMethod {
    /// Fixed under-relaxation: `p += ω·δp`.
    UnderRelaxation,
    /// Newton step clamped to an adaptive trust radius.
    #[default]
    TrustRegion,
}

/// Outcome of one steady airflow solve. Never an error: a failed solve keeps
/// the last iterate and reports `converged = false`.
#[derive(Debug, Clone, Default)]
pub struct AirflowResult {
    /// Final gauge pressure per node (dense node order).
    pub pressures: Vec<f64>,
    /// Final mass flow per link (dense link order).
    pub mass_flows: Vec<f64>,
    /// Newton iterations performed.
    pub iterations: usize,
    /// Infinity norm of the final residual (kg/s).
    pub max_residual: f64,
    /// Whether the residual dropped below the convergence tolerance.
    pub converged: bool,
}

/// Steady airflow solver configuration.
#[derive(Debug, Clone)]
pub struct AirflowSolver {
    pub method: SolveMethod,
    /// Newton iteration cap.
    pub max_iterations: usize,
    /// Convergence tolerance on the residual infinity norm (kg/s).
    pub convergence_tol: f64,
    /// ω for [`SolveMethod::UnderRelaxation`].
    pub relax_factor: f64,
    /// Trust-region start/floor/ceiling radii (Pa).
    pub tr_initial_radius: f64,
    pub tr_min_radius: f64,
    pub tr_max_radius: f64,
}

impl Default for AirflowSolver {
    fn default() -> Self {
        Self {
            method: SolveMethod::TrustRegion,
            max_iterations: 100,
            convergence_tol: 1e-6,
            relax_factor: 0.75,
            tr_initial_radius: 100.0,
            tr_min_radius: 1e-2,
            tr_max_radius: 1e4,
        }
    }
}

impl AirflowSolver {
    pub fn new(method: SolveMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Solve for nodal pressures and link flows in place.
    ///
    /// Ambient nodes keep their (wind-adjusted) pressures as Dirichlet data;
    /// all other nodes are unknowns. On exit the network carries the final
    /// pressures, densities and cached link flows.
    pub fn solve(&self, network: &mut Network) -> AirflowResult {
        let node_count = network.node_count();

        // Equation map over non-Ambient nodes.
        let mut base_map: Vec<Option<usize>> = vec![None; node_count];
        let mut n = 0;
        for (i, node) in network.nodes().iter().enumerate() {
            if !node.is_known_pressure() {
                base_map[i] = Some(n);
                n += 1;
            }
        }

        let mut result = AirflowResult {
            pressures: Vec::new(),
            mass_flows: Vec::new(),
            iterations: 0,
            max_residual: 0.0,
            converged: false,
        };

        if n == 0 {
            network.update_all_densities();
            compute_flows(network);
            result.converged = true;
            self.collect(network, &mut result);
            return result;
        }

        // Bandwidth-reducing reorder of the unknowns.
        let perm = rcm_ordering(network, &base_map, n);
        let inv_perm = invert_permutation(&perm);
        let unknown_map: Vec<Option<usize>> = base_map
            .iter()
            .map(|entry| entry.map(|eq| inv_perm[eq]))
            .collect();

        network.update_all_densities();
        let mut trust_radius = self.tr_initial_radius;

        for iter in 0..self.max_iterations {
            network.update_all_densities();
            compute_flows(network);

            let (jac, residual) = assemble(network, &unknown_map, n);
            result.max_residual = residual.amax();
            result.iterations = iter + 1;

            if result.max_residual < self.convergence_tol {
                result.converged = true;
                break;
            }

            let delta_p = match self.linear_solve(&jac, &residual, n) {
                Some(dp) => dp,
                None => {
                    warn!(
                        "airflow: linear solve failed at iteration {iter}, \
                         reporting non-convergence"
                    );
                    break;
                }
            };

            match self.method {
                SolveMethod::UnderRelaxation => {
                    self.apply_relaxed(network, &unknown_map, &delta_p);
                }
                SolveMethod::TrustRegion => {
                    self.apply_trust_region(network, &unknown_map, &delta_p, &mut trust_radius);
                }
            }
        }

        if !result.converged {
            warn!(
                "airflow: not converged after {} iterations (max residual {:.3e} kg/s)",
                result.iterations, result.max_residual
            );
        }

        self.collect(network, &mut result);
        result
    }

    /// Solve `J·δp = −R`. Dense LU for small systems; BiCGSTAB + ILU(0)
    /// with a direct fallback for large ones. `None` means both paths failed.
    fn linear_solve(&self, jac: &Triplets, residual: &DVector<f64>, n: usize) -> Option<DVector<f64>> {
        let rhs = -residual;

        if n > DIRECT_SOLVE_MAX_UNKNOWNS {
            let csr = jac.to_csr();
            match Ilu0::factor(&csr) {
                Ok(precond) => {
                    match bicgstab(&csr, &rhs, &precond, BICGSTAB_TOL, BICGSTAB_MAX_ITERATIONS) {
                        Ok(dp) => return Some(dp),
                        Err(err) => warn!("airflow: {err}, falling back to dense LU"),
                    }
                }
                Err(err) => warn!("airflow: {err}, falling back to dense LU"),
            }
        }

        jac.to_dense().lu().solve(&rhs)
    }

    fn apply_relaxed(&self, network: &mut Network, unknown_map: &[Option<usize>], delta_p: &DVector<f64>) {
        for i in 0..network.node_count() {
            if let Some(eq) = unknown_map[i] {
                network.node_mut(i).pressure += self.relax_factor * delta_p[eq];
            }
        }
    }

    /// Clamp the step to the trust radius; shrink the radius when the clamp
    /// engaged, expand it after a full step.
    fn apply_trust_region(
        &self,
        network: &mut Network,
        unknown_map: &[Option<usize>],
        delta_p: &DVector<f64>,
        trust_radius: &mut f64,
    ) {
        let step_norm = delta_p.norm();
        let scale = if step_norm > *trust_radius {
            *trust_radius / step_norm
        } else {
            1.0
        };

        for i in 0..network.node_count() {
            if let Some(eq) = unknown_map[i] {
                network.node_mut(i).pressure += scale * delta_p[eq];
            }
        }

        if scale < 1.0 {
            *trust_radius = (*trust_radius * 0.5).max(self.tr_min_radius);
        } else {
            *trust_radius = (*trust_radius * 2.0).min(self.tr_max_radius);
        }
    }

    fn collect(&self, network: &Network, result: &mut AirflowResult) {
        result.pressures = network.nodes().iter().map(|n| n.pressure).collect();
        result.mass_flows = network.links().iter().map(|l| l.mass_flow()).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jacobian::compute_flows;
    use mz_elements::PowerLawOrifice;
    use mz_network::{NetworkBuilder, NodeKind};

    #[test]
    fn ambient_only_network_is_trivially_converged() {
        let mut b = NetworkBuilder::new();
        b.add_node("Out", NodeKind::Ambient);
        let mut net = b.build().unwrap();
        let result = AirflowSolver::default().solve(&mut net);
        assert!(result.converged);
        assert_eq!(result.pressures.len(), 1);
    }

    #[test]
    fn single_room_balances_two_cracks() {
        // Warm room between two ambient-facing cracks at different heights:
        // the room pressure settles so inflow equals outflow.
        let mut b = NetworkBuilder::new();
        let amb = b.add_node("Out", NodeKind::Ambient);
        b.node_mut(amb).temperature = 273.15;
        let room = b.add_node("Room", NodeKind::Normal);
        b.node_mut(room).volume = 50.0;
        b.node_mut(room).temperature = 293.15;
        b.add_link(
            "low",
            amb,
            room,
            0.5,
            PowerLawOrifice::new(0.001, 0.65).unwrap().into(),
        );
        b.add_link(
            "high",
            room,
            amb,
            2.5,
            PowerLawOrifice::new(0.001, 0.65).unwrap().into(),
        );
        let mut net = b.build().unwrap();

        let result = AirflowSolver::default().solve(&mut net);
        assert!(result.converged);
        assert!(result.max_residual < 1e-6);
        // Stack effect: in at the bottom, out at the top.
        assert!(result.mass_flows[0] > 0.0);
        assert!(result.mass_flows[1] > 0.0);
        let net_flow = result.mass_flows[0] - result.mass_flows[1];
        assert!(net_flow.abs() < 1e-6);
    }

    #[test]
    fn under_relaxation_reaches_same_solution() {
        let build = || {
            let mut b = NetworkBuilder::new();
            let amb = b.add_node("Out", NodeKind::Ambient);
            b.node_mut(amb).temperature = 283.15;
            let room = b.add_node("Room", NodeKind::Normal);
            b.node_mut(room).volume = 40.0;
            b.node_mut(room).temperature = 295.15;
            b.add_link(
                "a",
                amb,
                room,
                1.0,
                PowerLawOrifice::new(0.002, 0.6).unwrap().into(),
            );
            b.add_link(
                "b",
                room,
                amb,
                2.0,
                PowerLawOrifice::new(0.002, 0.6).unwrap().into(),
            );
            b.build().unwrap()
        };

        let mut net_tr = build();
        let mut net_sur = build();
        let tr = AirflowSolver::new(SolveMethod::TrustRegion).solve(&mut net_tr);
        let sur = AirflowSolver::new(SolveMethod::UnderRelaxation).solve(&mut net_sur);
        assert!(tr.converged && sur.converged);
        assert!((tr.pressures[1] - sur.pressures[1]).abs() < 1e-4);
    }

    #[test]
    fn round_trip_recompute_matches_cache() {
        let mut b = NetworkBuilder::new();
        let amb = b.add_node("Out", NodeKind::Ambient);
        b.node_mut(amb).temperature = 273.15;
        let room = b.add_node("Room", NodeKind::Normal);
        b.node_mut(room).volume = 50.0;
        b.node_mut(room).temperature = 293.15;
        b.add_link(
            "a",
            amb,
            room,
            0.5,
            PowerLawOrifice::new(0.001, 0.65).unwrap().into(),
        );
        b.add_link(
            "b",
            room,
            amb,
            2.5,
            PowerLawOrifice::new(0.001, 0.65).unwrap().into(),
        );
        let mut net = b.build().unwrap();
        let result = AirflowSolver::default().solve(&mut net);
        assert!(result.converged);

        // Re-evaluating the elements at the converged pressures must
        // reproduce the cached flows exactly.
        let cached: Vec<f64> = net.links().iter().map(|l| l.mass_flow()).collect();
        compute_flows(&mut net);
        let recomputed: Vec<f64> = net.links().iter().map(|l| l.mass_flow()).collect();
        assert_eq!(cached, recomputed);
    }
}
