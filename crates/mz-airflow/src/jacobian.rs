//! Link evaluation and Jacobian/residual assembly.

use mz_core::units::constants::G0_MPS2;
use nalgebra::DVector;

use mz_network::{Link, Network};

use crate::sparse::Triplets;

/// Effective pressure difference across a link at its reference elevation,
/// including the stack correction relative to each node's own elevation:
///
/// `ΔP = (P_i − ρ_i·g·(Z_k − z_i)) − (P_j − ρ_j·g·(Z_k − z_j))`
///
/// Positive ΔP drives flow from the link's from-node to its to-node.
pub fn effective_delta_p(network: &Network, link: &Link) -> f64 {
    let node_i = network.node(link.from);
    let node_j = network.node(link.to);
    let z_k = link.elevation;

    let p_eff_i = node_i.pressure - node_i.density * G0_MPS2 * (z_k - node_i.elevation);
    let p_eff_j = node_j.pressure - node_j.density * G0_MPS2 * (z_k - node_j.elevation);
    p_eff_i - p_eff_j
}

/// Evaluate every link's element at the current pressures and cache
/// `(ṁ, dṁ/dΔP)` on the link. Reference density is the mean of the two
/// connected nodes.
pub fn compute_flows(network: &mut Network) {
    for idx in 0..network.link_count() {
        let (delta_p, density) = {
            let link = network.link(idx);
            let rho_i = network.node(link.from).density;
            let rho_j = network.node(link.to).density;
            (effective_delta_p(network, link), 0.5 * (rho_i + rho_j))
        };
        let link = network.link_mut(idx);
        let flow = link.element().flow(delta_p, density);
        link.set_flow(flow);
    }
}

/// Stamp the sparse Jacobian and residual from the cached link flows.
///
/// Residual convention: `R[eq]` is the net mass inflow at the node, so a
/// converged solution has `R = 0`. For a link from `a` to `b` with flow `ṁ`
/// and derivative `d ≥ 0`:
/// - `R[a] -= ṁ`, `J[a,a] += -d`, `J[a,b] += +d`
/// - `R[b] += ṁ`, `J[b,b] += -d`, `J[b,a] += +d`
///
/// Parallel links stamp the same positions repeatedly; the triplet store
/// sums them.
pub fn assemble(
    network: &Network,
    unknown_map: &[Option<usize>],
    n: usize,
) -> (Triplets, DVector<f64>) {
    let mut jac = Triplets::new(n);
    let mut residual = DVector::zeros(n);

    for link in network.links() {
        let mass_flow = link.mass_flow();
        let deriv = link.derivative();
        let eq_a = unknown_map[link.from];
        let eq_b = unknown_map[link.to];

        if let Some(a) = eq_a {
            residual[a] -= mass_flow;
            jac.push(a, a, -deriv);
            if let Some(b) = eq_b {
                jac.push(a, b, deriv);
            }
        }
        if let Some(b) = eq_b {
            residual[b] += mass_flow;
            jac.push(b, b, -deriv);
            if let Some(a) = eq_a {
                jac.push(b, a, deriv);
            }
        }
    }

    (jac, residual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mz_core::units::constants::{P_ATM, R_AIR};
    use mz_elements::PowerLawOrifice;
    use mz_network::{NetworkBuilder, NodeKind};

    fn two_room() -> Network {
        let mut b = NetworkBuilder::new();
        let amb = b.add_node("Out", NodeKind::Ambient);
        b.node_mut(amb).temperature = 273.15;
        let room = b.add_node("Room", NodeKind::Normal);
        b.node_mut(room).volume = 50.0;
        b.node_mut(room).temperature = 293.15;
        b.add_link(
            "crack",
            amb,
            room,
            1.5,
            PowerLawOrifice::new(0.001, 0.65).unwrap().into(),
        );
        b.build().unwrap()
    }

    #[test]
    fn stack_correction_at_equal_pressures() {
        let net = two_room();
        // Gauge pressures are zero and the opening sits above both node
        // bases: the denser outdoor column loses more pressure over the
        // height, so the elevated opening exhausts (negative ΔP).
        let dp = effective_delta_p(&net, net.link(0));
        let rho_out = P_ATM / (R_AIR * 273.15);
        let rho_in = P_ATM / (R_AIR * 293.15);
        let expected = G0_MPS2 * 1.5 * (rho_in - rho_out);
        assert!((dp - expected).abs() < 1e-9);
        assert!(dp < 0.0);
    }

    #[test]
    fn compute_flows_caches_results() {
        let mut net = two_room();
        compute_flows(&mut net);
        let link = net.link(0);
        // Outflow through the elevated opening, with a positive derivative.
        assert!(link.mass_flow() < 0.0);
        assert!(link.derivative() > 0.0);
    }

    #[test]
    fn assembly_signs() {
        let mut net = two_room();
        compute_flows(&mut net);
        let unknown_map = vec![None, Some(0)];
        let (jac, residual) = assemble(&net, &unknown_map, 1);

        let link = net.link(0);
        // The room is the link's to-node: its residual carries +ṁ.
        assert!((residual[0] - link.mass_flow()).abs() < 1e-15);
        let dense = jac.to_dense();
        assert!((dense[(0, 0)] + link.derivative()).abs() < 1e-15);
    }

    #[test]
    fn ambient_only_network_assembles_empty() {
        let mut b = NetworkBuilder::new();
        b.add_node("Out", NodeKind::Ambient);
        let net = b.build().unwrap();
        let (jac, residual) = assemble(&net, &[None], 0);
        assert_eq!(jac.n(), 0);
        assert_eq!(residual.len(), 0);
    }
}
