//! The assembled multizone network.

use std::collections::HashMap;

use mz_core::units::constants::{P_ATM, T_REF};
use mz_core::{LinkId, NodeId};

use crate::link::Link;
use crate::node::Node;

/// Outdoor conditions shared by the whole network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientConditions {
    /// Outdoor air temperature (K).
    pub temperature: f64,
    /// Absolute atmospheric pressure (Pa); baseline for all gauge pressures.
    pub pressure: f64,
    /// Wind speed at the meteorological reference (m/s).
    pub wind_speed: f64,
    /// Wind direction (degrees from north).
    pub wind_direction: f64,
}

impl Default for AmbientConditions {
    fn default() -> Self {
        Self {
            temperature: T_REF,
            pressure: P_ATM,
            wind_speed: 0.0,
            wind_direction: 0.0,
        }
    }
}

/// Node/link collection with O(1) id lookup and the ambient state.
///
/// Built once by [`crate::NetworkBuilder`]; solvers mutate node pressures,
/// densities and cached link flows in place.
#[derive(Debug, Clone)]
pub struct Network {
    pub(crate) nodes: Vec<Node>,
    pub(crate) links: Vec<Link>,
    pub(crate) node_index: HashMap<NodeId, usize>,
    pub(crate) link_index: HashMap<LinkId, usize>,
    pub(crate) ambient: AmbientConditions,
}

impl Network {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn links_mut(&mut self) -> &mut [Link] {
        &mut self.links
    }

    pub fn node(&self, idx: usize) -> &Node {
        &self.nodes[idx]
    }

    pub fn node_mut(&mut self, idx: usize) -> &mut Node {
        &mut self.nodes[idx]
    }

    pub fn link(&self, idx: usize) -> &Link {
        &self.links[idx]
    }

    pub fn link_mut(&mut self, idx: usize) -> &mut Link {
        &mut self.links[idx]
    }

    /// Dense index of a node id.
    pub fn node_index(&self, id: NodeId) -> Option<usize> {
        self.node_index.get(&id).copied()
    }

    /// Dense index of a link id.
    pub fn link_index(&self, id: LinkId) -> Option<usize> {
        self.link_index.get(&id).copied()
    }

    pub fn ambient(&self) -> AmbientConditions {
        self.ambient
    }

    pub fn ambient_mut(&mut self) -> &mut AmbientConditions {
        &mut self.ambient
    }

    /// Number of airflow unknowns (non-Ambient nodes).
    pub fn unknown_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.is_known_pressure()).count()
    }

    /// Recompute every node's density from its gauge pressure and
    /// temperature against the ambient absolute pressure baseline.
    pub fn update_all_densities(&mut self) {
        let p_atm = self.ambient.pressure;
        for node in &mut self.nodes {
            node.update_density(p_atm);
        }
    }

    /// Net mass inflow per node from the cached link flows. Converged
    /// airflow leaves every non-Ambient entry near zero.
    pub fn net_node_flows(&self) -> Vec<f64> {
        let mut net = vec![0.0; self.nodes.len()];
        for link in &self.links {
            net[link.from] -= link.mass_flow();
            net[link.to] += link.mass_flow();
        }
        net
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::NetworkBuilder;
    use crate::node::NodeKind;
    use mz_elements::PowerLawOrifice;

    #[test]
    fn unknown_count_excludes_ambient() {
        let mut b = NetworkBuilder::new();
        let amb = b.add_node("Out", NodeKind::Ambient);
        let r1 = b.add_node("Room1", NodeKind::Normal);
        b.node_mut(r1).volume = 50.0;
        let r2 = b.add_node("Room2", NodeKind::Normal);
        b.node_mut(r2).volume = 30.0;
        b.add_link(
            "l1",
            amb,
            r1,
            1.0,
            PowerLawOrifice::new(0.001, 0.65).unwrap().into(),
        );
        let net = b.build().unwrap();
        assert_eq!(net.node_count(), 3);
        assert_eq!(net.unknown_count(), 2);
    }

    #[test]
    fn densities_follow_ambient_baseline() {
        let mut b = NetworkBuilder::new();
        let r = b.add_node("Room", NodeKind::Normal);
        b.node_mut(r).volume = 50.0;
        b.node_mut(r).temperature = 293.15;
        let mut net = b.build().unwrap();
        net.update_all_densities();
        let rho_std = net.node(0).density;

        net.ambient_mut().pressure = 90_000.0;
        net.update_all_densities();
        assert!(net.node(0).density < rho_std);
    }
}
