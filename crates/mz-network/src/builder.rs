//! Incremental network builder with validate-on-build.

use std::collections::HashMap;

use mz_core::{Id, LinkId, NodeId};
use mz_elements::FlowElement;

use crate::error::{NetworkError, NetworkResult};
use crate::link::Link;
use crate::network::{AmbientConditions, Network};
use crate::node::{Node, NodeKind};

/// Builds a [`Network`] incrementally, then freezes and validates it.
///
/// Ids are assigned densely in insertion order; configure node state through
/// [`NetworkBuilder::node_mut`] before calling [`NetworkBuilder::build`].
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    nodes: Vec<Node>,
    links: Vec<Link>,
    ambient: AmbientConditions,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ambient(&mut self, ambient: AmbientConditions) {
        self.ambient = ambient;
    }

    /// Add a node and return its id.
    pub fn add_node(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        let id = Id::from_index(self.nodes.len() as u32);
        self.nodes.push(Node::new(id, name, kind));
        id
    }

    /// Mutable access to a node added earlier (panics on a foreign id).
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index() as usize]
    }

    /// Add a link between two nodes and return its id.
    pub fn add_link(
        &mut self,
        name: impl Into<String>,
        from: NodeId,
        to: NodeId,
        elevation: f64,
        element: FlowElement,
    ) -> LinkId {
        let id = Id::from_index(self.links.len() as u32);
        self.links.push(Link::new(
            id,
            name,
            from.index() as usize,
            to.index() as usize,
            elevation,
            element,
        ));
        id
    }

    /// Validate and freeze the network. Initial densities are computed so a
    /// freshly built network is immediately solvable.
    pub fn build(self) -> NetworkResult<Network> {
        let node_count = self.nodes.len();
        if node_count == 0 {
            return Err(NetworkError::Topology {
                what: "network has no nodes".into(),
            });
        }

        for node in &self.nodes {
            if node.temperature <= 0.0 {
                return Err(NetworkError::NodeState {
                    what: format!("node '{}' has non-positive temperature", node.name),
                });
            }
            if node.volume < 0.0 {
                return Err(NetworkError::NodeState {
                    what: format!("node '{}' has negative volume", node.name),
                });
            }
            // Zero volume is only meaningful for nodes that carry no air
            // mass of their own.
            if node.volume == 0.0 && matches!(node.kind, NodeKind::Normal | NodeKind::Cfd) {
                return Err(NetworkError::NodeState {
                    what: format!("zone node '{}' needs a positive volume", node.name),
                });
            }
        }

        for link in &self.links {
            if link.from >= node_count || link.to >= node_count {
                return Err(NetworkError::Topology {
                    what: format!("link '{}' references a missing node", link.name),
                });
            }
            if link.from == link.to {
                return Err(NetworkError::Topology {
                    what: format!("link '{}' connects a node to itself", link.name),
                });
            }
        }

        let node_index: HashMap<NodeId, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id, i))
            .collect();
        let link_index: HashMap<LinkId, usize> = self
            .links
            .iter()
            .enumerate()
            .map(|(i, l)| (l.id, i))
            .collect();
        if node_index.len() != self.nodes.len() {
            return Err(NetworkError::DuplicateId {
                what: "node ids collide".into(),
            });
        }
        if link_index.len() != self.links.len() {
            return Err(NetworkError::DuplicateId {
                what: "link ids collide".into(),
            });
        }

        let mut network = Network {
            nodes: self.nodes,
            links: self.links,
            node_index,
            link_index,
            ambient: self.ambient,
        };
        network.update_all_densities();
        Ok(network)
    }
}
