//! Network data model for the multizone engine.
//!
//! A [`Network`] owns the building's nodes (well-mixed air zones plus the
//! ambient boundary) and links (flow paths, each owning its
//! [`mz_elements::FlowElement`]). Pressures and cached link flows mutate only
//! during solver passes; topology is frozen by [`NetworkBuilder::build`].

pub mod builder;
pub mod error;
pub mod link;
pub mod network;
pub mod node;

pub use builder::NetworkBuilder;
pub use error::{NetworkError, NetworkResult};
pub use link::Link;
pub use network::{AmbientConditions, Network};
pub use node::{Node, NodeKind};
