//! Contaminant transport for multizone networks.
//!
//! Advances per-zone species concentrations by one implicit Euler step of
//! the zone mass balance, using the airflow solver's cached link flows as
//! frozen boundary data. Per-species systems are solved independently;
//! when a reaction network is present, a coupled zones × species block
//! system is solved instead.

pub mod error;
pub mod reaction;
pub mod solver;
pub mod source;
pub mod species;

pub use error::{TransportError, TransportResult};
pub use reaction::{Reaction, ReactionNetwork};
pub use solver::{TransportSolver, TransportStep};
pub use source::{Source, SourceModel};
pub use species::Species;
