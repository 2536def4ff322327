//! Flow element library.
//!
//! Every element maps an effective pressure difference and a reference
//! density to a mass flow and its analytical derivative:
//! `flow(delta_p, density) -> LinkFlow { mass_flow, derivative }`.
//!
//! Conventions shared by all elements:
//! - positive `delta_p` drives positive flow (from-node to to-node);
//! - `derivative` is non-negative at every operating point (the Jacobian
//!   assembly relies on this);
//! - below [`common::DP_MIN`] the relation is replaced by a chord-slope
//!   linearisation so the derivative stays bounded at zero flow.

pub mod backdraft;
pub mod check_valve;
pub mod common;
pub mod damper;
pub mod duct;
pub mod element;
pub mod error;
pub mod fan;
pub mod filter;
pub mod power_law;
pub mod quadratic;
pub mod terminal;
pub mod vent;

pub use backdraft::BackdraftDamper;
pub use check_valve::CheckValve;
pub use common::{DP_MIN, EPS};
pub use damper::Damper;
pub use duct::Duct;
pub use element::{ElementKind, FlowElement, LinkFlow};
pub use error::{ElementError, ElementResult};
pub use fan::Fan;
pub use filter::{FilterStage, GaseousFilter, LoadingPoint, ParticleFilter, SuperFilter, UvgiFilter, UvgiParams};
pub use power_law::PowerLawOrifice;
pub use quadratic::QuadraticElement;
pub use terminal::{ReturnGrille, SupplyDiffuser};
pub use vent::SelfRegulatingVent;
