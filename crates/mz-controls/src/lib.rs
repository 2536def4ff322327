//! Control system for the multizone engine.
//!
//! Each step the driver reads sensors from the post-previous-step state,
//! evaluates logic nodes in dependency order, updates the controllers, and
//! applies their outputs through actuators that clone-modify-swap flow
//! elements. This crate holds the pure pieces; reading the network and
//! swapping elements is the driver's job.

pub mod actuator;
pub mod controller;
pub mod error;
pub mod logic;
pub mod sensor;
pub mod system;

pub use actuator::{Actuator, ActuatorKind};
pub use controller::{PiController, PiState};
pub use error::{ControlError, ControlResult};
pub use logic::{LogicBlock, LogicOp, SignalRef};
pub use sensor::{Sensor, SensorKind};
pub use system::{ActuatorCommand, ControlSystem, ControllerBinding};
