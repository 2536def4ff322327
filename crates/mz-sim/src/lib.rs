//! Transient multizone simulation driver.
//!
//! Composes the airflow and contaminant solvers over fixed time steps under
//! time-varying weather, schedules, WPC boundary data, HVAC systems,
//! occupants and the control loop. Single-threaded and cooperative: the
//! progress callback is the only suspension (and cancellation) point.

pub mod driver;
pub mod error;
pub mod hvac;
pub mod occupant;
pub mod weather;
pub mod wpc;

pub use driver::{Snapshot, TransientConfig, TransientResult, TransientSimulation};
pub use error::{SimError, SimResult};
pub use hvac::{AirHandlingSystem, ZoneConnection};
pub use occupant::{Occupant, SpeciesExposure};
pub use weather::{WeatherRecord, WeatherSeries};
pub use wpc::{WpcConcentrationRecord, WpcConcentrations, WpcPressureRecord, WpcPressures};
