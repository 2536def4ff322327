//! Shared primitives for the multizone airflow/contaminant engine.
//!
//! Everything here is deliberately small and dependency-light: compact ids,
//! numeric helpers, SI unit aliases with the engine's physical constants, and
//! the piecewise time schedules every other crate consumes.

pub mod error;
pub mod ids;
pub mod numeric;
pub mod schedule;
pub mod units;

pub use error::{MzError, MzResult};
pub use ids::{Id, LinkId, NodeId, ScheduleId, SpeciesId};
pub use numeric::{nearly_equal, Real, Tolerances};
pub use schedule::{DayType, Interp, Schedule, WeekSchedule};
