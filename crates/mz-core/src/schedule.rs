//! Piecewise time schedules.
//!
//! A [`Schedule`] is a sorted list of `(time, value)` points evaluated with
//! either linear interpolation or step-hold, clamped to the nearest endpoint
//! outside its range. [`WeekSchedule`] composes 24-hour [`DayType`] profiles
//! over a repeating week.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{MzError, MzResult};

/// Interpolation mode between schedule points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Interp {
    /// Linear interpolation between bracketing points.
    #[default]
    Linear,
    /// Hold the earlier point's value until the next point's time.
    StepHold,
}

/// A single `(time, value)` schedule point. Time is in seconds from
/// simulation start; value is typically a multiplier in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulePoint {
    pub time: f64,
    pub value: f64,
}

/// Piecewise schedule over time.
///
/// An empty schedule evaluates to 1.0 (always on), matching the convention
/// that an unbound schedule id means "no modulation".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub name: String,
    pub interp: Interp,
    points: Vec<SchedulePoint>,
}

impl Schedule {
    pub fn new(name: impl Into<String>, interp: Interp) -> Self {
        Self {
            name: name.into(),
            interp,
            points: Vec::new(),
        }
    }

    /// Build from pre-sorted points, rejecting decreasing times.
    ///
    /// File-derived schedules (CVF/DVF) must be monotonically increasing;
    /// a violation is a configuration error, not something to sort away.
    pub fn from_points(
        name: impl Into<String>,
        interp: Interp,
        points: Vec<SchedulePoint>,
    ) -> MzResult<Self> {
        for pair in points.windows(2) {
            if pair[1].time <= pair[0].time {
                return Err(MzError::NonMonotonic {
                    what: "schedule times must be strictly increasing",
                });
            }
        }
        Ok(Self {
            name: name.into(),
            interp,
            points,
        })
    }

    /// Insert a point, keeping the list sorted by time.
    pub fn push_point(&mut self, time: f64, value: f64) {
        let at = self
            .points
            .partition_point(|p| p.time <= time);
        self.points.insert(at, SchedulePoint { time, value });
    }

    pub fn points(&self) -> &[SchedulePoint] {
        &self.points
    }

    /// Evaluate at time `t`, clamping outside the defined range.
    pub fn value(&self, t: f64) -> f64 {
        if self.points.is_empty() {
            return 1.0;
        }
        if self.points.len() == 1 || t <= self.points[0].time {
            return self.points[0].value;
        }
        let last = self.points.len() - 1;
        if t >= self.points[last].time {
            return self.points[last].value;
        }
        // partition_point gives the first index with time > t; the bracket is
        // [hi-1, hi].
        let hi = self.points.partition_point(|p| p.time <= t);
        let lo = hi - 1;
        match self.interp {
            Interp::StepHold => self.points[lo].value,
            Interp::Linear => {
                let span = self.points[hi].time - self.points[lo].time;
                if span < 1e-15 {
                    return self.points[lo].value;
                }
                let alpha = (t - self.points[lo].time) / span;
                self.points[lo].value * (1.0 - alpha) + self.points[hi].value * alpha
            }
        }
    }
}

/// A named 24-hour profile (times are seconds since midnight, 0..86400).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayType {
    pub name: String,
    pub profile: Schedule,
}

impl DayType {
    pub fn new(name: impl Into<String>, profile: Schedule) -> Self {
        Self {
            name: name.into(),
            profile,
        }
    }

    pub fn value(&self, seconds_since_midnight: f64) -> f64 {
        self.profile.value(seconds_since_midnight)
    }
}

/// Maps each day of the week (0 = Monday … 6 = Sunday) to a day type and
/// cycles weekly over simulation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekSchedule {
    pub name: String,
    week: [Option<usize>; 7],
}

impl WeekSchedule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            week: [None; 7],
        }
    }

    /// Assign a day-type key to a day of the week.
    pub fn assign(&mut self, day_of_week: usize, day_type: usize) -> MzResult<()> {
        if day_of_week > 6 {
            return Err(MzError::InvalidArg {
                what: "day_of_week must be 0..=6 (Mon..Sun)",
            });
        }
        self.week[day_of_week] = Some(day_type);
        Ok(())
    }

    pub fn day_type(&self, day_of_week: usize) -> Option<usize> {
        self.week.get(day_of_week).copied().flatten()
    }

    /// Evaluate at simulation time `t`, where `t = 0` falls on
    /// `start_day_of_week`. Days with no assigned day type evaluate to 1.0.
    pub fn value(&self, t: f64, start_day_of_week: usize, day_types: &HashMap<usize, DayType>) -> f64 {
        let t = t.max(0.0);
        let total_days = (t / 86_400.0) as usize;
        let seconds_in_day = t - (total_days as f64) * 86_400.0;
        let dow = (start_day_of_week + total_days) % 7;
        match self.day_type(dow).and_then(|id| day_types.get(&id)) {
            Some(dt) => dt.value(seconds_in_day),
            None => 1.0,
        }
    }
}
