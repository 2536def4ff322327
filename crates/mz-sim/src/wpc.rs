//! Per-opening wind-pressure and ambient-concentration timeseries (WPC).
//!
//! These carry spatially non-uniform external boundary data, typically
//! exported from a CFD run: one column per envelope opening. When a WPC
//! binding exists for a link, it takes precedence over the Cp-profile wind
//! pressure on that link's ambient side.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Pressures at every opening at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WpcPressureRecord {
    pub time: f64,
    /// One gauge pressure (Pa) per opening.
    pub pressures: Vec<f64>,
}

/// Validated per-opening pressure series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WpcPressures {
    records: Vec<WpcPressureRecord>,
}

impl WpcPressures {
    pub fn new(records: Vec<WpcPressureRecord>) -> SimResult<Self> {
        if records.is_empty() {
            return Err(SimError::InvalidArg {
                what: "WPC pressure series needs at least one record",
            });
        }
        let width = records[0].pressures.len();
        for pair in records.windows(2) {
            if pair[1].time <= pair[0].time {
                return Err(SimError::NonMonotonic {
                    what: "WPC times must be strictly increasing",
                });
            }
        }
        for rec in &records {
            if rec.pressures.len() != width {
                return Err(SimError::Inconsistent {
                    what: format!(
                        "WPC record at t={} has {} openings, expected {width}",
                        rec.time,
                        rec.pressures.len()
                    ),
                });
            }
        }
        Ok(Self { records })
    }

    pub fn num_openings(&self) -> usize {
        self.records[0].pressures.len()
    }

    /// Per-opening pressures at `t`, linearly interpolated, clamped at the
    /// series ends.
    pub fn interpolate(&self, t: f64) -> Vec<f64> {
        interpolate_rows(
            &self.records,
            |r| r.time,
            |r| r.pressures.clone(),
            |a, b, alpha| {
                a.iter()
                    .zip(b)
                    .map(|(x, y)| x * (1.0 - alpha) + y * alpha)
                    .collect()
            },
            t,
        )
    }
}

/// Ambient concentrations seen by every opening at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WpcConcentrationRecord {
    pub time: f64,
    /// `concentrations[opening][species]` in kg/m³.
    pub concentrations: Vec<Vec<f64>>,
}

/// Validated per-opening concentration series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WpcConcentrations {
    records: Vec<WpcConcentrationRecord>,
}

impl WpcConcentrations {
    pub fn new(records: Vec<WpcConcentrationRecord>) -> SimResult<Self> {
        if records.is_empty() {
            return Err(SimError::InvalidArg {
                what: "WPC concentration series needs at least one record",
            });
        }
        for pair in records.windows(2) {
            if pair[1].time <= pair[0].time {
                return Err(SimError::NonMonotonic {
                    what: "WPC times must be strictly increasing",
                });
            }
        }
        let openings = records[0].concentrations.len();
        for rec in &records {
            if rec.concentrations.len() != openings {
                return Err(SimError::Inconsistent {
                    what: format!("WPC concentration record at t={} is ragged", rec.time),
                });
            }
        }
        Ok(Self { records })
    }

    pub fn num_openings(&self) -> usize {
        self.records[0].concentrations.len()
    }

    /// `[opening][species]` concentrations at `t`.
    pub fn interpolate(&self, t: f64) -> Vec<Vec<f64>> {
        interpolate_rows(
            &self.records,
            |r| r.time,
            |r| r.concentrations.clone(),
            |a, b, alpha| {
                a.iter()
                    .zip(b)
                    .map(|(row_a, row_b)| {
                        row_a
                            .iter()
                            .zip(row_b)
                            .map(|(x, y)| x * (1.0 - alpha) + y * alpha)
                            .collect()
                    })
                    .collect()
            },
            t,
        )
    }
}

/// Shared clamped-linear interpolation over a sorted record list.
fn interpolate_rows<R, V>(
    records: &[R],
    time_of: impl Fn(&R) -> f64,
    value_of: impl Fn(&R) -> V,
    lerp: impl Fn(&V, &V, f64) -> V,
    t: f64,
) -> V {
    let first = &records[0];
    let last = &records[records.len() - 1];
    if records.len() == 1 || t <= time_of(first) {
        return value_of(first);
    }
    if t >= time_of(last) {
        return value_of(last);
    }
    for pair in records.windows(2) {
        let t0 = time_of(&pair[0]);
        let t1 = time_of(&pair[1]);
        if t >= t0 && t <= t1 {
            let alpha = (t - t0) / (t1 - t0);
            return lerp(&value_of(&pair[0]), &value_of(&pair[1]), alpha);
        }
    }
    value_of(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressure_interpolation() {
        let series = WpcPressures::new(vec![
            WpcPressureRecord {
                time: 0.0,
                pressures: vec![10.0, -5.0],
            },
            WpcPressureRecord {
                time: 100.0,
                pressures: vec![20.0, -15.0],
            },
        ])
        .unwrap();
        assert_eq!(series.num_openings(), 2);
        let p = series.interpolate(50.0);
        assert!((p[0] - 15.0).abs() < 1e-12);
        assert!((p[1] + 10.0).abs() < 1e-12);
        // Clamped ends
        assert_eq!(series.interpolate(-1.0), vec![10.0, -5.0]);
        assert_eq!(series.interpolate(500.0), vec![20.0, -15.0]);
    }

    #[test]
    fn non_monotonic_times_rejected() {
        let result = WpcPressures::new(vec![
            WpcPressureRecord {
                time: 10.0,
                pressures: vec![1.0],
            },
            WpcPressureRecord {
                time: 10.0,
                pressures: vec![2.0],
            },
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn ragged_columns_rejected() {
        let result = WpcPressures::new(vec![
            WpcPressureRecord {
                time: 0.0,
                pressures: vec![1.0, 2.0],
            },
            WpcPressureRecord {
                time: 10.0,
                pressures: vec![1.0],
            },
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn concentration_interpolation() {
        let series = WpcConcentrations::new(vec![
            WpcConcentrationRecord {
                time: 0.0,
                concentrations: vec![vec![0.0, 1.0]],
            },
            WpcConcentrationRecord {
                time: 10.0,
                concentrations: vec![vec![2.0, 3.0]],
            },
        ])
        .unwrap();
        let c = series.interpolate(5.0);
        assert!((c[0][0] - 1.0).abs() < 1e-12);
        assert!((c[0][1] - 2.0).abs() < 1e-12);
    }
}
