//! Hourly weather boundary conditions.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// One hourly weather record (already parsed and unit-converted by the IO
/// collaborator: temperature in K, pressure absolute in Pa, RH in 0..1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    /// Outdoor dry-bulb temperature (K).
    pub temperature: f64,
    /// Wind speed (m/s).
    pub wind_speed: f64,
    /// Wind direction (degrees from north).
    pub wind_direction: f64,
    /// Absolute barometric pressure (Pa).
    pub pressure: f64,
    /// Relative humidity (0..1).
    pub humidity: f64,
}

impl WeatherRecord {
    /// Simulation time of this record, with the calendar flattened to
    /// 30-day months: `((month−1)·30 + (day−1))·86400 + (hour−1)·3600`.
    pub fn seconds_from_start(&self) -> f64 {
        let day_of_year = (self.month as f64 - 1.0) * 30.0 + (self.day as f64 - 1.0);
        day_of_year * 86_400.0 + (self.hour as f64 - 1.0) * 3_600.0
    }
}

/// Time-ordered weather records with clamped linear interpolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSeries {
    records: Vec<WeatherRecord>,
}

impl WeatherSeries {
    pub fn new(records: Vec<WeatherRecord>) -> SimResult<Self> {
        if records.is_empty() {
            return Err(SimError::InvalidArg {
                what: "weather series needs at least one record",
            });
        }
        for pair in records.windows(2) {
            if pair[1].seconds_from_start() <= pair[0].seconds_from_start() {
                return Err(SimError::NonMonotonic {
                    what: "weather record times must be strictly increasing",
                });
            }
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[WeatherRecord] {
        &self.records
    }

    /// Weather at time `t`, linearly interpolated and clamped to the series
    /// range. Calendar fields come from the lower bracketing record.
    pub fn interpolate(&self, t: f64) -> WeatherRecord {
        let first = &self.records[0];
        let last = &self.records[self.records.len() - 1];
        if self.records.len() == 1 || t <= first.seconds_from_start() {
            return *first;
        }
        if t >= last.seconds_from_start() {
            return *last;
        }

        for pair in self.records.windows(2) {
            let t0 = pair[0].seconds_from_start();
            let t1 = pair[1].seconds_from_start();
            if t >= t0 && t <= t1 {
                let alpha = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
                let lerp = |a: f64, b: f64| a * (1.0 - alpha) + b * alpha;
                return WeatherRecord {
                    month: pair[0].month,
                    day: pair[0].day,
                    hour: pair[0].hour,
                    temperature: lerp(pair[0].temperature, pair[1].temperature),
                    wind_speed: lerp(pair[0].wind_speed, pair[1].wind_speed),
                    wind_direction: lerp(pair[0].wind_direction, pair[1].wind_direction),
                    pressure: lerp(pair[0].pressure, pair[1].pressure),
                    humidity: lerp(pair[0].humidity, pair[1].humidity),
                };
            }
        }
        *last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(hour: u32, temp: f64, wind: f64) -> WeatherRecord {
        WeatherRecord {
            month: 1,
            day: 1,
            hour,
            temperature: temp,
            wind_speed: wind,
            wind_direction: 180.0,
            pressure: 101_325.0,
            humidity: 0.5,
        }
    }

    #[test]
    fn time_encoding() {
        assert_eq!(rec(1, 283.15, 0.0).seconds_from_start(), 0.0);
        assert_eq!(rec(2, 283.15, 0.0).seconds_from_start(), 3600.0);
        let feb1 = WeatherRecord {
            month: 2,
            day: 1,
            hour: 1,
            ..rec(1, 283.15, 0.0)
        };
        assert_eq!(feb1.seconds_from_start(), 30.0 * 86_400.0);
    }

    #[test]
    fn midpoint_interpolation() {
        let series = WeatherSeries::new(vec![rec(1, 293.15, 5.0), rec(2, 283.15, 3.0)]).unwrap();
        let wx = series.interpolate(1800.0);
        assert!((wx.temperature - 288.15).abs() < 0.1);
        assert!((wx.wind_speed - 4.0).abs() < 0.1);
    }

    #[test]
    fn clamps_outside_range() {
        let series = WeatherSeries::new(vec![rec(1, 293.15, 5.0), rec(2, 283.15, 3.0)]).unwrap();
        assert_eq!(series.interpolate(-100.0).temperature, 293.15);
        assert_eq!(series.interpolate(1e9).temperature, 283.15);
    }

    #[test]
    fn rejects_unordered_records() {
        assert!(WeatherSeries::new(vec![rec(2, 283.15, 3.0), rec(1, 293.15, 5.0)]).is_err());
        assert!(WeatherSeries::new(vec![]).is_err());
    }
}
