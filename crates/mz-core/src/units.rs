//! SI unit aliases and the engine's physical constants.
//!
//! Typed quantities live at API boundaries (element factories, boundary
//! conditions); solver internals work in raw `f64` Pa / K / kg/s.

use uom::si::f64::{
    Area as UomArea, Length as UomLength, MassDensity as UomMassDensity,
    MassRate as UomMassRate, Pressure as UomPressure, Ratio as UomRatio,
    ThermodynamicTemperature as UomThermodynamicTemperature, Time as UomTime,
    Velocity as UomVelocity,
};

pub type Area = UomArea;
pub type Density = UomMassDensity;
pub type Length = UomLength;
pub type MassRate = UomMassRate;
pub type Pressure = UomPressure;
pub type Ratio = UomRatio;
pub type Temperature = UomThermodynamicTemperature;
pub type Time = UomTime;
pub type Velocity = UomVelocity;

#[inline]
pub fn pa(v: f64) -> Pressure {
    use uom::si::pressure::pascal;
    Pressure::new::<pascal>(v)
}

#[inline]
pub fn k(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::kelvin;
    Temperature::new::<kelvin>(v)
}

#[inline]
pub fn kgps(v: f64) -> MassRate {
    use uom::si::mass_rate::kilogram_per_second;
    MassRate::new::<kilogram_per_second>(v)
}

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn m2(v: f64) -> Area {
    use uom::si::area::square_meter;
    Area::new::<square_meter>(v)
}

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

#[inline]
pub fn mps(v: f64) -> Velocity {
    use uom::si::velocity::meter_per_second;
    Velocity::new::<meter_per_second>(v)
}

pub mod constants {
    /// Standard gravity (m/s²).
    pub const G0_MPS2: f64 = 9.806_65;

    /// Specific gas constant of dry air (J/(kg·K)).
    pub const R_AIR: f64 = 287.055;

    /// Molar mass of dry air (kg/mol).
    pub const M_AIR: f64 = 0.028_966;

    /// Standard atmospheric pressure (Pa).
    pub const P_ATM: f64 = 101_325.0;

    /// Default reference temperature (K).
    pub const T_REF: f64 = 293.15;

    /// Standard air density (kg/m³), used only where a fixed reference
    /// density is part of the element definition.
    pub const RHO_STD: f64 = 1.2;
}
