//! Zone nodes and their wind-pressure metadata.

use mz_core::units::constants::{R_AIR, T_REF};
use mz_core::NodeId;

/// What kind of pressure unknown a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Ordinary well-mixed room zone.
    Normal,
    /// Connection node without an air volume.
    Phantom,
    /// Outdoor boundary with known (Dirichlet) pressure.
    Ambient,
    /// Zone coupled to an external CFD domain.
    Cfd,
}

/// A well-mixed air zone (or the ambient boundary).
///
/// `pressure` is gauge relative to the atmospheric baseline carried by the
/// network's ambient conditions; `density` is derived state refreshed by
/// [`Node::update_density`].
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,

    /// Gauge pressure (Pa).
    pub pressure: f64,
    /// Temperature (K).
    pub temperature: f64,
    /// Base elevation of the zone (m).
    pub elevation: f64,
    /// Zone air volume (m³).
    pub volume: f64,
    /// Air density (kg/m³), from the ideal gas law.
    pub density: f64,
    /// Effective specific gas constant (J/(kg·K)). Stays at R_air unless a
    /// non-trace species shifts the local mixture.
    pub gas_constant: f64,

    /// Scalar wind pressure coefficient (used when no profile is set).
    pub wind_cp: f64,
    /// Sorted `(angle°, Cp)` profile; angle 0 = normal to the wall.
    cp_profile: Vec<(f64, f64)>,
    /// Wall normal azimuth (degrees clockwise from north).
    pub wall_azimuth: f64,
    /// Terrain/height wind correction factor Ch.
    pub terrain_factor: f64,
}

impl Node {
    pub fn new(id: NodeId, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            pressure: 0.0,
            temperature: T_REF,
            elevation: 0.0,
            volume: 0.0,
            density: 0.0,
            gas_constant: R_AIR,
            wind_cp: 0.0,
            cp_profile: Vec::new(),
            wall_azimuth: 0.0,
            terrain_factor: 1.0,
        }
    }

    /// Ambient nodes carry known pressure and drop out of the unknown set.
    pub fn is_known_pressure(&self) -> bool {
        self.kind == NodeKind::Ambient
    }

    /// Refresh density from the ideal gas law using the given atmospheric
    /// baseline: ρ = (P_atm + gauge) / (R · T), with R the node's effective
    /// gas constant.
    pub fn update_density(&mut self, atmospheric_pressure: f64) {
        self.density = (atmospheric_pressure + self.pressure) / (self.gas_constant * self.temperature);
    }

    /// Install a Cp(θ) profile; points are kept sorted by angle.
    pub fn set_cp_profile(&mut self, mut profile: Vec<(f64, f64)>) {
        profile.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        self.cp_profile = profile;
    }

    pub fn cp_profile(&self) -> &[(f64, f64)] {
        &self.cp_profile
    }

    /// Cp at a wind direction (degrees from north). Falls back to the scalar
    /// coefficient when no profile is installed.
    pub fn cp_at(&self, wind_direction: f64) -> f64 {
        if self.cp_profile.is_empty() {
            return self.wind_cp;
        }
        if self.cp_profile.len() == 1 {
            return self.cp_profile[0].1;
        }
        // Angle of attack relative to the wall normal, normalised to [0, 360).
        let mut theta = wind_direction - self.wall_azimuth;
        theta = theta.rem_euclid(360.0);

        for pair in self.cp_profile.windows(2) {
            let (a0, cp0) = pair[0];
            let (a1, cp1) = pair[1];
            if theta >= a0 && theta <= a1 {
                let span = a1 - a0;
                if span < 1e-10 {
                    return cp0;
                }
                let alpha = (theta - a0) / span;
                return cp0 * (1.0 - alpha) + cp1 * alpha;
            }
        }
        self.cp_profile.last().map(|p| p.1).unwrap_or(self.wind_cp)
    }

    /// Wind pressure on this facade: `Pw = ½·ρ·Ch·Cp(θ)·V²`.
    pub fn wind_pressure(&self, wind_speed: f64, wind_direction: f64) -> f64 {
        let cp = self.cp_at(wind_direction);
        0.5 * self.density * self.terrain_factor * cp * wind_speed * wind_speed
    }
}
