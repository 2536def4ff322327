//! Filter elements: power-law flow plus per-species contaminant removal.
//!
//! A filter's airflow behaviour is ordinary leakage; what distinguishes it is
//! the penetration factor the contaminant solver applies to mass carried
//! through the link: `penetration = 1 − (1 − bypass) · η`.

use crate::element::LinkFlow;
use crate::error::{ElementError, ElementResult};
use crate::power_law::PowerLawOrifice;

/// One `(loading, efficiency)` breakpoint of a loading-dependent filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadingPoint {
    /// Cumulative captured mass (kg).
    pub loading: f64,
    /// Removal efficiency at that loading (0..1).
    pub efficiency: f64,
}

/// Natural cubic spline through sorted breakpoints.
#[derive(Debug, Clone, PartialEq)]
struct Spline {
    xs: Vec<f64>,
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    d: Vec<f64>,
}

impl Spline {
    fn build(points: &[LoadingPoint]) -> Self {
        let n = points.len();
        let xs: Vec<f64> = points.iter().map(|p| p.loading).collect();
        let a: Vec<f64> = points.iter().map(|p| p.efficiency).collect();
        let mut b = vec![0.0; n];
        let mut c = vec![0.0; n];
        let mut d = vec![0.0; n];

        if n == 2 {
            let h = xs[1] - xs[0];
            b[0] = (a[1] - a[0]) / h;
            b[1] = b[0];
            return Self { xs, a, b, c, d };
        }

        let h: Vec<f64> = (0..n - 1).map(|i| xs[i + 1] - xs[i]).collect();
        let mut alpha = vec![0.0; n];
        for i in 1..n - 1 {
            alpha[i] =
                3.0 / h[i] * (a[i + 1] - a[i]) - 3.0 / h[i - 1] * (a[i] - a[i - 1]);
        }

        // Tridiagonal solve for the second-derivative coefficients.
        let mut l = vec![1.0; n];
        let mut mu = vec![0.0; n];
        let mut z = vec![0.0; n];
        for i in 1..n - 1 {
            l[i] = 2.0 * (xs[i + 1] - xs[i - 1]) - h[i - 1] * mu[i - 1];
            mu[i] = h[i] / l[i];
            z[i] = (alpha[i] - h[i - 1] * z[i - 1]) / l[i];
        }

        for j in (0..n - 1).rev() {
            c[j] = z[j] - mu[j] * c[j + 1];
            b[j] = (a[j + 1] - a[j]) / h[j] - h[j] * (c[j + 1] + 2.0 * c[j]) / 3.0;
            d[j] = (c[j + 1] - c[j]) / (3.0 * h[j]);
        }

        Self { xs, a, b, c, d }
    }

    fn eval(&self, x: f64) -> f64 {
        let n = self.xs.len();
        if x <= self.xs[0] {
            return self.a[0];
        }
        if x >= self.xs[n - 1] {
            return self.a[n - 1];
        }
        let mut i = 0;
        while i < n - 1 && !(x >= self.xs[i] && x <= self.xs[i + 1]) {
            i += 1;
        }
        let dx = x - self.xs[i];
        let val = self.a[i] + self.b[i] * dx + self.c[i] * dx * dx + self.d[i] * dx * dx * dx;
        val.clamp(0.0, 1.0)
    }
}

/// Particle filter with fixed per-species removal efficiencies.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleFilter {
    inner: PowerLawOrifice,
    efficiencies: Vec<f64>,
    bypass: f64,
}

impl ParticleFilter {
    /// `efficiencies[k]` is the removal efficiency for species index `k`
    /// (species beyond the table pass unfiltered).
    pub fn new(c: f64, n: f64, efficiencies: Vec<f64>) -> ElementResult<Self> {
        for &e in &efficiencies {
            if !(0.0..=1.0).contains(&e) {
                return Err(ElementError::InvalidArg {
                    what: "filter efficiency must be in [0, 1]",
                });
            }
        }
        Ok(Self {
            inner: PowerLawOrifice::new(c, n)?,
            efficiencies,
            bypass: 0.0,
        })
    }

    pub fn flow(&self, delta_p: f64, density: f64) -> LinkFlow {
        self.inner.flow(delta_p, density)
    }

    pub fn set_bypass(&mut self, bypass: f64) {
        self.bypass = bypass.clamp(0.0, 1.0);
    }

    pub fn bypass(&self) -> f64 {
        self.bypass
    }

    pub fn efficiency(&self, species_idx: usize) -> f64 {
        self.efficiencies.get(species_idx).copied().unwrap_or(0.0)
    }

    pub fn penetration(&self, species_idx: usize) -> f64 {
        1.0 - (1.0 - self.bypass) * self.efficiency(species_idx)
    }
}

/// Gaseous (sorbent) filter: efficiency is a cubic spline in cumulative
/// loading, optionally targeting a single species.
#[derive(Debug, Clone, PartialEq)]
pub struct GaseousFilter {
    inner: PowerLawOrifice,
    table: Vec<LoadingPoint>,
    spline: Spline,
    current_loading: f64,
    breakthrough_threshold: f64,
    target_species: Option<usize>,
    bypass: f64,
}

impl GaseousFilter {
    pub fn new(
        c: f64,
        n: f64,
        mut table: Vec<LoadingPoint>,
        breakthrough_threshold: f64,
    ) -> ElementResult<Self> {
        if table.len() < 2 {
            return Err(ElementError::InvalidArg {
                what: "gaseous filter loading table needs at least 2 points",
            });
        }
        table.sort_by(|a, b| a.loading.partial_cmp(&b.loading).unwrap());
        let spline = Spline::build(&table);
        Ok(Self {
            inner: PowerLawOrifice::new(c, n)?,
            table,
            spline,
            current_loading: 0.0,
            breakthrough_threshold,
            target_species: None,
            bypass: 0.0,
        })
    }

    /// Restrict removal to one species index (others pass unfiltered).
    pub fn with_target_species(mut self, species_idx: usize) -> Self {
        self.target_species = Some(species_idx);
        self
    }

    pub fn flow(&self, delta_p: f64, density: f64) -> LinkFlow {
        self.inner.flow(delta_p, density)
    }

    pub fn set_bypass(&mut self, bypass: f64) {
        self.bypass = bypass.clamp(0.0, 1.0);
    }

    pub fn bypass(&self) -> f64 {
        self.bypass
    }

    pub fn loading(&self) -> f64 {
        self.current_loading
    }

    /// Accrue captured mass (kg); negative totals are floored at zero.
    pub fn add_loading(&mut self, mass: f64) {
        self.current_loading = (self.current_loading + mass).max(0.0);
    }

    pub fn efficiency(&self) -> f64 {
        self.spline.eval(self.current_loading)
    }

    /// True once the sorbent has degraded below its breakthrough threshold.
    pub fn is_breakthrough(&self) -> bool {
        self.efficiency() < self.breakthrough_threshold
    }

    pub fn penetration(&self, species_idx: usize) -> f64 {
        if let Some(target) = self.target_species {
            if target != species_idx {
                return 1.0;
            }
        }
        1.0 - (1.0 - self.bypass) * self.efficiency()
    }
}

/// UVGI chamber parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct UvgiParams {
    /// Susceptibility constant (m²/J).
    pub k: f64,
    /// Average irradiance in the chamber (W/m²).
    pub irradiance: f64,
    /// Irradiated chamber volume (m³).
    pub chamber_volume: f64,
    /// Temperature correction polynomial f(T); empty = 1.
    pub temp_coeffs: Vec<f64>,
    /// Flow-rate correction polynomial g(Q); empty = 1.
    pub flow_coeffs: Vec<f64>,
    /// Lamp output decline per hour of age.
    pub aging_rate: f64,
    /// Current lamp age (h).
    pub lamp_age_hours: f64,
}

/// Ultraviolet germicidal irradiation section: survival follows the UV dose
/// `exp(-k·I·t_res)`, with polynomial corrections applied as exponent
/// modifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct UvgiFilter {
    inner: PowerLawOrifice,
    params: UvgiParams,
    bypass: f64,
}

impl UvgiFilter {
    pub fn new(c: f64, n: f64, params: UvgiParams) -> ElementResult<Self> {
        if params.chamber_volume <= 0.0 {
            return Err(ElementError::InvalidArg {
                what: "UVGI chamber volume must be positive",
            });
        }
        if params.irradiance < 0.0 {
            return Err(ElementError::InvalidArg {
                what: "UVGI irradiance must be non-negative",
            });
        }
        Ok(Self {
            inner: PowerLawOrifice::new(c, n)?,
            params,
            bypass: 0.0,
        })
    }

    pub fn flow(&self, delta_p: f64, density: f64) -> LinkFlow {
        self.inner.flow(delta_p, density)
    }

    pub fn set_bypass(&mut self, bypass: f64) {
        self.bypass = bypass.clamp(0.0, 1.0);
    }

    pub fn bypass(&self) -> f64 {
        self.bypass
    }

    fn eval_poly(coeffs: &[f64], x: f64) -> f64 {
        if coeffs.is_empty() {
            return 1.0;
        }
        let mut result = 0.0;
        let mut x_pow = 1.0;
        for &c in coeffs {
            result += c * x_pow;
            x_pow *= x;
        }
        result
    }

    /// Surviving fraction of organisms for a volumetric flow (m³/s) at a
    /// given air temperature (K).
    pub fn survival_fraction(&self, flow_rate: f64, temperature: f64) -> f64 {
        let p = &self.params;
        if flow_rate <= 0.0 || p.k <= 0.0 || p.irradiance <= 0.0 {
            return 1.0;
        }
        let t_res = p.chamber_volume / flow_rate;
        let s_base = (-p.k * p.irradiance * t_res).exp();

        let f_t = Self::eval_poly(&p.temp_coeffs, temperature).max(0.0);
        let g_u = Self::eval_poly(&p.flow_coeffs, flow_rate).max(0.0);
        let h_age = (1.0 - p.aging_rate * p.lamp_age_hours).max(0.0);

        s_base.powf(f_t * g_u * h_age).clamp(0.0, 1.0)
    }

    pub fn efficiency(&self, flow_rate: f64, temperature: f64) -> f64 {
        1.0 - self.survival_fraction(flow_rate, temperature)
    }

    pub fn penetration(&self, flow_rate: f64, temperature: f64) -> f64 {
        1.0 - (1.0 - self.bypass) * self.efficiency(flow_rate, temperature)
    }
}

/// One stage of a cascaded filter bank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterStage {
    /// Base removal efficiency (0..1).
    pub base_efficiency: f64,
    /// Cumulative captured mass (kg).
    pub mass_loading: f64,
    /// Capacity before breakthrough (kg); 0 = unlimited.
    pub max_loading: f64,
    /// Exponential efficiency decay with loading (1/kg); 0 = constant.
    pub decay_rate: f64,
}

impl FilterStage {
    pub fn new(base_efficiency: f64, max_loading: f64, decay_rate: f64) -> Self {
        Self {
            base_efficiency,
            mass_loading: 0.0,
            max_loading,
            decay_rate,
        }
    }

    pub fn current_efficiency(&self) -> f64 {
        if self.decay_rate > 0.0 && self.mass_loading > 0.0 {
            return self.base_efficiency * (-self.decay_rate * self.mass_loading).exp();
        }
        if self.max_loading > 0.0 && self.mass_loading >= self.max_loading {
            return 0.0;
        }
        self.base_efficiency
    }

    pub fn add_loading(&mut self, mass_captured: f64) {
        self.mass_loading += mass_captured;
    }
}

/// Multi-stage filter bank: combined efficiency `1 − Π(1 − η_k)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SuperFilter {
    inner: PowerLawOrifice,
    stages: Vec<FilterStage>,
    bypass: f64,
}

impl SuperFilter {
    pub fn new(c: f64, n: f64, stages: Vec<FilterStage>) -> ElementResult<Self> {
        Ok(Self {
            inner: PowerLawOrifice::new(c, n)?,
            stages,
            bypass: 0.0,
        })
    }

    pub fn flow(&self, delta_p: f64, density: f64) -> LinkFlow {
        self.inner.flow(delta_p, density)
    }

    pub fn set_bypass(&mut self, bypass: f64) {
        self.bypass = bypass.clamp(0.0, 1.0);
    }

    pub fn bypass(&self) -> f64 {
        self.bypass
    }

    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    pub fn total_efficiency(&self) -> f64 {
        let penetration: f64 = self
            .stages
            .iter()
            .map(|s| 1.0 - s.current_efficiency())
            .product();
        1.0 - penetration
    }

    /// Distribute captured mass across stages front to back, each stage
    /// taking its current efficiency's share of what reaches it.
    pub fn update_loading(&mut self, total_mass_captured: f64) {
        let mut remaining = total_mass_captured;
        for stage in &mut self.stages {
            let captured = remaining * stage.current_efficiency();
            stage.add_loading(captured);
            remaining -= captured;
            if remaining <= 0.0 {
                break;
            }
        }
    }

    pub fn penetration(&self, _species_idx: usize) -> f64 {
        1.0 - (1.0 - self.bypass) * self.total_efficiency()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn particle_filter_per_species() {
        let f = ParticleFilter::new(0.01, 0.5, vec![0.9, 0.2]).unwrap();
        assert!((f.penetration(0) - 0.1).abs() < 1e-12);
        assert!((f.penetration(1) - 0.8).abs() < 1e-12);
        // Species beyond the table pass through
        assert_eq!(f.penetration(5), 1.0);
    }

    #[test]
    fn bypass_degrades_removal() {
        let mut f = ParticleFilter::new(0.01, 0.5, vec![1.0]).unwrap();
        assert!((f.penetration(0) - 0.0).abs() < 1e-12);
        f.set_bypass(0.5);
        assert!((f.penetration(0) - 0.5).abs() < 1e-12);
        f.set_bypass(1.0);
        assert!((f.penetration(0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn gaseous_filter_efficiency_falls_with_loading() {
        let mut f = GaseousFilter::new(
            0.01,
            0.5,
            vec![
                LoadingPoint { loading: 0.0, efficiency: 0.95 },
                LoadingPoint { loading: 1.0, efficiency: 0.5 },
                LoadingPoint { loading: 2.0, efficiency: 0.05 },
            ],
            0.1,
        )
        .unwrap();
        let fresh = f.efficiency();
        assert!((fresh - 0.95).abs() < 1e-9);
        assert!(!f.is_breakthrough());
        f.add_loading(2.5);
        assert!(f.efficiency() < fresh);
        assert!(f.is_breakthrough());
    }

    #[test]
    fn gaseous_filter_target_species() {
        let f = GaseousFilter::new(
            0.01,
            0.5,
            vec![
                LoadingPoint { loading: 0.0, efficiency: 0.9 },
                LoadingPoint { loading: 1.0, efficiency: 0.9 },
            ],
            0.0,
        )
        .unwrap()
        .with_target_species(1);
        assert_eq!(f.penetration(0), 1.0);
        assert!((f.penetration(1) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn uvgi_dose_response() {
        let f = UvgiFilter::new(
            0.01,
            0.5,
            UvgiParams {
                k: 0.001,
                irradiance: 50.0,
                chamber_volume: 0.5,
                temp_coeffs: vec![],
                flow_coeffs: vec![],
                aging_rate: 0.0,
                lamp_age_hours: 0.0,
            },
        )
        .unwrap();
        // Slower flow = longer residence = more kill
        let slow = f.efficiency(0.1, 293.15);
        let fast = f.efficiency(1.0, 293.15);
        assert!(slow > fast);
        assert!(slow > 0.0 && slow < 1.0);
        // No flow: nothing passes the lamp section, survival = 1
        assert_eq!(f.survival_fraction(0.0, 293.15), 1.0);
    }

    #[test]
    fn super_filter_cascade() {
        let f = SuperFilter::new(
            0.01,
            0.5,
            vec![FilterStage::new(0.5, 0.0, 0.0), FilterStage::new(0.5, 0.0, 0.0)],
        )
        .unwrap();
        assert!((f.total_efficiency() - 0.75).abs() < 1e-12);
        assert!((f.penetration(0) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn super_filter_loading_breakthrough() {
        let mut f = SuperFilter::new(0.01, 0.5, vec![FilterStage::new(0.9, 1.0, 0.0)]).unwrap();
        f.update_loading(2.0);
        // Single stage over capacity -> efficiency collapses to 0
        assert!((f.total_efficiency() - 0.0).abs() < 1e-12);
    }
}
