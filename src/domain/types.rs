//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during extraction
//! - exported to JSON/CSV
//! - reloaded later for comparisons against published tolerances

use std::f64::consts::PI;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Fixed geometric background whose scalar Laplacian spectrum is known in closed form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Background {
    /// Flat 4-torus with side length `2πR`.
    Torus4,
    /// `S³(R) × S¹(R)`.
    S3xs1,
    /// Round 4-sphere of radius `R`.
    S4,
}

impl Background {
    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            Background::Torus4 => "T^4",
            Background::S3xs1 => "S^3 x S^1",
            Background::S4 => "S^4",
        }
    }

    pub fn dimension(self) -> usize {
        4
    }

    pub fn volume(self, radius: f64) -> f64 {
        let r4 = radius.powi(4);
        match self {
            Background::Torus4 => (2.0 * PI).powi(4) * r4,
            // vol(S³) = 2π²R³, vol(S¹) = 2πR
            Background::S3xs1 => 4.0 * PI.powi(3) * r4,
            Background::S4 => 8.0 * PI * PI / 3.0 * r4,
        }
    }

    /// Scalar curvature (constant on all three backgrounds).
    pub fn scalar_curvature(self, radius: f64) -> f64 {
        let inv_r2 = 1.0 / (radius * radius);
        match self {
            Background::Torus4 => 0.0,
            Background::S3xs1 => 6.0 * inv_r2,
            Background::S4 => 12.0 * inv_r2,
        }
    }

    /// Closed-form heat coefficients of the scalar Laplacian, per unit volume.
    ///
    /// `a₂ = R/6` and `a₄ = (2|Riem|² − 2|Ric|² + 5R²)/360`.
    pub fn exact_coefficients(self, radius: f64) -> ExactCoefficients {
        let inv_r2 = 1.0 / (radius * radius);
        let inv_r4 = inv_r2 * inv_r2;
        let (a2, a4) = match self {
            Background::Torus4 => (0.0, 0.0),
            Background::S3xs1 => (inv_r2, 0.5 * inv_r4),
            Background::S4 => (2.0 * inv_r2, 29.0 / 15.0 * inv_r4),
        };
        ExactCoefficients { a0: 1.0, a2, a4 }
    }

    pub fn euler_characteristic(self) -> f64 {
        match self {
            Background::Torus4 | Background::S3xs1 => 0.0,
            Background::S4 => 2.0,
        }
    }

    /// Smallest non-zero eigenvalue `λ₁` of the scalar Laplacian.
    pub fn spectral_gap(self, radius: f64) -> f64 {
        let inv_r2 = 1.0 / (radius * radius);
        match self {
            Background::Torus4 | Background::S3xs1 => inv_r2,
            Background::S4 => 4.0 * inv_r2,
        }
    }

    /// t-range whose log grid brackets the asymptotic regime at truncation `nmax`.
    ///
    /// Anchored on reference orders (T⁴ at 100, S³×S¹ at 60, S⁴ at 200) and
    /// scaled like the inverse truncation edge: `1/nmax` on T⁴, `1/nmax²` on
    /// the curved backgrounds. The upper end never passes
    /// `DEFAULT_GAP_FRACTION / λ₁`; curved windows that would are shifted down
    /// whole, and the T⁴ lower end is clamped to half the upper end.
    pub fn default_t_window(self, radius: f64, nmax: usize) -> (f64, f64) {
        let r2 = radius * radius;
        let n = nmax.max(1) as f64;
        let cap = DEFAULT_GAP_FRACTION / self.spectral_gap(radius);
        match self {
            Background::Torus4 => {
                let t_max = cap;
                ((0.1 * (100.0 / n) * r2).min(0.5 * t_max), t_max)
            }
            Background::S3xs1 | Background::S4 => {
                let (lo, hi, anchor) = match self {
                    Background::S3xs1 => (2e-3, 0.1, 60.0),
                    _ => (5e-4, 5e-2, 200.0),
                };
                let scale = (anchor / n).powi(2) * r2;
                let shrink = (cap / (hi * scale)).min(1.0);
                (lo * scale * shrink, hi * scale * shrink)
            }
        }
    }

    /// Ratio between the Gauss–Bonnet density and the `a₄` density.
    ///
    /// Only defined for maximally symmetric backgrounds, where every curvature
    /// invariant is fixed by the scalar curvature: `|Riem|² = R²/6`,
    /// `|Ric|² = R²/4`, so `E = R²/6` and `a₄ = 29R²/2160`.
    pub fn euler_density_per_a4(self) -> Option<f64> {
        match self {
            Background::Torus4 | Background::S4 => Some(360.0 / 29.0),
            Background::S3xs1 => None,
        }
    }
}

/// Which tail-completion strategy to apply beyond the truncation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TailMethod {
    #[value(name = "local_weyl")]
    LocalWeyl,
    #[value(name = "global_fit")]
    GlobalFit,
}

impl TailMethod {
    pub fn display_name(self) -> &'static str {
        match self {
            TailMethod::LocalWeyl => "local_weyl",
            TailMethod::GlobalFit => "global_fit",
        }
    }
}

/// How the spread of neighbouring window estimates is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DispersionMetric {
    /// Standard deviation divided by `max(|mean|, floor)`.
    #[value(name = "relative_std")]
    RelativeStd,
    /// Plain standard deviation.
    #[value(name = "absolute_std")]
    AbsoluteStd,
}

/// Interval `[t_min, t_max]` over which a coefficient estimate is trusted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitWindow {
    pub t_min: f64,
    pub t_max: f64,
}

impl FitWindow {
    pub fn new(t_min: f64, t_max: f64) -> Result<Self, AppError> {
        if !(t_min.is_finite() && t_max.is_finite() && t_min > 0.0 && t_max > t_min) {
            return Err(AppError::invalid(format!(
                "Invalid t-window: [{t_min}, {t_max}] (must be finite, >0, and t_max>t_min)."
            )));
        }
        Ok(Self { t_min, t_max })
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.t_min && t <= self.t_max
    }

    /// `sqrt(t_min * t_max)`: the midpoint on a log axis.
    pub fn geometric_center(&self) -> f64 {
        (self.t_min * self.t_max).sqrt()
    }
}

/// One point of the heat trace: `K(t) = Σ m·exp(−λt)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatTraceSample {
    pub t: f64,
    pub trace: f64,
}

/// Fitted heat coefficients, normalized per unit volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoefficientEstimate {
    pub a0: f64,
    pub a2: f64,
    pub a4: f64,
    pub rms_residual: f64,
    pub max_abs_residual: f64,
    pub n_points: usize,
}

impl CoefficientEstimate {
    pub fn coefficients(&self) -> [f64; 3] {
        [self.a0, self.a2, self.a4]
    }
}

/// Closed-form reference coefficients, normalized per unit volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExactCoefficients {
    pub a0: f64,
    pub a2: f64,
    pub a4: f64,
}

pub const DEFAULT_GRID_POINTS: usize = 64;
pub const DEFAULT_WINDOW_WIDTHS: [usize; 3] = [8, 12, 16];
pub const DEFAULT_NEIGHBOR_SPAN: usize = 2;
pub const DEFAULT_DISPERSION_FLOOR: f64 = 1.0;
pub const DEFAULT_DISPERSION_THRESHOLD: f64 = 1e-3;
pub const DEFAULT_TIE_TOLERANCE: f64 = 1e-6;
pub const DEFAULT_EXPANSION_TERMS: usize = 4;
pub const DEFAULT_RESIDUAL_BOUND: f64 = 1e-6;
pub const DEFAULT_TAIL_FIT_FRACTION: f64 = 0.75;

/// Default windows end at this fraction of `1/λ₁`.
pub const DEFAULT_GAP_FRACTION: f64 = 0.8;
/// Largest `t·λ₁` a plateau candidate may reach. Beyond it the zero mode
/// dominates and `(4πt)^{d/2}K/Vol` degenerates into a pure power of `t`.
pub const SPECTRAL_GAP_CEILING: f64 = 1.0;

/// A full extraction run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults) or built directly by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub background: Background,
    /// Truncation order of the spectrum.
    pub nmax: usize,
    /// Radius `R` of the background.
    pub radius: f64,
    /// Full t-range sampled by the log grid.
    pub t_window: (f64, f64),
    pub tail_method: TailMethod,

    pub grid_points: usize,
    /// Sub-window widths (in grid points) scanned by the plateau search.
    pub window_widths: Vec<usize>,
    /// Same-width neighbours on each side used to measure dispersion.
    pub neighbor_span: usize,
    pub dispersion: DispersionMetric,
    pub dispersion_floor: f64,
    pub dispersion_threshold: f64,
    /// Dispersions within this distance of the minimum count as equal.
    pub tie_tolerance: f64,

    /// Polynomial terms in the expansion (3 = a₀..a₄, 4 adds a₆, ...).
    pub expansion_terms: usize,
    /// Largest acceptable RMS residual of the final fit.
    pub residual_bound: f64,
    /// Skip the plateau search and fit this window instead.
    pub window_override: Option<FitWindow>,
    /// Upper fraction of `[0, Λ]` whose levels feed the `global_fit` tail model.
    pub tail_fit_fraction: f64,
}

impl ExtractionConfig {
    pub fn new(
        background: Background,
        nmax: usize,
        radius: f64,
        t_window: (f64, f64),
        tail_method: TailMethod,
    ) -> Self {
        Self {
            background,
            nmax,
            radius,
            t_window,
            tail_method,
            grid_points: DEFAULT_GRID_POINTS,
            window_widths: DEFAULT_WINDOW_WIDTHS.to_vec(),
            neighbor_span: DEFAULT_NEIGHBOR_SPAN,
            dispersion: DispersionMetric::RelativeStd,
            dispersion_floor: DEFAULT_DISPERSION_FLOOR,
            dispersion_threshold: DEFAULT_DISPERSION_THRESHOLD,
            tie_tolerance: DEFAULT_TIE_TOLERANCE,
            expansion_terms: DEFAULT_EXPANSION_TERMS,
            residual_bound: DEFAULT_RESIDUAL_BOUND,
            window_override: None,
            tail_fit_fraction: DEFAULT_TAIL_FIT_FRACTION,
        }
    }

    /// Same as [`ExtractionConfig::new`] with [`Background::default_t_window`].
    pub fn with_default_window(background: Background, nmax: usize, radius: f64, tail_method: TailMethod) -> Self {
        Self::new(background, nmax, radius, background.default_t_window(radius, nmax), tail_method)
    }

    pub fn full_range(&self) -> Result<FitWindow, AppError> {
        FitWindow::new(self.t_window.0, self.t_window.1)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.nmax == 0 {
            return Err(AppError::invalid("Nmax must be > 0."));
        }
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(AppError::invalid(format!("Radius must be finite and > 0, got {}.", self.radius)));
        }
        self.full_range()?;
        if self.grid_points == 0 {
            return Err(AppError::invalid("The t-grid is empty (grid_points = 0)."));
        }
        if self.neighbor_span == 0 {
            return Err(AppError::invalid("neighbor_span must be > 0."));
        }
        if self.expansion_terms < 3 {
            return Err(AppError::invalid("expansion_terms must be >= 3 (a0, a2, a4)."));
        }
        if self.window_override.is_none() {
            if self.window_widths.is_empty() {
                return Err(AppError::invalid("At least one window width is required."));
            }
            if let Some(&w) = self.window_widths.iter().find(|&&w| w <= self.expansion_terms) {
                return Err(AppError::invalid(format!(
                    "Window width {w} must exceed expansion_terms={}.",
                    self.expansion_terms
                )));
            }
        }
        if !(self.dispersion_floor.is_finite() && self.dispersion_floor > 0.0) {
            return Err(AppError::invalid("dispersion_floor must be finite and > 0."));
        }
        if !(self.dispersion_threshold.is_finite() && self.dispersion_threshold >= 0.0) {
            return Err(AppError::invalid("dispersion_threshold must be finite and >= 0."));
        }
        if !(self.tie_tolerance.is_finite() && self.tie_tolerance >= 0.0) {
            return Err(AppError::invalid("tie_tolerance must be finite and >= 0."));
        }
        if !(self.residual_bound.is_finite() && self.residual_bound > 0.0) {
            return Err(AppError::invalid("residual_bound must be finite and > 0."));
        }
        if !(self.tail_fit_fraction > 0.0 && self.tail_fit_fraction <= 1.0) {
            return Err(AppError::invalid("tail_fit_fraction must lie in (0, 1]."));
        }
        Ok(())
    }
}
