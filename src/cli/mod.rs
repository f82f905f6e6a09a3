//! Command-line parsing for the heat-trace tools.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! numerics: every subcommand's flags map onto a plain config struct.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{
    Background, DispersionMetric, ExtractionConfig, FitWindow, TailMethod, DEFAULT_DISPERSION_FLOOR,
    DEFAULT_DISPERSION_THRESHOLD, DEFAULT_EXPANSION_TERMS, DEFAULT_GRID_POINTS, DEFAULT_NEIGHBOR_SPAN,
    DEFAULT_RESIDUAL_BOUND, DEFAULT_TAIL_FIT_FRACTION, DEFAULT_TIE_TOLERANCE, DEFAULT_WINDOW_WIDTHS,
};
use crate::error::AppError;
use crate::signature::SignatureConfig;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "ht", version, about = "Heat-kernel coefficient extraction on fixed backgrounds")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract (a0, a2, a4) from a truncated heat trace and compare with the closed form.
    Extract(ExtractArgs),
    /// Evaluate the Gauss–Bonnet integral from the extracted a4.
    Topology(TopologyArgs),
    /// Run the finite-N spectral-signature benchmark.
    Signature(SignatureArgs),
    /// Run the reference tolerance checks; exits 1 if any fails.
    Validate,
}

/// Options for a single extraction.
#[derive(Debug, Args, Clone)]
pub struct ExtractArgs {
    /// Background geometry.
    #[arg(short = 'b', long, value_enum, default_value_t = Background::Torus4)]
    pub background: Background,

    /// Truncation order of the spectrum.
    #[arg(short = 'n', long, default_value_t = 100, env = "HT_NMAX")]
    pub nmax: usize,

    /// Radius of the background.
    #[arg(short = 'R', long, default_value_t = 1.0)]
    pub radius: f64,

    /// Lower end of the sampled t-range (default depends on background and Nmax).
    #[arg(long)]
    pub t_min: Option<f64>,

    /// Upper end of the sampled t-range (default depends on background and Nmax).
    #[arg(long)]
    pub t_max: Option<f64>,

    /// Tail-completion strategy.
    #[arg(long, value_enum, default_value_t = TailMethod::LocalWeyl, env = "HT_TAIL")]
    pub tail: TailMethod,

    /// Number of log-spaced grid points.
    #[arg(long, default_value_t = DEFAULT_GRID_POINTS)]
    pub grid_points: usize,

    /// Sub-window widths scanned by the plateau search (comma separated).
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_WINDOW_WIDTHS)]
    pub widths: Vec<usize>,

    /// Same-width neighbours on each side used for the dispersion.
    #[arg(long, default_value_t = DEFAULT_NEIGHBOR_SPAN)]
    pub neighbor_span: usize,

    /// Dispersion metric.
    #[arg(long, value_enum, default_value_t = DispersionMetric::RelativeStd)]
    pub dispersion: DispersionMetric,

    /// Floor of the relative dispersion denominator.
    #[arg(long, default_value_t = DEFAULT_DISPERSION_FLOOR)]
    pub dispersion_floor: f64,

    /// Largest dispersion that still counts as a plateau.
    #[arg(long, default_value_t = DEFAULT_DISPERSION_THRESHOLD)]
    pub threshold: f64,

    /// Dispersions within this distance of the minimum are ties.
    #[arg(long, default_value_t = DEFAULT_TIE_TOLERANCE)]
    pub tie_tolerance: f64,

    /// Polynomial terms in the expansion (3 = a0..a4).
    #[arg(long, default_value_t = DEFAULT_EXPANSION_TERMS)]
    pub terms: usize,

    /// Largest acceptable RMS residual of the final fit.
    #[arg(long, default_value_t = DEFAULT_RESIDUAL_BOUND)]
    pub residual_bound: f64,

    /// Upper fraction of the eigenvalue range used by `global_fit`.
    #[arg(long, default_value_t = DEFAULT_TAIL_FIT_FRACTION)]
    pub tail_fit_fraction: f64,

    /// Fit this window instead of searching, as `T_MIN,T_MAX`.
    #[arg(long, value_delimiter = ',', value_name = "T_MIN,T_MAX")]
    pub window: Option<Vec<f64>>,

    /// Append the estimate to a CSV file.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Write a JSON run manifest.
    #[arg(long)]
    pub manifest: Option<PathBuf>,
}

impl ExtractArgs {
    pub fn to_config(&self) -> Result<ExtractionConfig, AppError> {
        let (default_min, default_max) = self.background.default_t_window(self.radius, self.nmax);
        let t_window = (self.t_min.unwrap_or(default_min), self.t_max.unwrap_or(default_max));

        let mut config = ExtractionConfig::new(self.background, self.nmax, self.radius, t_window, self.tail);
        config.grid_points = self.grid_points;
        config.window_widths = self.widths.clone();
        config.neighbor_span = self.neighbor_span;
        config.dispersion = self.dispersion;
        config.dispersion_floor = self.dispersion_floor;
        config.dispersion_threshold = self.threshold;
        config.tie_tolerance = self.tie_tolerance;
        config.expansion_terms = self.terms;
        config.residual_bound = self.residual_bound;
        config.tail_fit_fraction = self.tail_fit_fraction;
        config.window_override = match self.window.as_deref() {
            None => None,
            Some(&[t_min, t_max]) => Some(FitWindow::new(t_min, t_max)?),
            Some(other) => {
                return Err(AppError::invalid(format!(
                    "--window takes exactly two values, got {}.",
                    other.len()
                )));
            }
        };
        Ok(config)
    }
}

/// Options for the topological-integral check.
#[derive(Debug, Args, Clone)]
pub struct TopologyArgs {
    /// Background geometry (must be maximally symmetric).
    #[arg(short = 'b', long, value_enum, default_value_t = Background::S4)]
    pub background: Background,

    /// Truncation order of the spectrum.
    #[arg(short = 'n', long, default_value_t = 200)]
    pub nmax: usize,

    /// Radius of the background.
    #[arg(short = 'R', long, default_value_t = 1.0)]
    pub radius: f64,

    /// Tail-completion strategy.
    #[arg(long, value_enum, default_value_t = TailMethod::LocalWeyl, env = "HT_TAIL")]
    pub tail: TailMethod,

    /// Write a JSON run manifest including the integral.
    #[arg(long)]
    pub manifest: Option<PathBuf>,
}

impl TopologyArgs {
    pub fn to_config(&self) -> ExtractionConfig {
        ExtractionConfig::with_default_window(self.background, self.nmax, self.radius, self.tail)
    }
}

/// Options for the spectral-signature benchmark.
#[derive(Debug, Args, Clone)]
pub struct SignatureArgs {
    /// Block size; operators are 2*N_BLOCK square.
    #[arg(long, default_value_t = 300)]
    pub n_block: usize,

    #[arg(long, default_value_t = 2025)]
    pub seed: u64,

    /// Regulator scale in f(x) = x exp(-x^2/Lambda^2).
    #[arg(long, default_value_t = 5.0)]
    pub lambda: f64,

    /// Amplitude of the symmetric perturbation V.
    #[arg(long, default_value_t = 1e-2)]
    pub perturb_eps: f64,

    /// Generator amplitude of the rotation commuting with S.
    #[arg(long, default_value_t = 1e-1)]
    pub unitary_eps: f64,

    /// Directory for the JSON and CSV records.
    #[arg(long, env = "HT_OUT_DIR", default_value = "results")]
    pub out_dir: PathBuf,

    /// Print the results without writing files.
    #[arg(long)]
    pub no_save: bool,
}

impl SignatureArgs {
    pub fn to_config(&self) -> SignatureConfig {
        SignatureConfig {
            n_block: self.n_block,
            seed: self.seed,
            lambda: self.lambda,
            perturb_eps: self.perturb_eps,
            unitary_eps: self.unitary_eps,
        }
    }
}
