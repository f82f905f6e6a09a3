//! Topological (Gauss–Bonnet) integral from an extracted `a₄`.
//!
//! On a maximally symmetric 4-manifold every quadratic curvature invariant is
//! fixed by the scalar curvature, so the Euler density is a fixed multiple of
//! the `a₄` density:
//!
//! ```text
//! χ = 1/(32π²) ∫ E  =  (360/29) · a₄ · Vol / (32π²)
//! ```
//!
//! This turns the fitted `a₄` into an integer-valued check (χ(S⁴) = 2,
//! χ(T⁴) = 0).

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::app::pipeline::{run_extraction, ExtractionRun};
use crate::domain::{Background, ExtractionConfig, TailMethod};
use crate::error::AppError;

/// Truncation order used for the reference S⁴ check.
pub const REFERENCE_NMAX: usize = 200;

/// Outcome of one topological-integral evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopologicalIntegral {
    pub background: Background,
    pub nmax: usize,
    pub a4: f64,
    pub volume: f64,
    pub observed: f64,
    pub expected: f64,
    pub abs_error: f64,
    /// `abs_error / |expected|`, or `abs_error` when `expected` is zero.
    pub rel_error: f64,
}

impl TopologicalIntegral {
    /// Evaluate the integral from a finished extraction.
    pub fn from_run(run: &ExtractionRun) -> Result<Self, AppError> {
        let background = run.config.background;
        let ratio = background.euler_density_per_a4().ok_or_else(|| {
            AppError::invalid(format!(
                "{} is not maximally symmetric; its Euler density is not fixed by a4.",
                background.display_name()
            ))
        })?;

        let volume = background.volume(run.config.radius);
        let observed = ratio * run.estimate.a4 * volume / (32.0 * PI * PI);
        let expected = background.euler_characteristic();
        let abs_error = (observed - expected).abs();
        let rel_error = if expected != 0.0 { abs_error / expected.abs() } else { abs_error };

        Ok(Self {
            background,
            nmax: run.config.nmax,
            a4: run.estimate.a4,
            volume,
            observed,
            expected,
            abs_error,
            rel_error,
        })
    }
}

/// Extraction settings for the S⁴ check at truncation `nmax`.
pub fn s4_config(nmax: usize, radius: f64, tail_method: TailMethod) -> ExtractionConfig {
    ExtractionConfig::with_default_window(Background::S4, nmax, radius, tail_method)
}

/// Run the extraction described by `config` and evaluate its integral.
pub fn evaluate(config: &ExtractionConfig) -> Result<(ExtractionRun, TopologicalIntegral), AppError> {
    let run = run_extraction(config)?;
    let integral = TopologicalIntegral::from_run(&run)?;
    log::info!(
        "χ({}) observed={:.6} expected={} rel_error={:.3e}",
        integral.background.display_name(),
        integral.observed,
        integral.expected,
        integral.rel_error
    );
    Ok((run, integral))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s4_at_reference_order_is_within_one_percent() {
        let config = s4_config(REFERENCE_NMAX, 1.0, TailMethod::LocalWeyl);
        assert_eq!(config.t_window, (5e-4, 5e-2));
        let (_, integral) = evaluate(&config).unwrap();
        assert_eq!(integral.expected, 2.0);
        assert!(integral.rel_error <= 0.01, "χ={}", integral.observed);
    }

    #[test]
    fn s4_check_is_radius_independent() {
        let (_, integral) = evaluate(&s4_config(REFERENCE_NMAX, 2.0, TailMethod::GlobalFit)).unwrap();
        assert!(integral.rel_error <= 0.01, "χ={}", integral.observed);
    }

    #[test]
    fn flat_torus_integral_vanishes() {
        let config = ExtractionConfig::new(Background::Torus4, 100, 1.0, (0.1, 0.8), TailMethod::LocalWeyl);
        let (_, integral) = evaluate(&config).unwrap();
        assert_eq!(integral.expected, 0.0);
        assert!(integral.abs_error < 0.01);
    }

    #[test]
    fn product_background_is_rejected() {
        let config = ExtractionConfig::new(Background::S3xs1, 60, 1.0, (2e-3, 0.1), TailMethod::LocalWeyl);
        assert!(matches!(evaluate(&config), Err(AppError::InvalidConfiguration(_))));
    }
}
