//! Seeley–DeWitt coefficient extraction for a single window.
//!
//! Given heat-trace samples `(t_i, K(t_i))` we form the normalized trace
//!
//! ```text
//! y(t) = (4πt)^{d/2} K(t) / Vol  ≈  a₀ + a₂ t + a₄ t² + a₆ t³ + …
//! ```
//!
//! and solve a small polynomial least squares problem. Keeping a few terms
//! beyond `a₄` absorbs the curvature of the higher-order series so the
//! reported `a₄` is not biased by the truncation of the expansion.

use std::f64::consts::PI;

use crate::domain::{CoefficientEstimate, ExtractionConfig, HeatTraceSample};
use crate::error::AppError;
use crate::math::{eval_polynomial, fit_polynomial};
use crate::spectrum::EigenvalueSpectrum;

#[derive(Debug, Clone)]
pub struct CoefficientExtractor {
    dimension: usize,
    volume: f64,
    terms: usize,
    residual_bound: f64,
}

impl CoefficientExtractor {
    pub fn new(dimension: usize, volume: f64, terms: usize, residual_bound: f64) -> Result<Self, AppError> {
        if dimension == 0 {
            return Err(AppError::invalid("Dimension must be > 0."));
        }
        if !(volume.is_finite() && volume > 0.0) {
            return Err(AppError::invalid("Volume must be finite and > 0."));
        }
        if terms < 3 {
            return Err(AppError::invalid("At least 3 expansion terms are needed for a0, a2, a4."));
        }
        if !(residual_bound.is_finite() && residual_bound > 0.0) {
            return Err(AppError::invalid("Residual bound must be finite and > 0."));
        }
        Ok(Self {
            dimension,
            volume,
            terms,
            residual_bound,
        })
    }

    pub fn for_spectrum(spectrum: &EigenvalueSpectrum, config: &ExtractionConfig) -> Result<Self, AppError> {
        Self::new(
            spectrum.dimension(),
            spectrum.volume(),
            config.expansion_terms,
            config.residual_bound,
        )
    }

    /// `(4πt)^{d/2} K(t) / Vol`.
    pub fn normalize(&self, sample: &HeatTraceSample) -> f64 {
        (4.0 * PI * sample.t).powf(self.dimension as f64 / 2.0) * sample.trace / self.volume
    }

    /// Fit without the residual guard.
    ///
    /// Used for plateau candidates, where a window on the truncation edge is
    /// expected to fit badly and is filtered by dispersion instead.
    pub fn fit_raw(&self, samples: &[HeatTraceSample]) -> Option<CoefficientEstimate> {
        if samples.len() <= self.terms {
            return None;
        }
        let ts: Vec<f64> = samples.iter().map(|s| s.t).collect();
        let ys: Vec<f64> = samples.iter().map(|s| self.normalize(s)).collect();
        if ys.iter().any(|y| !y.is_finite()) {
            return None;
        }

        let coeffs = fit_polynomial(&ts, &ys, self.terms)?;

        let mut sse = 0.0;
        let mut max_abs: f64 = 0.0;
        for (&t, &y) in ts.iter().zip(ys.iter()) {
            let r = y - eval_polynomial(&coeffs, t);
            sse += r * r;
            max_abs = max_abs.max(r.abs());
        }
        let rms = (sse / ts.len() as f64).sqrt();

        Some(CoefficientEstimate {
            a0: coeffs[0],
            a2: coeffs[1],
            a4: coeffs[2],
            rms_residual: rms,
            max_abs_residual: max_abs,
            n_points: ts.len(),
        })
    }

    /// Fit the window and enforce the residual bound.
    pub fn fit(&self, samples: &[HeatTraceSample]) -> Result<CoefficientEstimate, AppError> {
        if samples.len() <= self.terms {
            return Err(AppError::invalid(format!(
                "Fit window holds {} points; need more than {} for {} expansion terms.",
                samples.len(),
                self.terms,
                self.terms
            )));
        }
        let estimate = self.fit_raw(samples).ok_or(AppError::FitDivergence {
            rms: f64::NAN,
            bound: self.residual_bound,
        })?;

        if !(estimate.rms_residual.is_finite() && estimate.rms_residual <= self.residual_bound) {
            return Err(AppError::FitDivergence {
                rms: estimate.rms_residual,
                bound: self.residual_bound,
            });
        }
        Ok(estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Samples of `K(t) = Vol (4πt)^{-2} (a₀ + a₂ t + a₄ t² + a₆ t³)`.
    fn synthetic(coeffs: &[f64], volume: f64, ts: &[f64]) -> Vec<HeatTraceSample> {
        ts.iter()
            .map(|&t| HeatTraceSample {
                t,
                trace: volume * eval_polynomial(coeffs, t) / (4.0 * PI * t).powi(2),
            })
            .collect()
    }

    #[test]
    fn recovers_polynomial_coefficients() {
        let ts: Vec<f64> = (0..16).map(|i| 0.002 * 1.1_f64.powi(i)).collect();
        let samples = synthetic(&[1.0, 1.0, 0.5, 1.0 / 6.0], 10.0, &ts);
        let ex = CoefficientExtractor::new(4, 10.0, 4, 1e-8).unwrap();
        let est = ex.fit(&samples).unwrap();
        assert!((est.a0 - 1.0).abs() < 1e-10);
        assert!((est.a2 - 1.0).abs() < 1e-7);
        assert!((est.a4 - 0.5).abs() < 1e-5);
        assert_eq!(est.n_points, 16);
        assert!(est.rms_residual < 1e-12);
    }

    #[test]
    fn rough_trace_triggers_divergence() {
        let ts: Vec<f64> = (0..20).map(|i| 0.01 + 0.01 * i as f64).collect();
        let samples: Vec<HeatTraceSample> = ts
            .iter()
            .map(|&t| HeatTraceSample {
                t,
                trace: (1.0 + 0.1 * (80.0 * t).sin()) / (4.0 * PI * t).powi(2),
            })
            .collect();
        let ex = CoefficientExtractor::new(4, 1.0, 4, 1e-6).unwrap();
        match ex.fit(&samples) {
            Err(AppError::FitDivergence { rms, bound }) => {
                assert!(rms > bound);
                assert_eq!(bound, 1e-6);
            }
            other => panic!("expected FitDivergence, got {other:?}"),
        }
    }

    #[test]
    fn too_few_points_is_a_configuration_error() {
        let samples = synthetic(&[1.0], 1.0, &[0.1, 0.2, 0.3]);
        let ex = CoefficientExtractor::new(4, 1.0, 3, 1e-6).unwrap();
        assert!(matches!(ex.fit(&samples), Err(AppError::InvalidConfiguration(_))));
        assert!(ex.fit_raw(&samples).is_none());
    }
}
