//! Tail model fitted to the retained spectrum itself.
//!
//! The cumulative counting function `N(λ)` of the known levels is sampled at
//! the half-steps between consecutive levels (the last sample sits on the
//! truncation edge) and fitted by a polynomial of degree `⌈d/2⌉`:
//!
//! ```text
//! N(λ) ≈ Σ_j b_j λ^j    ⇒    ρ(λ) = Σ_j j b_j λ^{j-1}
//! ```
//!
//! Only samples with `λ >= (1 - fraction) Λ` enter the fit, so the model is
//! driven by the high end of the spectrum. The fitted density is then
//! integrated against `e^{-λt}` beyond `Λ`.

use crate::domain::TailMethod;
use crate::error::AppError;
use crate::math::{fit_polynomial, laplace_tail};
use crate::spectrum::EigenvalueSpectrum;
use crate::tail::TailCompletion;

#[derive(Debug, Clone)]
pub struct GlobalFitTail {
    nmax: usize,
    /// `b_j` of the counting-function fit, lowest order first.
    counting: Vec<f64>,
    tail_start: f64,
}

impl GlobalFitTail {
    pub fn new(spectrum: &EigenvalueSpectrum, fraction: f64) -> Result<Self, AppError> {
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(AppError::invalid(format!(
                "tail_fit_fraction must lie in (0, 1], got {fraction}."
            )));
        }
        let terms = spectrum.dimension().div_ceil(2) + 1;
        let points = counting_points(spectrum);

        let cutoff = (1.0 - fraction) * spectrum.tail_start();
        let mut selected: Vec<(f64, f64)> = points.iter().copied().filter(|&(l, _)| l >= cutoff).collect();
        if selected.len() < terms {
            // Short spectra: fall back to every known level.
            selected = points;
        }
        if selected.len() < terms {
            return Err(AppError::invalid(format!(
                "global_fit needs at least {terms} levels, the spectrum has {}.",
                selected.len()
            )));
        }

        let (xs, ys): (Vec<f64>, Vec<f64>) = selected.into_iter().unzip();
        let counting = fit_polynomial(&xs, &ys, terms)
            .ok_or_else(|| AppError::invalid("global_fit counting-function fit is singular."))?;
        log::debug!(
            "global_fit: {} points above λ={cutoff:.3}, counting coefficients {counting:?}",
            xs.len()
        );

        Ok(Self {
            nmax: spectrum.nmax(),
            counting,
            tail_start: spectrum.tail_start(),
        })
    }

    /// Fitted `b_j`, lowest order first.
    pub fn counting_coefficients(&self) -> &[f64] {
        &self.counting
    }
}

/// `(λ, N(λ))` at each half-step: midpoints between levels, then the edge.
fn counting_points(spectrum: &EigenvalueSpectrum) -> Vec<(f64, f64)> {
    let levels = spectrum.levels();
    let mut cumulative = 0.0;
    let mut out = Vec::with_capacity(levels.len());
    for (i, level) in levels.iter().enumerate() {
        cumulative += level.multiplicity as f64;
        let at = match levels.get(i + 1) {
            Some(next) => 0.5 * (level.eigenvalue + next.eigenvalue),
            None => spectrum.tail_start(),
        };
        out.push((at, cumulative));
    }
    out
}

impl TailCompletion for GlobalFitTail {
    fn method(&self) -> TailMethod {
        TailMethod::GlobalFit
    }

    fn nmax(&self) -> usize {
        self.nmax
    }

    fn estimate_tail(&self, t: f64) -> f64 {
        self.counting
            .iter()
            .enumerate()
            .skip(1)
            .map(|(j, &b)| j as f64 * b * laplace_tail(j - 1, self.tail_start, t))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Background;

    #[test]
    fn counting_points_end_on_the_edge() {
        let spectrum = EigenvalueSpectrum::generate(Background::S4, 1.0, 3).unwrap();
        let pts = counting_points(&spectrum);
        // levels 0, 4, 10, 18 with multiplicities 1, 5, 14, 30
        assert_eq!(pts, vec![(2.0, 1.0), (7.0, 6.0), (14.0, 20.0), (22.75, 50.0)]);
    }

    #[test]
    fn s4_counting_function_has_expected_leading_term() {
        // N(λ) ~ λ²/12 on the unit S⁴.
        let spectrum = EigenvalueSpectrum::generate(Background::S4, 1.0, 40).unwrap();
        let tail = GlobalFitTail::new(&spectrum, 0.75).unwrap();
        let b = tail.counting_coefficients();
        assert_eq!(b.len(), 3);
        assert!((b[2] - 1.0 / 12.0).abs() < 1e-3, "b2={}", b[2]);
    }

    #[test]
    fn tiny_spectrum_is_rejected() {
        let spectrum = EigenvalueSpectrum::generate(Background::S4, 1.0, 1).unwrap();
        assert!(matches!(
            GlobalFitTail::new(&spectrum, 0.75),
            Err(AppError::InvalidConfiguration(_))
        ));
        let spectrum = EigenvalueSpectrum::generate(Background::S4, 1.0, 10).unwrap();
        assert!(matches!(
            GlobalFitTail::new(&spectrum, 0.0),
            Err(AppError::InvalidConfiguration(_))
        ));
    }
}
