//! Plateau search over sliding-window coefficient estimates.
//!
//! Every sub-window of the t-grid gets its own `(a₀, a₂, a₄)` fit. Inside the
//! asymptotic regime neighbouring windows agree; near the truncation edge
//! (small t) or where exponentially small corrections kick in (large t) the
//! estimates drift. The plateau is the window whose estimate moves least
//! across its same-width neighbours.
//!
//! Selection rules:
//! 1. Windows reaching past `SPECTRAL_GAP_CEILING / λ₁` are never selected.
//! 2. Dispersion is only defined with `neighbor_span` neighbours on each side,
//!    and is measured on the dimensionless coefficients `a_k·R^k`.
//! 3. Candidates above `dispersion_threshold` are discarded.
//! 4. Among candidates within `tie_tolerance` of the minimum dispersion:
//!    widest window, then geometric centre closest to that of the full
//!    t-range, then earliest start.

use rayon::prelude::*;

use crate::domain::{
    CoefficientEstimate, DispersionMetric, ExtractionConfig, FitWindow, HeatTraceSample, SPECTRAL_GAP_CEILING,
};
use crate::error::AppError;
use crate::fit::extractor::CoefficientExtractor;
use crate::fit::t_grid::{sliding_windows, WindowSpan};

/// Estimate fitted over one sub-window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowCandidate {
    pub span: WindowSpan,
    pub window: FitWindow,
    pub estimate: CoefficientEstimate,
}

/// Fit every sliding window of each width.
///
/// Windows are evaluated in parallel; the result is ordered by `(len, start)`
/// so downstream selection never depends on scheduling. Windows whose fit is
/// singular or non-finite are left out.
pub fn scan_windows(
    extractor: &CoefficientExtractor,
    samples: &[HeatTraceSample],
    widths: &[usize],
) -> Vec<WindowCandidate> {
    let spans = sliding_windows(samples.len(), widths);

    let mut candidates: Vec<WindowCandidate> = spans
        .par_iter()
        .filter_map(|span| {
            extractor.fit_raw(span.slice(samples)).map(|estimate| WindowCandidate {
                span: *span,
                window: span.fit_window(samples),
                estimate,
            })
        })
        .collect();

    candidates.sort_by_key(|c| (c.span.len, c.span.start));
    candidates
}

/// Tuning of the plateau search.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateauFinder {
    pub neighbor_span: usize,
    pub metric: DispersionMetric,
    pub floor: f64,
    pub threshold: f64,
    pub tie_tolerance: f64,
    /// Range whose geometric mean anchors the centring tie-break.
    pub full_range: FitWindow,
    /// Background radius; `a₂` and `a₄` are compared as `a₂R²` and `a₄R⁴`.
    pub length_scale: f64,
    /// Candidates whose window ends past this `t` are skipped.
    pub t_ceiling: f64,
}

/// Log-centre distances closer than this count as equal.
const CENTRING_TOLERANCE: f64 = 1e-9;

/// Selected plateau window.
#[derive(Debug, Clone, PartialEq)]
pub struct Plateau {
    pub candidate: WindowCandidate,
    pub dispersion: f64,
    /// Candidates that met the dispersion threshold.
    pub qualifying: usize,
    /// Candidates that tied with the minimum.
    pub tied: usize,
}

impl PlateauFinder {
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, AppError> {
        Ok(Self {
            neighbor_span: config.neighbor_span,
            metric: config.dispersion,
            floor: config.dispersion_floor,
            threshold: config.dispersion_threshold,
            tie_tolerance: config.tie_tolerance,
            full_range: config.full_range()?,
            length_scale: config.radius,
            t_ceiling: SPECTRAL_GAP_CEILING / config.background.spectral_gap(config.radius),
        })
    }

    /// `(a₀, a₂R², a₄R⁴)`.
    pub fn dimensionless(&self, estimate: &CoefficientEstimate) -> [f64; 3] {
        let r2 = self.length_scale * self.length_scale;
        [estimate.a0, estimate.a2 * r2, estimate.a4 * r2 * r2]
    }

    fn scale(&self, reference: f64) -> f64 {
        match self.metric {
            DispersionMetric::RelativeStd => reference.abs().max(self.floor),
            DispersionMetric::AbsoluteStd => 1.0,
        }
    }

    /// Largest change between two estimates of the same window, on the
    /// dispersion scale.
    pub fn shift(&self, from: &CoefficientEstimate, to: &CoefficientEstimate) -> f64 {
        let (a, b) = (self.dimensionless(from), self.dimensionless(to));
        (0..3).map(|k| (b[k] - a[k]).abs() / self.scale(a[k])).fold(0.0, f64::max)
    }

    /// Dispersion of candidate `idx` across its neighbourhood.
    ///
    /// `candidates` must be ordered by `(len, start)` as produced by
    /// [`scan_windows`]. Returns `None` without a full neighbourhood.
    pub fn dispersion_at(&self, candidates: &[WindowCandidate], idx: usize) -> Option<f64> {
        let span = self.neighbor_span;
        let centre = candidates.get(idx)?.span;
        if idx < span || idx + span >= candidates.len() {
            return None;
        }
        let first = candidates[idx - span].span;
        let last = candidates[idx + span].span;
        // Sorted and unique, so matching ends imply a gap-free run.
        if first.len != centre.len || last.len != centre.len {
            return None;
        }
        if centre.start - first.start != span || last.start - centre.start != span {
            return None;
        }

        let neighbourhood = &candidates[idx - span..=idx + span];
        let n = neighbourhood.len() as f64;
        let mut worst: f64 = 0.0;
        let coefficients: Vec<[f64; 3]> = neighbourhood.iter().map(|c| self.dimensionless(&c.estimate)).collect();
        for k in 0..3 {
            let mean = coefficients.iter().map(|c| c[k]).sum::<f64>() / n;
            let var = coefficients.iter().map(|c| (c[k] - mean) * (c[k] - mean)).sum::<f64>() / n;
            worst = worst.max(var.sqrt() / self.scale(mean));
        }
        Some(worst)
    }

    /// Pick the plateau among `candidates`.
    pub fn find(&self, candidates: &[WindowCandidate]) -> Result<Plateau, AppError> {
        let below_gap: Vec<usize> = (0..candidates.len())
            .filter(|&idx| candidates[idx].window.t_max <= self.t_ceiling)
            .collect();
        if below_gap.is_empty() && !candidates.is_empty() {
            return Err(AppError::NoPlateauFound(format!(
                "every window reaches past t = {:.4e}, where the zero mode dominates the trace.",
                self.t_ceiling
            )));
        }

        let scored: Vec<(usize, f64)> = below_gap
            .into_iter()
            .filter_map(|idx| self.dispersion_at(candidates, idx).map(|d| (idx, d)))
            .filter(|(_, d)| d.is_finite())
            .collect();
        if scored.is_empty() {
            return Err(AppError::NoPlateauFound(format!(
                "no window has {} same-width neighbours on each side ({} candidates).",
                self.neighbor_span,
                candidates.len()
            )));
        }

        let best_seen = scored.iter().map(|&(_, d)| d).fold(f64::INFINITY, f64::min);
        let qualifying: Vec<(usize, f64)> = scored.into_iter().filter(|&(_, d)| d <= self.threshold).collect();
        if qualifying.is_empty() {
            return Err(AppError::NoPlateauFound(format!(
                "lowest dispersion {best_seen:.3e} exceeds threshold {:.3e}.",
                self.threshold
            )));
        }

        let d_min = qualifying.iter().map(|&(_, d)| d).fold(f64::INFINITY, f64::min);
        let tied: Vec<(usize, f64)> = qualifying
            .iter()
            .copied()
            .filter(|&(_, d)| d <= d_min + self.tie_tolerance)
            .collect();

        let target = self.full_range.geometric_center().ln();
        let off_centre = |idx: usize| (candidates[idx].window.geometric_center().ln() - target).abs();

        let mut best = tied[0];
        for &cand in &tied[1..] {
            let (bi, ci) = (best.0, cand.0);
            let (bw, cw) = (candidates[bi].span.len, candidates[ci].span.len);
            let better = if cw != bw {
                cw > bw
            } else {
                let delta = off_centre(ci) - off_centre(bi);
                if delta.abs() <= CENTRING_TOLERANCE {
                    candidates[ci].span.start < candidates[bi].span.start
                } else {
                    delta < 0.0
                }
            };
            if better {
                best = cand;
            }
        }

        Ok(Plateau {
            candidate: candidates[best.0].clone(),
            dispersion: best.1,
            qualifying: qualifying.len(),
            tied: tied.len(),
        })
    }
}
