//! t-grid generation and sliding sub-windows.
//!
//! The heat trace is sampled on a deterministic log-spaced grid, and the
//! plateau search fits every contiguous run of grid points of each configured
//! width. A grid search keeps the result deterministic given the same inputs,
//! with no optimizer state to converge.

use crate::domain::{FitWindow, HeatTraceSample};
use crate::error::AppError;

/// Generate `steps` log-spaced points between `min` and `max` (inclusive).
pub fn log_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > 0.0 && max > min) {
        return Err(AppError::invalid(format!(
            "Invalid t range: min={min}, max={max} (must be finite, >0, and max>min)."
        )));
    }
    if steps == 0 {
        return Err(AppError::invalid("The t-grid is empty (0 steps)."));
    }
    if steps == 1 {
        return Err(AppError::invalid("The t-grid needs at least 2 points."));
    }

    let ln_min = min.ln();
    let ln_max = max.ln();
    let step = (ln_max - ln_min) / (steps as f64 - 1.0);

    let mut out = Vec::with_capacity(steps);
    for i in 0..steps {
        out.push((ln_min + step * i as f64).exp());
    }
    // Pin the endpoints exactly.
    out[0] = min;
    out[steps - 1] = max;
    Ok(out)
}

/// A contiguous run of grid points `[start, start + len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpan {
    pub start: usize,
    pub len: usize,
}

impl WindowSpan {
    pub fn slice<'a>(&self, samples: &'a [HeatTraceSample]) -> &'a [HeatTraceSample] {
        &samples[self.start..self.start + self.len]
    }

    pub fn fit_window(&self, samples: &[HeatTraceSample]) -> FitWindow {
        FitWindow {
            t_min: samples[self.start].t,
            t_max: samples[self.start + self.len - 1].t,
        }
    }
}

/// Every sliding window of each width, grouped by width then ordered by start.
///
/// Widths larger than the grid are skipped; duplicates are ignored.
pub fn sliding_windows(n_points: usize, widths: &[usize]) -> Vec<WindowSpan> {
    let mut widths: Vec<usize> = widths.iter().copied().filter(|&w| w >= 2 && w <= n_points).collect();
    widths.sort_unstable();
    widths.dedup();

    let mut out = Vec::new();
    for len in widths {
        for start in 0..=(n_points - len) {
            out.push(WindowSpan { start, len });
        }
    }
    out
}
