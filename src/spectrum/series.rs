//! Lazy heat-trace evaluation over a t-grid.

use crate::domain::HeatTraceSample;
use crate::error::AppError;
use crate::spectrum::EigenvalueSpectrum;

/// Iterator yielding `(t, K(t))` for each grid point, computed on demand.
#[derive(Debug, Clone)]
pub struct HeatTraceSeries<'a> {
    spectrum: &'a EigenvalueSpectrum,
    grid: std::slice::Iter<'a, f64>,
}

impl<'a> HeatTraceSeries<'a> {
    /// Validate the grid up front so iteration itself cannot fail.
    pub fn new(spectrum: &'a EigenvalueSpectrum, grid: &'a [f64]) -> Result<Self, AppError> {
        if grid.is_empty() {
            return Err(AppError::invalid("The t-grid is empty."));
        }
        if let Some(bad) = grid.iter().find(|t| !(t.is_finite() && **t > 0.0)) {
            return Err(AppError::invalid(format!("t-grid values must be finite and > 0, got {bad}.")));
        }
        Ok(Self {
            spectrum,
            grid: grid.iter(),
        })
    }
}

impl Iterator for HeatTraceSeries<'_> {
    type Item = HeatTraceSample;

    fn next(&mut self) -> Option<Self::Item> {
        let &t = self.grid.next()?;
        Some(HeatTraceSample {
            t,
            trace: self.spectrum.heat_trace(t),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.grid.size_hint()
    }
}

impl ExactSizeIterator for HeatTraceSeries<'_> {}
