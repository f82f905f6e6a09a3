//! Curvature-corrected local Weyl tail.
//!
//! The two leading terms of the heat expansion fix the smoothed eigenvalue
//! density
//!
//! ```text
//! ρ(λ) = Vol (4π)^{-h} [ λ^{h-1} / (h-1)!  +  (R/6) λ^{h-2} / (h-2)! ],   h = d/2
//! ```
//!
//! which is integrated against `e^{-λt}` from the truncation edge to infinity.

use std::f64::consts::PI;

use crate::domain::TailMethod;
use crate::error::AppError;
use crate::math::{factorial, laplace_tail};
use crate::spectrum::EigenvalueSpectrum;
use crate::tail::TailCompletion;

#[derive(Debug, Clone)]
pub struct LocalWeylTail {
    nmax: usize,
    half_dim: usize,
    /// `Vol / (4π)^{d/2}`.
    prefactor: f64,
    /// `a₂` density, `R_scal / 6`.
    curvature_term: f64,
    tail_start: f64,
}

impl LocalWeylTail {
    pub fn new(spectrum: &EigenvalueSpectrum) -> Result<Self, AppError> {
        let dimension = spectrum.dimension();
        if dimension < 4 || dimension % 2 != 0 {
            return Err(AppError::invalid(format!(
                "local_weyl needs an even dimension >= 4, got {dimension}."
            )));
        }
        let half_dim = dimension / 2;
        let background = spectrum.background();
        Ok(Self {
            nmax: spectrum.nmax(),
            half_dim,
            prefactor: spectrum.volume() / (4.0 * PI).powi(half_dim as i32),
            curvature_term: background.scalar_curvature(spectrum.radius()) / 6.0,
            tail_start: spectrum.tail_start(),
        })
    }

    /// Smoothed density of states at `lambda`.
    pub fn density(&self, lambda: f64) -> f64 {
        let h = self.half_dim;
        self.prefactor
            * (lambda.powi(h as i32 - 1) / factorial(h - 1)
                + self.curvature_term * lambda.powi(h as i32 - 2) / factorial(h - 2))
    }
}

impl TailCompletion for LocalWeylTail {
    fn method(&self) -> TailMethod {
        TailMethod::LocalWeyl
    }

    fn nmax(&self) -> usize {
        self.nmax
    }

    fn estimate_tail(&self, t: f64) -> f64 {
        let h = self.half_dim;
        let leading = laplace_tail(h - 1, self.tail_start, t) / factorial(h - 1);
        let curvature = self.curvature_term * laplace_tail(h - 2, self.tail_start, t) / factorial(h - 2);
        self.prefactor * (leading + curvature)
    }
}
