//! Closed-form scalar Laplacian spectra.
//!
//! Every level is labelled by a non-negative integer `k` with `λ = k / R²`
//! (`k = |n|²` on T⁴, `n(n+3)` on S⁴, `n(n+2) + m²` on S³×S¹), so
//! multiplicities are exact integers and equal eigenvalues merge trivially.
//!
//! Truncation order `N` keeps:
//! - T⁴: `k <= N`
//! - S⁴: `n <= N`
//! - S³×S¹: every mode with `n(n+2) + m² <= N(N+2)`
//!
//! The tail integrals start at the half-step after the last retained level
//! (level index `N + ½`), which is where the midpoint rule places the edge of
//! a unit-spaced staircase.

use std::collections::BTreeMap;

use crate::domain::Background;
use crate::error::AppError;

/// One distinct eigenvalue and its degeneracy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralLevel {
    pub eigenvalue: f64,
    pub multiplicity: u64,
}

/// Truncated spectrum of a background, sorted by eigenvalue.
#[derive(Debug, Clone)]
pub struct EigenvalueSpectrum {
    background: Background,
    radius: f64,
    nmax: usize,
    levels: Vec<SpectralLevel>,
    tail_start: f64,
}

impl EigenvalueSpectrum {
    pub fn generate(background: Background, radius: f64, nmax: usize) -> Result<Self, AppError> {
        if nmax == 0 {
            return Err(AppError::invalid("Nmax must be > 0."));
        }
        if !(radius.is_finite() && radius > 0.0) {
            return Err(AppError::invalid(format!("Radius must be finite and > 0, got {radius}.")));
        }

        let inv_r2 = 1.0 / (radius * radius);
        let (labels, edge) = match background {
            Background::Torus4 => torus_levels(nmax),
            Background::S4 => sphere4_levels(nmax),
            Background::S3xs1 => s3xs1_levels(nmax),
        };

        let levels = labels
            .into_iter()
            .map(|(k, multiplicity)| SpectralLevel {
                eigenvalue: k as f64 * inv_r2,
                multiplicity,
            })
            .collect();

        Ok(Self {
            background,
            radius,
            nmax,
            levels,
            tail_start: edge * inv_r2,
        })
    }

    pub fn background(&self) -> Background {
        self.background
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn nmax(&self) -> usize {
        self.nmax
    }

    pub fn levels(&self) -> &[SpectralLevel] {
        &self.levels
    }

    /// Eigenvalue where the truncated tail begins.
    pub fn tail_start(&self) -> f64 {
        self.tail_start
    }

    pub fn dimension(&self) -> usize {
        self.background.dimension()
    }

    pub fn volume(&self) -> f64 {
        self.background.volume(self.radius)
    }

    /// Total number of retained modes (multiplicities summed).
    pub fn mode_count(&self) -> u64 {
        self.levels.iter().map(|l| l.multiplicity).sum()
    }

    /// `K(t) = Σ m exp(-λt)` over the retained levels.
    pub fn heat_trace(&self, t: f64) -> f64 {
        self.levels
            .iter()
            .map(|l| l.multiplicity as f64 * (-l.eigenvalue * t).exp())
            .sum()
    }
}

/// Jacobi's four-square count `r₄(k) = 8 Σ_{d | k, 4 ∤ d} d` (with `r₄(0) = 1`).
pub fn r4(k: u64) -> u64 {
    if k == 0 {
        return 1;
    }
    let mut sum = 0;
    let mut d = 1;
    while d * d <= k {
        if k % d == 0 {
            let e = k / d;
            if d % 4 != 0 {
                sum += d;
            }
            if e != d && e % 4 != 0 {
                sum += e;
            }
        }
        d += 1;
    }
    8 * sum
}

fn torus_levels(nmax: usize) -> (Vec<(u64, u64)>, f64) {
    let levels = (0..=nmax as u64).map(|k| (k, r4(k))).collect();
    (levels, nmax as f64 + 0.5)
}

fn sphere4_levels(nmax: usize) -> (Vec<(u64, u64)>, f64) {
    let levels = (0..=nmax as u64)
        .map(|n| (n * (n + 3), (n + 1) * (n + 2) * (2 * n + 3) / 6))
        .collect();
    let half = nmax as f64 + 0.5;
    (levels, half * (half + 3.0))
}

fn s3xs1_levels(nmax: usize) -> (Vec<(u64, u64)>, f64) {
    let n_top = nmax as u64;
    let k_cut = n_top * (n_top + 2);

    let mut merged: BTreeMap<u64, u64> = BTreeMap::new();
    for n in 0..=n_top {
        let base = n * (n + 2);
        let sphere_mult = (n + 1) * (n + 1);
        let mut m = 0u64;
        while base + m * m <= k_cut {
            let circle_mult = if m == 0 { 1 } else { 2 };
            *merged.entry(base + m * m).or_insert(0) += sphere_mult * circle_mult;
            m += 1;
        }
    }

    (merged.into_iter().collect(), k_cut as f64 + 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn r4_matches_brute_force_count() {
        for k in 0..40u64 {
            let mut count = 0;
            for a in -7i64..=7 {
                for b in -7i64..=7 {
                    for c in -7i64..=7 {
                        for d in -7i64..=7 {
                            if (a * a + b * b + c * c + d * d) as u64 == k {
                                count += 1;
                            }
                        }
                    }
                }
            }
            assert_eq!(r4(k), count, "k={k}");
        }
    }

    #[test]
    fn sphere_levels_follow_closed_form() {
        let s = EigenvalueSpectrum::generate(Background::S4, 1.0, 3).unwrap();
        let got: Vec<(f64, u64)> = s.levels().iter().map(|l| (l.eigenvalue, l.multiplicity)).collect();
        assert_eq!(got, vec![(0.0, 1), (4.0, 5), (10.0, 14), (18.0, 30)]);
        // n = 3.5 → 3.5 * 6.5
        assert!((s.tail_start() - 22.75).abs() < 1e-12);
    }

    #[test]
    fn s3xs1_merges_degenerate_modes() {
        let s = EigenvalueSpectrum::generate(Background::S3xs1, 1.0, 2).unwrap();
        // k_cut = 8. Contributions: k=0 (n0 m0)=1, k=1 (n0 m±1)=2, k=3 (n1 m0)=4,
        // k=4 (n0 m±2 → 2, n1 m±1 → 8)=10, k=7 (n1 m±2)=8, k=8 (n2 m0)=9.
        let got: Vec<(f64, u64)> = s.levels().iter().map(|l| (l.eigenvalue, l.multiplicity)).collect();
        assert_eq!(
            got,
            vec![(0.0, 1), (1.0, 2), (3.0, 4), (4.0, 10), (7.0, 8), (8.0, 9)]
        );
        assert!((s.tail_start() - 8.5).abs() < 1e-12);
    }

    #[test]
    fn torus_mode_count_is_lattice_count() {
        let s = EigenvalueSpectrum::generate(Background::Torus4, 1.0, 2).unwrap();
        // |n|² <= 2 in Z⁴: 1 + 8 + 24
        assert_eq!(s.mode_count(), 33);
    }

    #[test]
    fn radius_rescales_eigenvalues() {
        let s = EigenvalueSpectrum::generate(Background::Torus4, 2.0, 4).unwrap();
        assert!((s.levels()[4].eigenvalue - 1.0).abs() < 1e-15);
        assert!((s.tail_start() - 4.5 / 4.0).abs() < 1e-15);
    }

    #[test]
    fn zero_nmax_is_rejected() {
        let err = EigenvalueSpectrum::generate(Background::S4, 1.0, 0).unwrap_err();
        assert!(matches!(err, AppError::InvalidConfiguration(_)));
    }
}
