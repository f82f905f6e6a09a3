//! Least squares solvers.
//!
//! Two call sites repeatedly solve small polynomial regressions:
//!
//! ```text
//! minimize Σ (y_i - Σ_k c_k x_i^k)^2
//! ```
//!
//! - the coefficient extractor (y = normalized heat trace, x = t)
//! - the `global_fit` tail model (y = cumulative level count, x = λ)
//!
//! Implementation choices:
//! - SVD solve so tall (more rows than columns) systems are handled robustly.
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - Raw monomials over `t ∈ [1e-3, 1e-2]` have singular values far below any
//!   sane SVD cutoff, so the abscissa is rescaled to `u = x / max|x|` before
//!   building the design matrix and coefficients are mapped back afterwards.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Fit `y ≈ Σ_{k<terms} c_k x^k` and return `c` in the original variable.
///
/// Returns `None` for mismatched/too-short inputs or an unsolvable system.
pub fn fit_polynomial(xs: &[f64], ys: &[f64], terms: usize) -> Option<Vec<f64>> {
    if terms == 0 || xs.len() != ys.len() || xs.len() < terms {
        return None;
    }
    let scale = xs.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
    if !(scale.is_finite() && scale > 0.0) {
        return None;
    }

    let n = xs.len();
    let mut design = DMatrix::<f64>::zeros(n, terms);
    for (i, &x) in xs.iter().enumerate() {
        let u = x / scale;
        let mut p = 1.0;
        for k in 0..terms {
            design[(i, k)] = p;
            p *= u;
        }
    }
    let rhs = DVector::from_column_slice(ys);

    let beta = solve_least_squares(&design, &rhs)?;
    let mut s_pow = 1.0;
    let mut out = Vec::with_capacity(terms);
    for k in 0..terms {
        out.push(beta[k] / s_pow);
        s_pow *= scale;
    }
    Some(out)
}

/// Evaluate `Σ c_k x^k` (Horner).
pub fn eval_polynomial(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}
