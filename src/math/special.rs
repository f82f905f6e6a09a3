//! Closed-form Laplace tails of monomial densities.
//!
//! Both tail-completion strategies model the eigenvalue density beyond the
//! truncation edge `Λ` as a polynomial in `λ`, so the only integral needed is
//!
//! ```text
//! I_j(Λ, t) = ∫_Λ^∞ λ^j e^{-λt} dλ = t^{-(j+1)} Γ(j+1, Λt)
//! ```
//!
//! For integer order the upper incomplete gamma function is a finite sum:
//! `Γ(n, x) = (n-1)! e^{-x} Σ_{k<n} x^k / k!`.

/// `n!` as a float (exact up to 22!).
pub fn factorial(n: usize) -> f64 {
    (1..=n).fold(1.0, |acc, k| acc * k as f64)
}

/// Upper incomplete gamma function `Γ(n, x)` for integer `n >= 1` and `x >= 0`.
pub fn upper_gamma_int(n: usize, x: f64) -> f64 {
    debug_assert!(n >= 1, "Γ(n, x) needs n >= 1");
    // Σ_{k<n} x^k/k! accumulated term by term.
    let mut term = 1.0;
    let mut sum = 1.0;
    for k in 1..n {
        term *= x / k as f64;
        sum += term;
    }
    factorial(n - 1) * (-x).exp() * sum
}

/// `∫_Λ^∞ λ^j e^{-λt} dλ` for `t > 0`, `Λ >= 0`.
pub fn laplace_tail(j: usize, lambda0: f64, t: f64) -> f64 {
    upper_gamma_int(j + 1, lambda0 * t) / t.powi(j as i32 + 1)
}
