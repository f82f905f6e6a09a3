//! Finite-N spectral-signature benchmark.
//!
//! A chirally symmetric operator `D` (with `S D S = -D` for the involution
//! `S = diag(I, -I)`) has a spectrum symmetric about zero, so the regulated
//! signature `Tr f(D)` with the odd regulator `f(x) = x exp(-x²/Λ²)` vanishes.
//! The benchmark checks that this survives an S-odd perturbation `D + V` and
//! a conjugation `U D U†` by the unitary `U = exp(iεH)` of a symmetric,
//! block-diagonal `H`, which commutes with `S`.

use std::process::Command;

use nalgebra::{Complex, DMatrix, DVector, SymmetricEigen};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Tolerance of the `S X S = -X` check.
const CHIRALITY_TOLERANCE: f64 = 1e-10;

/// Benchmark parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureConfig {
    /// Block size; the operators are `2 n_block` square.
    pub n_block: usize,
    pub seed: u64,
    /// Regulator scale `Λ`.
    pub lambda: f64,
    /// Amplitude of the S-odd perturbation.
    pub perturb_eps: f64,
    /// Generator amplitude `ε` of the S-commuting unitary.
    pub unitary_eps: f64,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            n_block: 300,
            seed: 2025,
            lambda: 5.0,
            perturb_eps: 1e-2,
            unitary_eps: 1e-1,
        }
    }
}

impl SignatureConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.n_block == 0 {
            return Err(AppError::invalid("n_block must be > 0."));
        }
        if !(self.lambda.is_finite() && self.lambda > 0.0) {
            return Err(AppError::invalid(format!("Lambda must be finite and > 0, got {}.", self.lambda)));
        }
        if !(self.perturb_eps.is_finite() && self.unitary_eps.is_finite()) {
            return Err(AppError::invalid("Perturbation amplitudes must be finite."));
        }
        Ok(())
    }
}

/// Benchmark outputs, one flat record so it serializes to a single CSV row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureReport {
    pub timestamp: String,
    pub version: String,
    pub platform: String,
    /// Git revision of the working directory, when it is a repository.
    pub commit: Option<String>,
    pub branch: Option<String>,
    pub n_block: usize,
    pub n: usize,
    pub seed: u64,
    pub lambda: f64,
    pub perturb_eps: f64,
    pub unitary_eps: f64,
    pub trace_fd: f64,
    pub trace_fd_pert: f64,
    pub trace_fd_u: f64,
    pub sum_f_eigs: f64,
    /// `max |f(λ) + f(-λ)|` over paired eigenvalues; `None` when zero modes
    /// leave unequal positive and negative counts.
    pub paired_max: Option<f64>,
    pub comm_norm: f64,
}

/// `f(x) = x exp(-x²/Λ²)`.
pub fn regulator(x: f64, lambda: f64) -> f64 {
    x * (-(x * x) / (lambda * lambda)).exp()
}

/// `diag(I, -I)` of size `2 n_block`.
pub fn involution(n_block: usize) -> DMatrix<f64> {
    DMatrix::from_fn(2 * n_block, 2 * n_block, |i, j| match (i == j, i < n_block) {
        (true, true) => 1.0,
        (true, false) => -1.0,
        _ => 0.0,
    })
}

/// Fail unless `S X S = -X` within tolerance.
pub fn ensure_chiral(s: &DMatrix<f64>, x: &DMatrix<f64>, name: &str) -> Result<(), AppError> {
    let defect = (s * x * s + x).amax();
    if defect > CHIRALITY_TOLERANCE {
        return Err(AppError::invalid(format!(
            "{name} breaks the chiral symmetry: max |S {name} S + {name}| = {defect:.3e}"
        )));
    }
    Ok(())
}

fn gaussian_block(rng: &mut StdRng, n: usize) -> DMatrix<f64> {
    DMatrix::from_fn(n, n, |_, _| rng.sample::<f64, _>(StandardNormal))
}

fn symmetric_block(rng: &mut StdRng, n: usize) -> DMatrix<f64> {
    let g = gaussian_block(rng, n);
    (&g + g.transpose()) * 0.5
}


/// `[[0, A], [Aᵀ, 0]]`.
fn off_diagonal(a: &DMatrix<f64>) -> DMatrix<f64> {
    let n = a.nrows();
    let mut out = DMatrix::zeros(2 * n, 2 * n);
    out.view_mut((0, n), (n, n)).copy_from(a);
    out.view_mut((n, 0), (n, n)).copy_from(&a.transpose());
    out
}

/// `[[A, 0], [0, B]]`.
fn block_diagonal(a: &DMatrix<f64>, b: &DMatrix<f64>) -> DMatrix<f64> {
    let n = a.nrows();
    let mut out = DMatrix::zeros(2 * n, 2 * n);
    out.view_mut((0, 0), (n, n)).copy_from(a);
    out.view_mut((n, n), (n, n)).copy_from(b);
    out
}

fn complexify(x: &DMatrix<f64>) -> DMatrix<Complex<f64>> {
    x.map(|v| Complex::new(v, 0.0))
}

/// `exp(iεH)` for a real symmetric `H`.
fn unitary(h: &DMatrix<f64>, eps: f64) -> DMatrix<Complex<f64>> {
    h.map(|v| Complex::new(0.0, eps * v)).exp()
}

/// Regulated spectrum of a Hermitian matrix.
struct Regulated {
    eigenvalues: DVector<f64>,
    f_values: DVector<f64>,
    /// `Tr f(X)` from the reconstructed matrix.
    trace: f64,
}

fn regulate(x: DMatrix<Complex<f64>>, lambda: f64) -> Regulated {
    let eig = SymmetricEigen::new(x);
    let f_values = eig.eigenvalues.map(|v| regulator(v, lambda));
    let f_diag = DMatrix::from_diagonal(&f_values.map(|v| Complex::new(v, 0.0)));
    let f_x = &eig.eigenvectors * f_diag * eig.eigenvectors.adjoint();
    Regulated {
        eigenvalues: eig.eigenvalues,
        f_values,
        trace: f_x.trace().re,
    }
}

/// First line of `git <args>`, or `None` outside a repository.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let line = text.lines().next()?.trim();
    (!line.is_empty()).then(|| line.to_string())
}

/// Pair positive eigenvalues (ascending) with negative ones (descending).
fn paired_asymmetry(eigenvalues: &DVector<f64>, lambda: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = eigenvalues.iter().copied().collect();
    sorted.sort_by(f64::total_cmp);
    let positive: Vec<f64> = sorted.iter().copied().filter(|&v| v > 0.0).collect();
    let negative: Vec<f64> = sorted.iter().copied().filter(|&v| v < 0.0).rev().collect();
    if positive.len() != negative.len() {
        return None;
    }
    let max = positive
        .iter()
        .zip(&negative)
        .map(|(&p, &n)| (regulator(p, lambda) + regulator(n, lambda)).abs())
        .fold(0.0_f64, f64::max);
    Some(max)
}

/// Run the benchmark.
pub fn run_signature(config: &SignatureConfig) -> Result<SignatureReport, AppError> {
    config.validate()?;
    let nb = config.n_block;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let s = involution(nb);

    let a = symmetric_block(&mut rng, nb);
    let d = off_diagonal(&a);
    ensure_chiral(&s, &d, "D")?;

    let d = complexify(&d);
    let base = regulate(d.clone(), config.lambda);
    let sum_f_eigs = base.f_values.sum();
    let paired_max = paired_asymmetry(&base.eigenvalues, config.lambda);
    if paired_max.is_none() {
        log::warn!("unequal counts of positive and negative eigenvalues (zero modes present)");
    }

    let b = symmetric_block(&mut rng, nb);
    let v = off_diagonal(&b) * config.perturb_eps;
    ensure_chiral(&s, &v, "V")?;
    let perturbed = regulate(&d + complexify(&v), config.lambda);

    // Block-diagonal generator commutes with S, so U = exp(iεH) does too.
    let h = block_diagonal(&symmetric_block(&mut rng, nb), &symmetric_block(&mut rng, nb));
    let u = unitary(&h, config.unitary_eps);
    let s = complexify(&s);
    let comm_norm = (&u * &s - &s * &u).norm();
    let rotated = regulate(&u * &d * u.adjoint(), config.lambda);

    log::info!(
        "Tr f(D)={:.3e} Tr f(D+V)={:.3e} Tr f(UDU†)={:.3e} ||[U,S]||={comm_norm:.3e}",
        base.trace,
        perturbed.trace,
        rotated.trace
    );

    Ok(SignatureReport {
        timestamp: chrono::Local::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        platform: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
        commit: git(&["rev-parse", "HEAD"]),
        branch: git(&["rev-parse", "--abbrev-ref", "HEAD"]),
        n_block: nb,
        n: 2 * nb,
        seed: config.seed,
        lambda: config.lambda,
        perturb_eps: config.perturb_eps,
        unitary_eps: config.unitary_eps,
        trace_fd: base.trace,
        trace_fd_pert: perturbed.trace,
        trace_fd_u: rotated.trace,
        sum_f_eigs,
        paired_max,
        comm_norm,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> SignatureConfig {
        SignatureConfig {
            n_block: 24,
            ..SignatureConfig::default()
        }
    }

    #[test]
    fn regulated_signature_vanishes() {
        let report = run_signature(&small()).unwrap();
        assert_eq!(report.n, 48);
        assert!(report.trace_fd.abs() < 1e-10, "{}", report.trace_fd);
        assert!(report.sum_f_eigs.abs() < 1e-10, "{}", report.sum_f_eigs);
        assert!(report.trace_fd_pert.abs() < 1e-10, "{}", report.trace_fd_pert);
        assert!(report.trace_fd_u.abs() < 1e-10, "{}", report.trace_fd_u);
        assert!(report.paired_max.unwrap() < 1e-10);
        assert!(report.comm_norm < 1e-12, "{}", report.comm_norm);
    }

    #[test]
    fn same_seed_same_traces() {
        let a = run_signature(&small()).unwrap();
        let b = run_signature(&small()).unwrap();
        assert_eq!(a.trace_fd.to_bits(), b.trace_fd.to_bits());
        assert_eq!(a.trace_fd_u.to_bits(), b.trace_fd_u.to_bits());
    }

    #[test]
    fn even_operator_is_rejected() {
        let s = involution(3);
        assert!(ensure_chiral(&s, &off_diagonal(&DMatrix::identity(3, 3)), "D").is_ok());
        assert!(matches!(
            ensure_chiral(&s, &DMatrix::identity(6, 6), "D"),
            Err(AppError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn rotation_is_unitary_and_complex() {
        let mut rng = StdRng::seed_from_u64(7);
        let h = block_diagonal(&symmetric_block(&mut rng, 5), &symmetric_block(&mut rng, 5));
        let u = unitary(&h, 0.1);
        let defect = (&u * u.adjoint() - DMatrix::<Complex<f64>>::identity(10, 10)).camax();
        assert!(defect < 1e-12, "{defect}");
        assert!(u.iter().any(|z| z.im.abs() > 1e-3));

        let s = complexify(&involution(5));
        assert!((&u * &s - &s * &u).camax() < 1e-12);
    }

    #[test]
    fn unitary_conjugation_keeps_the_spectrum() {
        let mut rng = StdRng::seed_from_u64(11);
        let d = complexify(&off_diagonal(&symmetric_block(&mut rng, 6)));
        let h = block_diagonal(&symmetric_block(&mut rng, 6), &symmetric_block(&mut rng, 6));
        let u = unitary(&h, 0.3);
        let mut before: Vec<f64> = regulate(d.clone(), 5.0).eigenvalues.iter().copied().collect();
        let mut after: Vec<f64> = regulate(&u * &d * u.adjoint(), 5.0).eigenvalues.iter().copied().collect();
        before.sort_by(f64::total_cmp);
        after.sort_by(f64::total_cmp);
        for (b, a) in before.iter().zip(&after) {
            assert!((a - b).abs() < 1e-10, "{a} vs {b}");
        }
    }

    #[test]
    fn pairing_detects_unbalanced_zero_modes() {
        let evals = DVector::from_vec(vec![-1.0, 0.0, 1.0, 2.0]);
        assert_eq!(paired_asymmetry(&evals, 5.0), None);
        let evals = DVector::from_vec(vec![-2.0, -1.0, 1.0, 2.0]);
        assert_eq!(paired_asymmetry(&evals, 5.0), Some(0.0));
    }

    #[test]
    fn failing_git_query_gives_no_provenance() {
        assert_eq!(git(&["no-such-subcommand-for-heat-trace"]), None);
    }

    #[test]
    fn zero_block_is_rejected() {
        let config = SignatureConfig {
            n_block: 0,
            ..SignatureConfig::default()
        };
        assert!(matches!(run_signature(&config), Err(AppError::InvalidConfiguration(_))));
    }
}
