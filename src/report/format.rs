//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::{ExtractionRun, WindowSource};
use crate::signature::SignatureReport;
use crate::topology::TopologicalIntegral;

/// Format the full extraction summary (spectrum, window, coefficients).
pub fn format_run_summary(run: &ExtractionRun) -> String {
    let c = &run.config;
    let mut out = String::new();

    out.push_str("=== ht - heat-trace coefficient extraction ===\n");
    out.push_str(&format!(
        "Background: {} | R={} | Nmax={} | modes={}\n",
        c.background.display_name(),
        c.radius,
        c.nmax,
        run.mode_count
    ));
    out.push_str(&format!(
        "t-range: [{:.4e}, {:.4e}] ({} points) | tail: {} from λ={:.4}\n",
        c.t_window.0,
        c.t_window.1,
        c.grid_points,
        c.tail_method.display_name(),
        run.tail_start
    ));

    match (&run.plateau, run.source) {
        (Some(p), WindowSource::Plateau) => out.push_str(&format!(
            "Window: [{:.4e}, {:.4e}] plateau width={} dispersion={:.3e} ({}/{} candidates qualify)\n",
            run.window.t_min, run.window.t_max, p.candidate.span.len, p.dispersion, p.qualifying, run.candidates
        )),
        _ => out.push_str(&format!(
            "Window: [{:.4e}, {:.4e}] (override)\n",
            run.window.t_min, run.window.t_max
        )),
    }
    out.push_str(&format!(
        "Fit: n={} rms={:.3e} max|r|={:.3e}\n\n",
        run.estimate.n_points, run.estimate.rms_residual, run.estimate.max_abs_residual
    ));

    out.push_str(&format_coefficient_table(run));
    out
}

/// Estimate vs closed form for `a₀, a₂, a₄`.
pub fn format_coefficient_table(run: &ExtractionRun) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<6} {:>18} {:>18} {:>12}\n", "coeff", "estimate", "exact", "|error|").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<6} {:-<18} {:-<18} {:-<12}\n", "", "", "", "").trim_end());
    out.push('\n');

    let estimate = run.estimate.coefficients();
    let exact = [run.exact.a0, run.exact.a2, run.exact.a4];
    let errors = run.abs_errors();
    for (i, name) in ["a0", "a2", "a4"].iter().enumerate() {
        out.push_str(
            format!(
                "{:<6} {:>18.12} {:>18.12} {:>12.3e}\n",
                name, estimate[i], exact[i], errors[i]
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

pub fn format_topology(integral: &TopologicalIntegral) -> String {
    format!(
        "Topological integral on {} (Nmax={}): chi={:.6} expected={} |error|={:.3e} rel={:.3e}\n",
        integral.background.display_name(),
        integral.nmax,
        integral.observed,
        integral.expected,
        integral.abs_error,
        integral.rel_error
    )
}

pub fn format_signature(report: &SignatureReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== spectral signature: N={} seed={} Lambda={} ===\n",
        report.n, report.seed, report.lambda
    ));
    out.push_str(&format!("  Tr[f(D)]          = {:.3e}\n", report.trace_fd));
    out.push_str(&format!("  sum f(eigenvalues) = {:.3e}\n", report.sum_f_eigs));
    match report.paired_max {
        Some(v) => out.push_str(&format!("  paired max |f(l)+f(-l)| = {v:.3e}\n")),
        None => out.push_str("  unequal counts of pos/neg eigenvalues (zero modes present)\n"),
    }
    out.push_str(&format!(
        "  Tr[f(D+V)]        = {:.3e} (diff {:.3e})\n",
        report.trace_fd_pert,
        report.trace_fd_pert - report.trace_fd
    ));
    out.push_str(&format!(
        "  Tr[f(U D U†)]     = {:.3e} (diff {:.3e})\n",
        report.trace_fd_u,
        report.trace_fd_u - report.trace_fd
    ));
    out.push_str(&format!("  ||[U,S]||         = {:.3e}\n", report.comm_norm));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::run_extraction;
    use crate::domain::{Background, ExtractionConfig, FitWindow, TailMethod};

    #[test]
    fn summary_lists_every_coefficient() {
        let config = ExtractionConfig::new(Background::Torus4, 100, 1.0, (0.1, 0.8), TailMethod::LocalWeyl);
        let run = run_extraction(&config).unwrap();
        let text = format_run_summary(&run);
        assert!(text.contains("T^4"));
        assert!(text.contains("plateau width="));
        for name in ["a0", "a2", "a4"] {
            assert!(text.lines().any(|l| l.starts_with(name)), "{text}");
        }
        assert!(text.lines().all(|l| l == l.trim_end()));
    }

    #[test]
    fn override_is_labelled() {
        let mut config = ExtractionConfig::new(Background::Torus4, 100, 1.0, (0.1, 0.8), TailMethod::LocalWeyl);
        config.window_override = Some(FitWindow::new(0.25, 0.45).unwrap());
        let run = run_extraction(&config).unwrap();
        assert!(format_run_summary(&run).contains("(override)"));
    }

    #[test]
    fn signature_without_pairing_says_so() {
        let report = SignatureReport {
            timestamp: String::new(),
            version: String::new(),
            platform: String::new(),
            commit: None,
            branch: None,
            n_block: 1,
            n: 2,
            seed: 1,
            lambda: 5.0,
            perturb_eps: 0.0,
            unitary_eps: 0.0,
            trace_fd: 0.0,
            trace_fd_pert: 0.0,
            trace_fd_u: 0.0,
            sum_f_eigs: 0.0,
            paired_max: None,
            comm_norm: 0.0,
        };
        assert!(format_signature(&report).contains("zero modes present"));
    }
}
