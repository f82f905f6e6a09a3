//! Shared extraction pipeline used by the `extract`, `topology` and
//! `validate` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! spectrum -> heat-trace samples -> window scan -> plateau -> tail completion -> final fit
//!
//! The plateau is searched on the raw truncated trace. A plateau only counts
//! if completing the tail moves its estimate by no more than the dispersion
//! threshold; otherwise the window sits where truncation still matters.
//!
//! The commands can then focus on presentation and persistence.

use serde::{Deserialize, Serialize};

use crate::domain::{
    CoefficientEstimate, ExactCoefficients, ExtractionConfig, FitWindow, HeatTraceSample,
    SPECTRAL_GAP_CEILING,
};
use crate::error::AppError;
use crate::fit::{log_space, scan_windows, CoefficientExtractor, Plateau, PlateauFinder};
use crate::spectrum::{EigenvalueSpectrum, HeatTraceSeries};
use crate::tail::build_tail_completion;

/// Where the final fit window came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowSource {
    Plateau,
    Override,
}

/// All computed outputs of a single extraction.
#[derive(Debug, Clone)]
pub struct ExtractionRun {
    pub config: ExtractionConfig,
    pub mode_count: u64,
    pub tail_start: f64,
    pub window: FitWindow,
    pub source: WindowSource,
    /// Present when the window came from the plateau search.
    pub plateau: Option<Plateau>,
    /// Number of sub-window fits examined.
    pub candidates: usize,
    /// Change of the plateau estimate under tail completion.
    pub tail_shift: Option<f64>,
    pub estimate: CoefficientEstimate,
    pub exact: ExactCoefficients,
}

impl ExtractionRun {
    /// `|estimate - exact|` for `(a₀, a₂, a₄)`.
    pub fn abs_errors(&self) -> [f64; 3] {
        [
            (self.estimate.a0 - self.exact.a0).abs(),
            (self.estimate.a2 - self.exact.a2).abs(),
            (self.estimate.a4 - self.exact.a4).abs(),
        ]
    }
}

/// Execute the full extraction pipeline.
pub fn run_extraction(config: &ExtractionConfig) -> Result<ExtractionRun, AppError> {
    config.validate()?;

    // 1) Spectrum.
    let spectrum = EigenvalueSpectrum::generate(config.background, config.radius, config.nmax)?;
    log::info!(
        "{} R={} Nmax={}: {} levels, {} modes, tail from λ={:.4}",
        config.background.display_name(),
        config.radius,
        config.nmax,
        spectrum.levels().len(),
        spectrum.mode_count(),
        spectrum.tail_start()
    );

    // 2) Heat-trace samples on the log grid.
    let grid = log_space(config.t_window.0, config.t_window.1, config.grid_points)?;
    let samples: Vec<HeatTraceSample> = HeatTraceSeries::new(&spectrum, &grid)?.collect();

    let extractor = CoefficientExtractor::for_spectrum(&spectrum, config)?;
    let tail = build_tail_completion(&spectrum, config)?;

    // 3) Window: plateau search unless overridden.
    let mut finder = None;
    let (window, window_samples, plateau, candidates) = match config.window_override {
        Some(window) => {
            let gap = config.background.spectral_gap(config.radius);
            if window.t_max * gap > SPECTRAL_GAP_CEILING {
                log::warn!(
                    "window override reaches t·λ₁ = {:.3}; the zero mode dominates there",
                    window.t_max * gap
                );
            }
            let inside: Vec<HeatTraceSample> = samples.iter().copied().filter(|s| window.contains(s.t)).collect();
            log::info!(
                "using window override [{:.4e}, {:.4e}] ({} grid points)",
                window.t_min,
                window.t_max,
                inside.len()
            );
            (window, inside, None, 0)
        }
        None => {
            let scanned = scan_windows(&extractor, &samples, &config.window_widths);
            log::debug!("fitted {} sub-windows", scanned.len());
            let plateau_finder = PlateauFinder::from_config(config)?;
            let plateau = plateau_finder.find(&scanned)?;
            finder = Some(plateau_finder);
            let span = plateau.candidate.span;
            log::info!(
                "plateau [{:.4e}, {:.4e}] width={} dispersion={:.3e} ({} qualifying, {} tied)",
                plateau.candidate.window.t_min,
                plateau.candidate.window.t_max,
                span.len,
                plateau.dispersion,
                plateau.qualifying,
                plateau.tied
            );
            (plateau.candidate.window, span.slice(&samples).to_vec(), Some(plateau), scanned.len())
        }
    };

    // 4) Tail completion and final fit.
    let completed: Vec<HeatTraceSample> = window_samples.iter().map(|s| tail.complete(s)).collect();
    let estimate = extractor.fit(&completed)?;

    let tail_shift = match (&finder, &plateau) {
        (Some(finder), Some(plateau)) => {
            let shift = finder.shift(&plateau.candidate.estimate, &estimate);
            log::info!("tail completion shifts the plateau estimate by {shift:.3e}");
            if shift > config.dispersion_threshold {
                return Err(AppError::NoPlateauFound(format!(
                    "tail completion shifts the plateau estimate by {shift:.3e}, above threshold {:.3e}; \
                     Nmax={} is too small for this window.",
                    config.dispersion_threshold, config.nmax
                )));
            }
            Some(shift)
        }
        _ => None,
    };
    log::info!(
        "{}: a0={:.8} a2={:.8} a4={:.8} rms={:.3e}",
        tail.method().display_name(),
        estimate.a0,
        estimate.a2,
        estimate.a4,
        estimate.rms_residual
    );

    Ok(ExtractionRun {
        config: config.clone(),
        mode_count: spectrum.mode_count(),
        tail_start: spectrum.tail_start(),
        window,
        source: if plateau.is_some() { WindowSource::Plateau } else { WindowSource::Override },
        plateau,
        candidates,
        tail_shift,
        estimate,
        exact: config.background.exact_coefficients(config.radius),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Background, TailMethod};

    fn torus(method: TailMethod) -> ExtractionConfig {
        ExtractionConfig::new(Background::Torus4, 100, 1.0, (0.1, 0.8), method)
    }

    #[test]
    fn flat_torus_matches_closed_form() {
        for method in [TailMethod::LocalWeyl, TailMethod::GlobalFit] {
            let run = run_extraction(&torus(method)).unwrap();
            let [e0, e2, e4] = run.abs_errors();
            assert!(e0 < 1e-3, "{method:?}: a0 error {e0}");
            assert!(e2 < 1e-3, "{method:?}: a2 error {e2}");
            assert!(e4 < 3e-4, "{method:?}: a4 error {e4}");
            assert_eq!(run.source, WindowSource::Plateau);
            assert!(run.plateau.is_some());
        }
    }

    #[test]
    fn extraction_is_idempotent() {
        let config = torus(TailMethod::LocalWeyl);
        let first = run_extraction(&config).unwrap();
        let second = run_extraction(&config).unwrap();
        assert_eq!(first.window, second.window);
        assert_eq!(first.estimate, second.estimate);
        assert_eq!(first.plateau, second.plateau);
    }

    #[test]
    fn curved_backgrounds_recover_a4() {
        let s4 = ExtractionConfig::new(Background::S4, 200, 1.0, (5e-4, 0.05), TailMethod::LocalWeyl);
        let run = run_extraction(&s4).unwrap();
        assert!((run.estimate.a2 - 2.0).abs() < 1e-4, "a2={}", run.estimate.a2);
        assert!((run.estimate.a4 - 29.0 / 15.0).abs() < 1e-3, "a4={}", run.estimate.a4);

        let s3 = ExtractionConfig::new(Background::S3xs1, 60, 1.0, (2e-3, 0.1), TailMethod::GlobalFit);
        let run = run_extraction(&s3).unwrap();
        assert!((run.estimate.a2 - 1.0).abs() < 1e-4, "a2={}", run.estimate.a2);
        assert!((run.estimate.a4 - 0.5).abs() < 1e-3, "a4={}", run.estimate.a4);
    }

    #[test]
    fn zero_nmax_and_empty_grid_are_rejected() {
        let mut config = torus(TailMethod::LocalWeyl);
        config.nmax = 0;
        assert!(matches!(run_extraction(&config), Err(AppError::InvalidConfiguration(_))));

        let mut config = torus(TailMethod::LocalWeyl);
        config.grid_points = 0;
        assert!(matches!(run_extraction(&config), Err(AppError::InvalidConfiguration(_))));
    }

    #[test]
    fn exponentially_corrected_range_has_no_plateau() {
        let config = ExtractionConfig::new(Background::Torus4, 100, 1.0, (2.0, 20.0), TailMethod::LocalWeyl);
        assert!(matches!(run_extraction(&config), Err(AppError::NoPlateauFound(_))));
    }

    #[test]
    fn override_skips_the_search() {
        let mut config = torus(TailMethod::LocalWeyl);
        config.window_override = Some(FitWindow::new(0.25, 0.45).unwrap());
        let run = run_extraction(&config).unwrap();
        assert_eq!(run.source, WindowSource::Override);
        assert_eq!(run.candidates, 0);
        assert!(run.abs_errors()[0] < 1e-3);
    }

    fn default_config(background: Background, nmax: usize, radius: f64, method: TailMethod) -> ExtractionConfig {
        let window = background.default_t_window(radius, nmax);
        ExtractionConfig::new(background, nmax, radius, window, method)
    }

    fn within_tolerance(run: &ExtractionRun) -> bool {
        let r = run.config.radius;
        let scale = [1.0, r.powi(2), r.powi(4)];
        let got = [run.estimate.a0, run.estimate.a2, run.estimate.a4];
        let want = [run.exact.a0, run.exact.a2, run.exact.a4];
        (0..3).all(|k| {
            let (g, w) = (got[k] * scale[k], want[k] * scale[k]);
            (g - w).abs() <= 0.02 * w.abs().max(1.0)
        })
    }

    #[test]
    fn low_order_sphere_never_reports_a_false_plateau() {
        for nmax in [5, 10] {
            for method in [TailMethod::LocalWeyl, TailMethod::GlobalFit] {
                match run_extraction(&default_config(Background::S4, nmax, 1.0, method)) {
                    Ok(run) => assert!(
                        within_tolerance(&run),
                        "S4 N={nmax} {method:?}: a0={} a2={} a4={}",
                        run.estimate.a0,
                        run.estimate.a2,
                        run.estimate.a4
                    ),
                    Err(AppError::NoPlateauFound(_)) | Err(AppError::FitDivergence { .. }) => {}
                    Err(other) => panic!("S4 N={nmax} {method:?}: unexpected {other}"),
                }
            }
        }
    }

    #[test]
    fn default_windows_either_fail_loudly_or_land_close() {
        let cases: &[(Background, &[usize])] = &[
            (Background::Torus4, &[5, 10, 20, 50]),
            (Background::S4, &[5, 10, 20]),
            (Background::S3xs1, &[10, 20]),
        ];
        for &(background, orders) in cases {
            for &nmax in orders {
                for radius in [0.5, 1.0, 2.0] {
                    for method in [TailMethod::LocalWeyl, TailMethod::GlobalFit] {
                        let config = default_config(background, nmax, radius, method);
                        match run_extraction(&config) {
                            Ok(run) => assert!(
                                within_tolerance(&run),
                                "{background:?} N={nmax} R={radius} {method:?}: a0={} a2={} a4={}",
                                run.estimate.a0,
                                run.estimate.a2,
                                run.estimate.a4
                            ),
                            Err(AppError::NoPlateauFound(_)) | Err(AppError::FitDivergence { .. }) => {}
                            Err(other) => panic!("{background:?} N={nmax} R={radius} {method:?}: unexpected {other}"),
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn small_torus_default_reaches_the_plateau_search() {
        let config = default_config(Background::Torus4, 10, 1.0, TailMethod::LocalWeyl);
        assert!(config.validate().is_ok());
        assert!(matches!(run_extraction(&config), Err(AppError::NoPlateauFound(_))));
    }

    #[test]
    fn plateau_choice_does_not_depend_on_the_radius() {
        let runs: Vec<ExtractionRun> = [0.5, 1.0, 2.0]
            .into_iter()
            .map(|r| run_extraction(&default_config(Background::Torus4, 50, r, TailMethod::LocalWeyl)).unwrap())
            .collect();
        let reference = &runs[1];
        let span = reference.plateau.as_ref().map(|p| p.candidate.span);
        for run in &runs {
            let r2 = run.config.radius.powi(2);
            assert_eq!(run.plateau.as_ref().map(|p| p.candidate.span), span);
            assert!((run.window.t_min / r2 - reference.window.t_min).abs() < 1e-9);
            assert!((run.window.t_max / r2 - reference.window.t_max).abs() < 1e-9);
            assert!((run.estimate.a0 - reference.estimate.a0).abs() < 1e-6);
            assert!((run.estimate.a2 * r2 - reference.estimate.a2).abs() < 1e-6);
            assert!((run.estimate.a4 * r2 * r2 - reference.estimate.a4).abs() < 1e-6);
        }
    }

    #[test]
    fn plateau_runs_record_the_tail_shift() {
        let run = run_extraction(&torus(TailMethod::GlobalFit)).unwrap();
        let shift = run.tail_shift.unwrap();
        assert!(shift <= run.config.dispersion_threshold, "shift={shift}");

        let mut config = torus(TailMethod::GlobalFit);
        config.window_override = Some(FitWindow::new(0.25, 0.45).unwrap());
        assert!(run_extraction(&config).unwrap().tail_shift.is_none());
    }

    #[test]
    fn override_outside_the_asymptotic_range_diverges() {
        let mut config = torus(TailMethod::LocalWeyl);
        config.t_window = (1.0, 5.0);
        config.window_override = Some(FitWindow::new(1.0, 5.0).unwrap());
        assert!(matches!(run_extraction(&config), Err(AppError::FitDivergence { .. })));
    }
}
