//! Tail completion: estimate the heat-trace contribution of the modes beyond
//! the truncation order.
//!
//! Strategies are built for one truncated spectrum (which fixes `Nmax` and the
//! edge `Λ` where the missing tail starts) and then answer
//! `estimate_tail(t)` for any `t`. Which strategy runs is a configuration
//! choice; callers only see the trait.

use crate::domain::{ExtractionConfig, HeatTraceSample, TailMethod};
use crate::error::AppError;
use crate::spectrum::EigenvalueSpectrum;

pub mod global_fit;
pub mod local_weyl;

pub use global_fit::GlobalFitTail;
pub use local_weyl::LocalWeylTail;

pub trait TailCompletion: Send + Sync {
    fn method(&self) -> TailMethod;

    /// Truncation order the strategy was built for.
    fn nmax(&self) -> usize;

    /// Estimated `Σ_{λ > Λ} m exp(-λt)`.
    fn estimate_tail(&self, t: f64) -> f64;

    /// The sample with the estimated tail added to its trace.
    fn complete(&self, sample: &HeatTraceSample) -> HeatTraceSample {
        HeatTraceSample {
            t: sample.t,
            trace: sample.trace + self.estimate_tail(sample.t),
        }
    }
}

/// Build the strategy named by `config.tail_method` for `spectrum`.
pub fn build_tail_completion(
    spectrum: &EigenvalueSpectrum,
    config: &ExtractionConfig,
) -> Result<Box<dyn TailCompletion>, AppError> {
    let strategy: Box<dyn TailCompletion> = match config.tail_method {
        TailMethod::LocalWeyl => Box::new(LocalWeylTail::new(spectrum)?),
        TailMethod::GlobalFit => Box::new(GlobalFitTail::new(spectrum, config.tail_fit_fraction)?),
    };
    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Background;

    /// Exact tail of the `nmax` spectrum, from a much longer one.
    fn exact_tail(background: Background, nmax: usize, long: usize, t: f64) -> f64 {
        let short = EigenvalueSpectrum::generate(background, 1.0, nmax).unwrap();
        let full = EigenvalueSpectrum::generate(background, 1.0, long).unwrap();
        full.heat_trace(t) - short.heat_trace(t)
    }

    fn both(background: Background, nmax: usize) -> (EigenvalueSpectrum, Box<dyn TailCompletion>, Box<dyn TailCompletion>) {
        let spectrum = EigenvalueSpectrum::generate(background, 1.0, nmax).unwrap();
        let build = |method| {
            let config = ExtractionConfig::new(background, nmax, 1.0, (1e-3, 1.0), method);
            build_tail_completion(&spectrum, &config).unwrap()
        };
        let weyl = build(TailMethod::LocalWeyl);
        let global = build(TailMethod::GlobalFit);
        (spectrum, weyl, global)
    }

    #[test]
    fn factory_follows_the_configured_method() {
        let spectrum = EigenvalueSpectrum::generate(Background::S4, 1.0, 40).unwrap();
        for method in [TailMethod::LocalWeyl, TailMethod::GlobalFit] {
            let config = ExtractionConfig::new(Background::S4, 40, 1.0, (1e-3, 0.1), method);
            assert_eq!(build_tail_completion(&spectrum, &config).unwrap().method(), method);
        }
    }

    #[test]
    fn strategies_agree_within_five_percent_on_s4() {
        let (spectrum, weyl, global) = both(Background::S4, 20);
        let lambda = spectrum.tail_start();
        for scale in [0.5, 1.0, 2.0] {
            let t = scale / lambda;
            let w = weyl.estimate_tail(t);
            let g = global.estimate_tail(t);
            assert!(((w - g) / w).abs() < 0.05, "t={t}: weyl={w} global={g}");
        }
    }

    #[test]
    fn strategies_agree_within_five_percent_on_torus() {
        let (spectrum, weyl, global) = both(Background::Torus4, 100);
        let t = 1.0 / spectrum.tail_start();
        let w = weyl.estimate_tail(t);
        let g = global.estimate_tail(t);
        assert!(((w - g) / w).abs() < 0.05, "weyl={w} global={g}");
    }

    #[test]
    fn strategies_agree_within_five_percent_on_s3xs1() {
        let (spectrum, weyl, global) = both(Background::S3xs1, 20);
        let t = 1.0 / spectrum.tail_start();
        let w = weyl.estimate_tail(t);
        let g = global.estimate_tail(t);
        assert!(((w - g) / w).abs() < 0.05, "weyl={w} global={g}");
    }

    #[test]
    fn local_weyl_tracks_exact_s4_tail() {
        let (spectrum, weyl, _) = both(Background::S4, 20);
        let t = 1.0 / spectrum.tail_start();
        let exact = exact_tail(Background::S4, 20, 400, t);
        let w = weyl.estimate_tail(t);
        assert!(((w - exact) / exact).abs() < 0.01, "weyl={w} exact={exact}");
    }

    #[test]
    fn completion_adds_the_estimate() {
        let (spectrum, weyl, _) = both(Background::S3xs1, 10);
        let t = 0.05;
        let raw = HeatTraceSample { t, trace: spectrum.heat_trace(t) };
        let done = weyl.complete(&raw);
        assert_eq!(done.t, t);
        assert!((done.trace - raw.trace - weyl.estimate_tail(t)).abs() < 1e-9 * done.trace);
        assert_eq!(weyl.nmax(), 10);
        assert_eq!(weyl.method(), TailMethod::LocalWeyl);
    }
}
