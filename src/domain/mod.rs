//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - background and strategy enums (`Background`, `TailMethod`, `DispersionMetric`)
//! - trace samples and fit windows (`HeatTraceSample`, `FitWindow`)
//! - fit outputs (`CoefficientEstimate`, `ExactCoefficients`) and `ExtractionConfig`

pub mod types;

pub use types::*;
