//! Read/write JSON run manifests.
//!
//! A manifest is the portable record of one extraction:
//! - the full configuration (so the run can be repeated)
//! - the selected window and how it was chosen
//! - the estimate next to the closed-form values
//! - provenance (timestamp, crate version, runtime)

use std::fs::File;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::app::pipeline::{ExtractionRun, WindowSource};
use crate::domain::{CoefficientEstimate, ExactCoefficients, ExtractionConfig, FitWindow};
use crate::error::AppError;
use crate::topology::TopologicalIntegral;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub tool: String,
    pub version: String,
    pub generated: String,
    pub runtime_ms: f64,
    pub config: ExtractionConfig,
    pub mode_count: u64,
    pub tail_start: f64,
    pub window: FitWindow,
    pub window_source: WindowSource,
    /// Plateau dispersion; absent for overridden windows.
    pub dispersion: Option<f64>,
    /// Plateau estimate shift under tail completion.
    #[serde(default)]
    pub tail_shift: Option<f64>,
    pub estimate: CoefficientEstimate,
    pub exact: ExactCoefficients,
    pub abs_errors: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology: Option<TopologicalIntegral>,
}

impl RunManifest {
    pub fn from_run(run: &ExtractionRun, runtime_ms: f64) -> Self {
        Self {
            tool: "ht".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            generated: chrono::Local::now().to_rfc3339(),
            runtime_ms,
            config: run.config.clone(),
            mode_count: run.mode_count,
            tail_start: run.tail_start,
            window: run.window,
            window_source: run.source,
            dispersion: run.plateau.as_ref().map(|p| p.dispersion),
            tail_shift: run.tail_shift,
            estimate: run.estimate,
            exact: run.exact,
            abs_errors: run.abs_errors(),
            topology: None,
        }
    }

    pub fn with_topology(mut self, integral: TopologicalIntegral) -> Self {
        self.topology = Some(integral);
        self
    }
}

/// Write any serializable record as pretty JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, value).map_err(|e| AppError::io(format!("Failed to write JSON: {e}")))?;
    Ok(())
}

/// Read a JSON record written by [`write_json`].
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let file =
        File::open(path).map_err(|e| AppError::io(format!("Failed to open JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::io(format!("Invalid JSON '{}': {e}", path.display())))
}
