//! CSV exports of coefficient estimates and benchmark rows.
//!
//! The exports are meant to be easy to consume in spreadsheets or by the
//! external tolerance comparison. Floats are written in shortest round-trip
//! form, so reading a file back reproduces every value bit for bit.

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::app::pipeline::ExtractionRun;
use crate::domain::{Background, CoefficientEstimate, TailMethod};
use crate::error::AppError;
use crate::signature::SignatureReport;

/// One row of the coefficient CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateRow {
    pub background: Background,
    pub nmax: usize,
    pub radius: f64,
    pub tail_method: TailMethod,
    pub t_min: f64,
    pub t_max: f64,
    pub a0: f64,
    pub a2: f64,
    pub a4: f64,
    pub rms_residual: f64,
    pub max_abs_residual: f64,
    pub n_points: usize,
}

impl EstimateRow {
    pub fn from_run(run: &ExtractionRun) -> Self {
        let e = &run.estimate;
        Self {
            background: run.config.background,
            nmax: run.config.nmax,
            radius: run.config.radius,
            tail_method: run.config.tail_method,
            t_min: run.window.t_min,
            t_max: run.window.t_max,
            a0: e.a0,
            a2: e.a2,
            a4: e.a4,
            rms_residual: e.rms_residual,
            max_abs_residual: e.max_abs_residual,
            n_points: e.n_points,
        }
    }

    pub fn estimate(&self) -> CoefficientEstimate {
        CoefficientEstimate {
            a0: self.a0,
            a2: self.a2,
            a4: self.a4,
            rms_residual: self.rms_residual,
            max_abs_residual: self.max_abs_residual,
            n_points: self.n_points,
        }
    }
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T], what: &str) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create {what} CSV '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::io(format!("Failed to write {what} CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush {what} CSV '{}': {e}", path.display())))?;
    Ok(())
}

/// Write coefficient estimates to a CSV file (header + one row each).
pub fn write_estimates_csv(path: &Path, rows: &[EstimateRow]) -> Result<(), AppError> {
    write_rows(path, rows, "estimate")
}

/// Read a coefficient CSV written by [`write_estimates_csv`].
pub fn read_estimates_csv(path: &Path) -> Result<Vec<EstimateRow>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open estimate CSV '{}': {e}", path.display())))?;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    let mut rows = Vec::new();
    for (idx, result) in reader.deserialize().enumerate() {
        // +2: records start after the header and lines are 1-based.
        let row: EstimateRow =
            result.map_err(|e| AppError::io(format!("Invalid estimate CSV at line {}: {e}", idx + 2)))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Write the benchmark record as a one-row CSV.
pub fn write_signature_csv(path: &Path, report: &SignatureReport) -> Result<(), AppError> {
    write_rows(path, std::slice::from_ref(report), "signature")
}
