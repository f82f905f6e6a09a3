//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - runs the requested computation
//! - prints reports
//! - writes optional exports

use std::path::Path;
use std::time::Instant;

use clap::Parser;

use crate::cli::{Command, ExtractArgs, SignatureArgs, TopologyArgs};
use crate::error::AppError;
use crate::io::{read_estimates_csv, write_estimates_csv, write_json, write_signature_csv, EstimateRow, RunManifest};

pub mod pipeline;

/// Entry point for the `ht` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is the common case.
    dotenvy::dotenv().ok();
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Extract(args) => handle_extract(args),
        Command::Topology(args) => handle_topology(args),
        Command::Signature(args) => handle_signature(args),
        Command::Validate => handle_validate(),
    }
}

fn handle_extract(args: ExtractArgs) -> Result<(), AppError> {
    let config = args.to_config()?;
    let started = Instant::now();
    let run = pipeline::run_extraction(&config)?;
    let runtime_ms = started.elapsed().as_secs_f64() * 1e3;

    println!("{}", crate::report::format_run_summary(&run));

    if let Some(path) = &args.export {
        append_estimate(path, EstimateRow::from_run(&run))?;
        log::info!("appended estimate to {}", path.display());
    }
    if let Some(path) = &args.manifest {
        write_json(path, &RunManifest::from_run(&run, runtime_ms))?;
        log::info!("wrote manifest {}", path.display());
    }
    Ok(())
}

fn handle_topology(args: TopologyArgs) -> Result<(), AppError> {
    let config = args.to_config();
    let started = Instant::now();
    let (run, integral) = crate::topology::evaluate(&config)?;
    let runtime_ms = started.elapsed().as_secs_f64() * 1e3;

    println!("{}", crate::report::format_run_summary(&run));
    println!("{}", crate::report::format_topology(&integral));

    if let Some(path) = &args.manifest {
        write_json(path, &RunManifest::from_run(&run, runtime_ms).with_topology(integral))?;
        log::info!("wrote manifest {}", path.display());
    }
    Ok(())
}

fn handle_signature(args: SignatureArgs) -> Result<(), AppError> {
    let report = crate::signature::run_signature(&args.to_config())?;
    println!("{}", crate::report::format_signature(&report));

    if args.no_save {
        return Ok(());
    }
    std::fs::create_dir_all(&args.out_dir).map_err(|e| {
        AppError::io(format!("Failed to create output dir '{}': {e}", args.out_dir.display()))
    })?;
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let json_path = args.out_dir.join(format!("spectral_signature_sigma_{stamp}.json"));
    let csv_path = args.out_dir.join(format!("spectral_signature_sigma_{stamp}.csv"));
    write_json(&json_path, &report)?;
    write_signature_csv(&csv_path, &report)?;
    println!("Saved: {}\nSaved: {}", json_path.display(), csv_path.display());
    Ok(())
}

fn handle_validate() -> Result<(), AppError> {
    let harness = crate::validation::reference_suite();
    println!("{}", harness.format_summary());
    harness.into_result()
}

/// Add one row to an estimate CSV, creating it when missing.
fn append_estimate(path: &Path, row: EstimateRow) -> Result<(), AppError> {
    let mut rows = if path.exists() { read_estimates_csv(path)? } else { Vec::new() };
    rows.push(row);
    write_estimates_csv(path, &rows)
}
