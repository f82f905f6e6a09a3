//! `heat-trace` library crate.
//!
//! Extracts the heat-kernel coefficients `(a₀, a₂, a₄)` of the scalar
//! Laplacian from truncated eigenvalue spectra on fixed 4-dimensional
//! backgrounds, completes the missing high-eigenvalue tail, and locates the
//! `t`-window where the small-`t` expansion is trustworthy.
//!
//! The binary (`ht`) is a thin wrapper around this library so that:
//!
//! - core numerics are testable without spawning processes
//! - the reference checks run the same code paths as the CLI

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod report;
pub mod signature;
pub mod spectrum;
pub mod tail;
pub mod topology;
pub mod validation;
