//! Truncated spectra and the heat traces they produce.
//!
//! Spectra are generated from closed-form formulas and never change after
//! construction; the trace series borrows them.

pub mod levels;
pub mod series;

pub use levels::*;
pub use series::*;
