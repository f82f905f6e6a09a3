//! Reporting utilities: formatted terminal output for runs and checks.

pub mod format;

pub use format::*;
