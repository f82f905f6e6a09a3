//! Input/output helpers.
//!
//! - coefficient and benchmark CSV exports (`export`)
//! - JSON run manifests (`manifest`)

pub mod export;
pub mod manifest;

pub use export::*;
pub use manifest::*;
