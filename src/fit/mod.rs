//! Coefficient fitting orchestration.
//!
//! Responsibilities:
//!
//! - generate the log-spaced t-grid and its sliding sub-windows
//! - fit `(a₀, a₂, a₄)` on each sub-window (parallel)
//! - select the plateau window by neighbour dispersion

pub mod extractor;
pub mod plateau;
pub mod t_grid;

pub use extractor::*;
pub use plateau::*;
pub use t_grid::*;
