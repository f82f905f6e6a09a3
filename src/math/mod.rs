//! Mathematical utilities: polynomial least squares and Laplace tail integrals.

pub mod ols;
pub mod special;

pub use ols::*;
pub use special::*;
