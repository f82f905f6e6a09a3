//! Error type shared by the library and the `ht` binary.
//!
//! Every failure is terminal for the run that produced it; the binary prints
//! the message and exits with [`AppError::exit_code`].

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AppError {
    /// Malformed t-window, non-positive Nmax, empty grid, bad tuning knobs.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The plateau search exhausted its candidates.
    #[error("no plateau found: {0}")]
    NoPlateauFound(String),

    /// Fit residuals exceed the configured bound.
    #[error("fit diverged: rms residual {rms:.3e} exceeds bound {bound:.3e}")]
    FitDivergence { rms: f64, bound: f64 },

    #[error("{0}")]
    Io(String),

    /// One or more reference checks failed.
    #[error("validation failed: {0}")]
    Validation(String),
}

impl AppError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Validation(_) => 1,
            AppError::InvalidConfiguration(_) => 2,
            AppError::NoPlateauFound(_) => 3,
            AppError::FitDivergence { .. } => 4,
            AppError::Io(_) => 5,
        }
    }
}
