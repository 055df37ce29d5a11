//! Error types for the fluid playlist core.
//!
//! Fitting, selection and configuration failures get their own variants so
//! callers can tell a degenerate library apart from a bad flag. The CLI and
//! storage layers wrap these in `anyhow::Error`.

use thiserror::Error;

/// Main error type for the playlist core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The least-squares trajectory could not be solved
    #[error("Curve fit failed: {0}")]
    Fit(String),

    /// No track was found for a trajectory point before the threshold cap
    #[error(
        "No track within {threshold:.3} of trajectory point #{point_index} ({x:.3}, {y:.3}); both pools exhausted"
    )]
    SelectionExhausted {
        point_index: usize,
        x: f64,
        y: f64,
        threshold: f64,
    },

    /// Malformed build parameters
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unknown audio feature name
    #[error("Unknown audio feature: {0}")]
    UnknownFeature(String),
}

/// Convenience Result type using the core Error
pub type Result<T> = std::result::Result<T, Error>;
