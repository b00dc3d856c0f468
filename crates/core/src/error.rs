//! Error types for the tradyx analytics engines.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the tradyx analytics engines.
///
/// Only [`Error::MissingMandatoryInput`] is fatal to a run. Every other
/// variant degrades a single indicator to null.
#[derive(Error, Debug)]
pub enum Error {
    /// Trailing window shorter than the formula's minimum.
    #[error("Insufficient history for {indicator}: need {required}, have {available}")]
    InsufficientHistory {
        indicator: &'static str,
        required: usize,
        available: usize,
    },

    /// Zero variance, zero denominator, or a non-positive price under a logarithm.
    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    /// An optional forecasting capability is not compiled into this build.
    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(&'static str),

    /// The authoritative snapshot lacks a field the run cannot proceed without.
    #[error("Missing mandatory input: {0}")]
    MissingMandatoryInput(&'static str),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data error (malformed snapshot).
    #[error("Data error: {0}")]
    Data(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an insufficient history error.
    pub fn insufficient(indicator: &'static str, required: usize, available: usize) -> Self {
        Error::InsufficientHistory {
            indicator,
            required,
            available,
        }
    }

    /// Create a degenerate input error.
    pub fn degenerate(msg: impl Into<String>) -> Self {
        Error::DegenerateInput(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Whether this error should abort the whole run rather than null one field.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::MissingMandatoryInput(_))
    }
}

/// Require `available >= required`, otherwise an [`Error::InsufficientHistory`].
#[inline]
pub fn ensure_history(indicator: &'static str, required: usize, available: usize) -> Result<()> {
    if available < required {
        Err(Error::insufficient(indicator, required, available))
    } else {
        Ok(())
    }
}
