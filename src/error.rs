//! Error types for the numeric core and the quality-control evaluators
//!
//! Threshold failures are NOT errors: they are ordinary `Verdict`s with
//! `passed == false`. Errors are reserved for inputs the statistics cannot
//! be computed from.

use thiserror::Error;

/// Errors for numeric routines and trial-log evaluation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QcError {
    #[error("Sample size must be positive, got {0}")]
    InvalidSampleSize(i64),

    #[error("Probability must be between 0 and 1, got {0}")]
    InvalidProbability(f64),

    #[error("Continued fraction did not converge after {iterations} iterations")]
    DidNotConverge { iterations: usize },

    #[error("Insufficient data: {reason}")]
    InsufficientData { reason: String },

    #[error("Invalid trial {index}: {reason}")]
    InvalidTrial { index: usize, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl QcError {
    pub(crate) fn insufficient(reason: impl Into<String>) -> Self {
        Self::InsufficientData {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, QcError>;
