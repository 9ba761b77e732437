//! Error Types
//!
//! Every fallible operation in this crate returns [`Result<T>`]. The variants
//! are all precondition violations: a shape that does not line up, a
//! hyperparameter outside its domain, or a network used out of order. None of
//! them are retried or repaired; the caller fixes the input and tries again.
//!
//! Numerical degeneracy is deliberately *not* in this list. A rank-deficient
//! least-squares system is a normal outcome of [`crate::qr::least_squares`]
//! and is reported through its `rank` field.

use thiserror::Error;

/// All error conditions raised by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A buffer, row, or tensor did not have the size the operation requires.
    #[error("{context}: expected length {expected}, got {actual}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Dimensions that can never describe a valid layer, tensor or matrix.
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// Hyperparameters outside their documented domain.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A combination of layer variants or operations that is not implemented.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A network operation was called in the wrong lifecycle state.
    #[error("network is {actual}, but this operation requires it to be {expected}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// NaN or infinity where the solver needs finite values.
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Returns a [`Error::DimensionMismatch`] unless `actual == expected`.
pub(crate) fn check_len(context: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::DimensionMismatch {
            context,
            expected,
            actual,
        })
    }
}
