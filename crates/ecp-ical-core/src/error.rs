//! Core error types.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while interpreting scraped event data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A `start`/`end` value could not be parsed as a timestamp.
    #[error("invalid timestamp: {value:?}")]
    InvalidTimestamp { value: String },
}

impl CoreError {
    /// Creates an invalid timestamp error.
    pub fn invalid_timestamp(value: impl Into<String>) -> Self {
        Self::InvalidTimestamp {
            value: value.into(),
        }
    }
}
