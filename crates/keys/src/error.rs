//! Key Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A key derivation error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for key derivation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Percent-encoded text is malformed or does not decode to UTF-8. Callers
    /// should fall back to the original string.
    #[display("malformed percent-encoding: {_0}")]
    Decode(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Decoding is a pure function of its input.
        false
    }
}
