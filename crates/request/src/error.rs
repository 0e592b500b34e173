//! Request Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A request parsing error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for request parsing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No `GET /<path> HTTP` request line was found. The connection should be
    /// rejected, not retried.
    #[display("url not found in request")]
    UrlNotFound,
    /// The preamble could not be read from the connection.
    #[display("failed to read request")]
    Io,
    /// The preamble is not valid UTF-8.
    #[display("request is not valid UTF-8")]
    Encoding,
    /// The preamble did not end within the size limit.
    #[display("request preamble too large")]
    TooLarge,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io)
    }
}
