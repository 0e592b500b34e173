//! CLI Error Types

use derive_more::{Display, Error};

/// A CLI error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for CLI commands.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("cache storage failure")]
    Storage,
    #[display("could not parse request")]
    Request,
    #[display("nothing cached for {_0}")]
    NotCached(#[error(not(source))] String),
    #[display("could not write output")]
    Output,
}
