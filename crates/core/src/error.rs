//! Error types for the tradeflow system.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the tradeflow system.
#[derive(Error, Debug)]
pub enum Error {
    /// The per-date archive resource is missing or unreadable.
    ///
    /// Fatal for the whole run: output already flushed must not be
    /// trusted, and the caller reports failure instead of retrying or
    /// falling back to a remote fetch.
    #[error("archive unavailable: {0}")]
    ArchiveUnavailable(String),

    /// Malformed order book or history content.
    ///
    /// A single bad item aborts the entire run; there is no per-item
    /// recovery.
    #[error("data error: {0}")]
    Data(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an archive-unavailable error.
    pub fn archive_unavailable(msg: impl Into<String>) -> Self {
        Error::ArchiveUnavailable(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }
}
