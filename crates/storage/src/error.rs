//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Requested file does not exist.
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Requested path resolves outside of the storage root.
    #[display("access denied: {}", _0.display())]
    AccessDenied(#[error(not(source))] PathBuf),
    /// Requested path exists but isn't something that can be served.
    #[display("not a file: {}", _0.display())]
    NotAFile(#[error(not(source))] PathBuf),
    /// The namespace root could not be enumerated.
    #[display("catalog unavailable: {_0}")]
    CatalogUnavailable(#[error(not(source))] String),
    /// A candidate container was skipped during a scan.
    #[display("skipped unrecognised container: {_0}")]
    ParseSkipped(#[error(not(source))] String),
    /// The backend could not be constructed from the configuration given.
    #[display("invalid backend configuration: {_0}")]
    Configuration(#[error(not(source))] String),
    /// Underlying I/O error.
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Network-related error (object store requests, etc.)
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Nothing in this crate retries; this is for the caller's benefit.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Network(_) | Self::CatalogUnavailable(_))
    }

    /// Map an I/O error about `path` onto the most specific kind available.
    pub(crate) fn from_io(err: IoError, path: impl Into<PathBuf>) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.into()),
            std::io::ErrorKind::PermissionDenied => Self::AccessDenied(path.into()),
            _ => Self::Io(err),
        }
    }
}
