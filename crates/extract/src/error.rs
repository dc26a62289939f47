//! Extraction Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use crate::descriptor::DescriptorFormat;
use derive_more::{Display, Error};

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// Every variant means "this container is not something we can catalog"; the
/// caller is expected to skip it and carry on.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Neither descriptor format was found inside the container.
    #[display("no database descriptor found")]
    MissingDescriptor,
    /// A descriptor was found but could not be parsed.
    #[display("malformed {format} descriptor: {reason}")]
    MalformedDescriptor {
        /// Which descriptor generation failed to parse.
        format: DescriptorFormat,
        /// Details about the parsing failure.
        reason: String,
    },
    /// The archive could not be opened or one of its members could not be read.
    #[display("invalid archive")]
    InvalidArchive,
    /// Reading the container bytes failed.
    #[display("I/O error")]
    Io,
}
