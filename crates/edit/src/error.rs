//! Edit Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A batch-building error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for batch-building operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The search pattern is empty or does not compile.
    #[display("invalid search pattern: '{_0}'")]
    Pattern(#[error(not(source))] String),
    /// A new folder or file name is not a valid single segment.
    #[display("invalid name: '{_0}'")]
    InvalidName(#[error(not(source))] String),
    /// No files were selected.
    #[display("no files selected")]
    NothingSelected,
    /// Wrapping needs every selected file to live in the same folder.
    #[display("selected files do not share a parent folder")]
    MixedParents,
    /// Reading the content tree failed; the storage error is the child frame.
    #[display("issue reading the content tree")]
    Storage,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
