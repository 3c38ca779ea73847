//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Every validation variant carries the offending path (or index) so that
//! whoever asked for the rename can tell the user exactly what to fix. The
//! content tree is never modified when one of those is returned.

use crate::entry::FileIndex;
use derive_more::{Display, Error};

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A path or path segment contains characters no file system accepts.
    #[display("invalid name: '{_0}'")]
    InvalidName(#[error(not(source))] String),
    /// A leaf name was required but the path ends in a separator.
    #[display("invalid file path: '{_0}'")]
    InvalidPath(#[error(not(source))] String),
    /// Target collides with an untouched file or a folder implied by another file.
    #[display("renamed file would conflict with another file or folder: '{_0}'")]
    PathConflict(#[error(not(source))] String),
    /// Two targets of the same batch coincide.
    #[display("multiple renamed files would have the same name: '{_0}'")]
    DuplicateInBatch(#[error(not(source))] String),
    /// Source file or folder does not resolve to any current entry.
    #[display("no such file or folder: '{_0}'")]
    NotFound(#[error(not(source))] String),
    /// A batch names an index the content tree does not have.
    #[display("no file with index {_0}")]
    IndexOutOfRange(#[error(not(source))] FileIndex),
    /// The physical rename behind a live tree failed.
    #[display("backend error: {_0}")]
    Backend(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Only backend failures are transient; every other kind fails the same
    /// way until the caller corrects the input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend(_))
    }

    /// The path (or index, rendered) the error is about.
    pub fn subject(&self) -> String {
        match self {
            Self::InvalidName(p)
            | Self::InvalidPath(p)
            | Self::PathConflict(p)
            | Self::DuplicateInBatch(p)
            | Self::NotFound(p)
            | Self::Backend(p) => p.clone(),
            Self::IndexOutOfRange(index) => index.to_string(),
        }
    }
}
