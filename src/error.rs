//! Command-line Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A command-line error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for command-line operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not read or write manifest: {}", _0.display())]
    Manifest(#[error(not(source))] PathBuf),
    #[display("rename rejected")]
    Storage,
    #[display("could not build rename batch")]
    Edit,
    #[display("{_0} physical rename(s) failed; the manifest records the intended layout")]
    Backend(#[error(not(source))] usize),
    #[display("could not write output")]
    Output,
}
