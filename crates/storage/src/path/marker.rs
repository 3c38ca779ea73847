//! Partial-download marker handling.

use crate::error::{ErrorKind, Result};
use crate::path::SEPARATOR;

/// Suffix applied to files that are not yet fully downloaded.
pub const DEFAULT_MARKER: &str = ".part";

/// Suffix convention marking a file as "not yet fully materialized".
///
/// The marker is orthogonal to a file's identity: comparisons always happen on
/// [stripped](Self::strip) paths, and renames re-apply the marker when the
/// renamed file carried it.
///
/// ```
/// use contree_storage::PartialMarker;
///
/// let marker = PartialMarker::default();
/// assert_eq!(marker.ensure("movie.mkv"), "movie.mkv.part");
/// assert_eq!(marker.ensure("movie.mkv.part"), "movie.mkv.part");
/// assert_eq!(marker.strip("movie.mkv.part"), "movie.mkv");
/// assert_eq!(marker.strip("movie.mkv"), "movie.mkv");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PartialMarker {
    suffix: String,
}

impl PartialMarker {
    /// Create a marker from its suffix.
    ///
    /// Returns [`InvalidName`](ErrorKind::InvalidName) if the suffix is empty
    /// or contains a separator.
    pub fn new(suffix: impl Into<String>) -> Result<Self> {
        let suffix = suffix.into();
        if suffix.is_empty() || suffix.contains(SEPARATOR) {
            exn::bail!(ErrorKind::InvalidName(suffix));
        }
        Ok(Self { suffix })
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn is_present(&self, path: &str) -> bool {
        path.ends_with(&self.suffix)
    }

    /// Remove the marker if present; identity otherwise.
    pub fn strip<'a>(&self, path: &'a str) -> &'a str {
        path.strip_suffix(self.suffix.as_str()).unwrap_or(path)
    }

    /// Append the marker unless it is already there.
    pub fn ensure(&self, path: &str) -> String {
        if self.is_present(path) { path.to_string() } else { format!("{path}{}", self.suffix) }
    }
}

impl Default for PartialMarker {
    fn default() -> Self {
        Self { suffix: DEFAULT_MARKER.to_string() }
    }
}
