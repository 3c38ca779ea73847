//! Rename-by-transform helpers.
//!
//! The transform never sees the partial marker: it is stripped before the
//! call and re-appended to the result, so name-derivation strategies (pattern
//! replacement, dialogs, templates) can stay marker-agnostic.

use crate::error::{ErrorKind, Result};
use crate::path::{PartialMarker, SEPARATOR, combine_paths, file_name, folder_name, is_valid_name};

/// What part of a path a transform receives and returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenameScope {
    /// Only the last segment; the folder is kept as-is.
    FileName,
    /// The entire path, folders included.
    WholePath,
}

/// Derive a new path for `old_path` by running `transform` over it.
///
/// Returns [`InvalidName`](ErrorKind::InvalidName) if the transform produces
/// something that cannot name a file: an empty or illegal segment in
/// [`FileName`](RenameScope::FileName) scope, or an empty, illegal or
/// `/`-terminated path in [`WholePath`](RenameScope::WholePath) scope.
///
/// ```
/// use contree_storage::PartialMarker;
/// use contree_storage::path::{RenameScope, rename_path};
///
/// let marker = PartialMarker::default();
/// let renamed = rename_path("tv/s01e01.mkv.part", &marker, RenameScope::FileName, |name| {
///     name.replace("s01e01", "Pilot")
/// })
/// .unwrap();
/// assert_eq!(renamed, "tv/Pilot.mkv.part");
/// ```
pub fn rename_path<F>(old_path: &str, marker: &PartialMarker, scope: RenameScope, transform: F) -> Result<String>
where
    F: FnOnce(&str) -> String,
{
    let stripped = marker.strip(old_path);
    let renamed = match scope {
        RenameScope::WholePath => {
            let path = transform(stripped);
            if !is_valid_name(&path, true) || path.ends_with(SEPARATOR) {
                exn::bail!(ErrorKind::InvalidName(path));
            }
            path
        },
        RenameScope::FileName => {
            let name = transform(file_name(stripped));
            if !is_valid_name(&name, false) {
                exn::bail!(ErrorKind::InvalidName(name));
            }
            combine_paths(folder_name(stripped), &name)
        },
    };
    Ok(if marker.is_present(old_path) { marker.ensure(&renamed) } else { renamed })
}

/// Apply [`rename_path`] to each path independently, preserving order.
///
/// Failures are per element; deciding whether one failure sinks the whole
/// set is the rename engine's job.
pub fn rename_paths<'a, I, F>(paths: I, marker: &PartialMarker, scope: RenameScope, transform: F) -> Vec<Result<String>>
where
    I: IntoIterator<Item = &'a str>,
    F: Fn(&str) -> String,
{
    paths.into_iter().map(|path| rename_path(path, marker, scope, |s| transform(s))).collect()
}
