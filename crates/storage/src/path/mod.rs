//! Virtual path utilities.
//!
//! Pure, stateless string operations on forward-slash virtual paths. Nothing
//! in here touches the file system. Every function expects (and returns) the
//! uniform form; use [`to_uniform_path`] on anything that came from outside.
//!
//! # Examples
//!
//! ```
//! use contree_storage::path::{ancestor_folders, combine_paths, file_name, folder_name};
//!
//! assert_eq!(ancestor_folders("etc/nginx/default"), vec!["etc", "etc/nginx"]);
//! assert_eq!(combine_paths("etc/", "nginx"), "etc/nginx");
//! assert_eq!(file_name("etc/nginx/default"), "default");
//! assert_eq!(folder_name("etc/nginx/default"), "etc/nginx");
//! ```

mod marker;
mod name;
mod rename;

pub use self::marker::{DEFAULT_MARKER, PartialMarker};
pub use self::name::{is_valid_name, sanitize_name};
pub use self::rename::{RenameScope, rename_path, rename_paths};

use std::borrow::Cow;
use std::path::MAIN_SEPARATOR;

/// The separator used by every virtual path, regardless of host.
pub const SEPARATOR: char = '/';

/// Converts a host path string to the uniform forward-slash form.
///
/// On hosts whose native separator already is `/` this is the identity.
pub fn to_uniform_path(path: &str) -> Cow<'_, str> {
    match MAIN_SEPARATOR {
        SEPARATOR => Cow::Borrowed(path),
        native => Cow::Owned(path.replace(native, "/")),
    }
}

/// Converts a uniform path to the host's display form.
pub fn to_native_path(path: &str) -> Cow<'_, str> {
    match MAIN_SEPARATOR {
        SEPARATOR => Cow::Borrowed(path),
        native => Cow::Owned(path.replace(SEPARATOR, &native.to_string())),
    }
}

/// Last segment of `path`.
pub fn file_name(path: &str) -> &str {
    path.rsplit_once(SEPARATOR).map_or(path, |(_, name)| name)
}

/// Everything before the last separator, or `""` for a top-level entry.
pub fn folder_name(path: &str) -> &str {
    path.rsplit_once(SEPARATOR).map_or("", |(folder, _)| folder)
}

/// Every proper folder prefix of `path`, shortest first.
///
/// `etc/nginx/default` yields `["etc", "etc/nginx"]`. The path itself is
/// never included, and empty prefixes (from a leading or doubled `/`) are
/// skipped.
pub fn ancestor_folders(path: &str) -> Vec<&str> {
    path.match_indices(SEPARATOR)
        .map(|(offset, _)| &path[..offset])
        .filter(|folder| !folder.is_empty() && !folder.ends_with(SEPARATOR))
        .collect()
}

/// Joins two paths with exactly one separator. If either side is empty the
/// other is returned unchanged.
pub fn combine_paths(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.to_string(),
        (_, true) => a.to_string(),
        _ => format!("{}/{}", a.trim_end_matches(SEPARATOR), b.trim_start_matches(SEPARATOR)),
    }
}
