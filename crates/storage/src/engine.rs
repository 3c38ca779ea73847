//! The rename engine.
//!
//! Free functions operating over any [`FileStorage`], so both the snapshot and
//! the live variant share one validate-then-commit algorithm. Each entry point
//! is a synchronous transaction against the storage's current paths:
//!
//! 1. **Validate.** Build the reserved-name set (the identity of every file
//!    *not* being renamed, plus every folder implied by *any* file's current
//!    path) and check each target against it and against the other targets.
//! 2. **Commit.** Only if every target passed, hand the whole set of new
//!    paths to the storage in one call.
//!
//! Any failure is reported before step 2, so the tree is never left partially
//! renamed.

use crate::entry::{FileIndex, RenameBatch};
use crate::error::{ErrorKind, Result};
use crate::options::Options;
use crate::path::{ancestor_folders, is_valid_name, to_uniform_path};
use crate::tree::FileStorage;
use crate::tree::sealed::Sealed as _;
use std::collections::{HashMap, HashSet};
use tracing::instrument;

/// Indexes of every file inside `folder`.
///
/// `folder` must end with `/`; matching follows the storage's
/// [case rule](crate::CaseSensitivity).
pub fn folder_indexes<S: FileStorage + ?Sized>(storage: &S, folder: &str) -> Result<Vec<FileIndex>> {
    if !folder.ends_with('/') {
        exn::bail!(ErrorKind::InvalidPath(folder.to_string()));
    }
    let case = storage.options().case_sensitivity;
    let mut indexes = Vec::new();
    for index in 0..storage.files_count() {
        if case.starts_with(&storage.file_path(index)?, folder) {
            indexes.push(index);
        }
    }
    Ok(indexes)
}

/// Run the validation phase of [`rename_files`] without committing anything.
pub fn validate_batch<S: FileStorage + ?Sized>(storage: &S, batch: &RenameBatch) -> Result<()> {
    plan(storage, batch).map(|_| ())
}

/// Atomically rename every file in `batch`, or none of them.
///
/// # Errors
/// - [`IndexOutOfRange`](ErrorKind::IndexOutOfRange) if the batch names a file
///   the tree does not have.
/// - [`PathConflict`](ErrorKind::PathConflict) if a target equals an untouched
///   file or any implied folder, or would turn an untouched file (or another
///   target) into a folder.
/// - [`DuplicateInBatch`](ErrorKind::DuplicateInBatch) if a target is also the
///   target of a later entry.
#[instrument(skip_all, fields(files = batch.len()))]
pub fn rename_files<S: FileStorage + ?Sized>(storage: &mut S, batch: &RenameBatch) -> Result<()> {
    let renames = plan(storage, batch)?;
    tracing::debug!(renames = renames.len(), "Rename batch validated");
    storage.commit(renames);
    Ok(())
}

/// Rename the file currently at `old_path` (marker ignored) to `new_path`.
#[instrument(skip(storage))]
pub fn rename_file<S: FileStorage + ?Sized>(storage: &mut S, old_path: &str, new_path: &str) -> Result<()> {
    let old_path = checked_file_path(old_path)?;
    let Options { case_sensitivity: case, marker } = storage.options();
    let wanted = case.key(marker.strip(&old_path)).into_owned();
    let mut found = None;
    for index in 0..storage.files_count() {
        let current = storage.file_path(index)?;
        if case.key(marker.strip(&current)) == wanted {
            found = Some(index);
            break;
        }
    }
    let Some(index) = found else {
        exn::bail!(ErrorKind::NotFound(old_path));
    };
    rename_file_checked(storage, index, new_path)
}

/// Rename the file at `index` to `new_path` after checking the new path is a
/// valid file path.
#[instrument(skip(storage))]
pub fn rename_file_checked<S: FileStorage + ?Sized>(storage: &mut S, index: FileIndex, new_path: &str) -> Result<()> {
    let new_path = checked_file_path(new_path)?;
    rename_files(storage, &RenameBatch::from_iter([(index, new_path)]))
}

/// Expand a folder rename into the per-file batch [`rename_folder`] submits.
///
/// Both arguments may be given with or without a trailing `/`. Each file under
/// `old_folder` gets `new_folder` substituted for that prefix; the partial
/// marker rides along untouched and is sorted out at commit time.
pub fn folder_rename_batch<S: FileStorage + ?Sized>(
    storage: &S,
    old_folder: &str,
    new_folder: &str,
) -> Result<RenameBatch> {
    for path in [old_folder, new_folder] {
        if !is_valid_name(path, true) {
            exn::bail!(ErrorKind::InvalidName(path.to_string()));
        }
    }
    let old_folder = folder_prefix(old_folder);
    let new_folder = folder_prefix(new_folder);

    let indexes = folder_indexes(storage, &old_folder)?;
    if indexes.is_empty() {
        exn::bail!(ErrorKind::NotFound(old_folder));
    }

    let case = storage.options().case_sensitivity;
    let mut batch = RenameBatch::new();
    for index in indexes {
        let path = storage.file_path(index)?;
        let Some(rest) = case.strip_prefix(&path, &old_folder) else {
            exn::bail!(ErrorKind::NotFound(path.to_string()));
        };
        batch.insert(index, format!("{new_folder}{rest}"));
    }
    Ok(batch)
}

/// Move every file under `old_folder` to `new_folder` as one transaction.
#[instrument(skip(storage))]
pub fn rename_folder<S: FileStorage + ?Sized>(storage: &mut S, old_folder: &str, new_folder: &str) -> Result<()> {
    let batch = folder_rename_batch(storage, old_folder, new_folder)?;
    rename_files(storage, &batch)
}

/// Check that a freshly loaded set of paths satisfies the tree invariants:
/// unique identities, and no file standing where another file implies a
/// folder.
pub(crate) fn check_tree<'a>(options: &Options, paths: impl IntoIterator<Item = &'a str> + Clone) -> Result<()> {
    let Options { case_sensitivity: case, marker } = options;
    let mut files = HashSet::new();
    let mut folders = HashSet::new();
    for path in paths.clone() {
        if !files.insert(case.key(marker.strip(path)).into_owned()) {
            exn::bail!(ErrorKind::PathConflict(path.to_string()));
        }
        folders.extend(ancestor_folders(path).into_iter().map(|folder| case.key(folder).into_owned()));
    }
    if let Some(path) = paths.into_iter().find(|path| folders.contains(&*case.key(marker.strip(path)))) {
        exn::bail!(ErrorKind::PathConflict(path.to_string()));
    }
    Ok(())
}

/// Validation phase. Returns the exact paths to write, in index order.
fn plan<S: FileStorage + ?Sized>(storage: &S, batch: &RenameBatch) -> Result<Vec<(FileIndex, String)>> {
    let Options { case_sensitivity: case, marker } = storage.options();
    let count = storage.files_count();
    if let Some(index) = batch.indexes().find(|index| *index >= count) {
        exn::bail!(ErrorKind::IndexOutOfRange(index));
    }

    let current = (0..count).map(|index| storage.file_path(index)).collect::<Result<Vec<_>>>()?;

    // Identities of files that keep their path, and everything a new name
    // must not land on.
    let mut untouched = HashSet::new();
    let mut reserved = HashSet::new();
    for (index, path) in current.iter().enumerate() {
        if !batch.contains(index) {
            let identity = case.key(marker.strip(path)).into_owned();
            untouched.insert(identity.clone());
            reserved.insert(identity);
        }
        reserved.extend(ancestor_folders(path).into_iter().map(|folder| case.key(folder).into_owned()));
    }

    let targets: Vec<(FileIndex, &str, String)> = batch
        .iter()
        .map(|(index, name)| {
            let stripped = marker.strip(name);
            (index, name, case.key(stripped).into_owned())
        })
        .collect();
    let target_keys: HashSet<&str> = targets.iter().map(|(_, _, key)| key.as_str()).collect();
    let mut remaining: HashMap<&str, usize> = HashMap::new();
    for (_, _, key) in &targets {
        *remaining.entry(key.as_str()).or_default() += 1;
    }

    for (_, name, key) in &targets {
        if reserved.contains(key) {
            exn::bail!(ErrorKind::PathConflict(name.to_string()));
        }
        if let Some(left) = remaining.get_mut(key.as_str()) {
            *left -= 1;
            if *left > 0 {
                exn::bail!(ErrorKind::DuplicateInBatch(name.to_string()));
            }
        }
        // A target must not need an existing file (or another target) to
        // double as its folder.
        let stripped = marker.strip(name);
        for folder in ancestor_folders(stripped) {
            let folder = case.key(folder);
            if untouched.contains(&*folder) || target_keys.contains(&*folder) {
                exn::bail!(ErrorKind::PathConflict(name.to_string()));
            }
        }
    }

    Ok(targets
        .into_iter()
        .map(|(index, name, _)| {
            let path = match marker.is_present(&current[index]) {
                true => marker.ensure(marker.strip(name)),
                false => name.to_string(),
            };
            (index, path)
        })
        .collect())
}

/// Validate a whole path that must name a file, returning its uniform form.
fn checked_file_path(path: &str) -> Result<String> {
    if !is_valid_name(path, true) {
        exn::bail!(ErrorKind::InvalidName(path.to_string()));
    }
    let uniform = to_uniform_path(path);
    if uniform.ends_with('/') {
        exn::bail!(ErrorKind::InvalidPath(uniform.into_owned()));
    }
    Ok(uniform.into_owned())
}

/// Uniform form of `path` ending in exactly one `/`.
fn folder_prefix(path: &str) -> String {
    let uniform = to_uniform_path(path);
    format!("{}/", uniform.trim_end_matches('/'))
}
