use crate::error::{Error, ErrorKind, Result};
use crate::replace::Replacement;
use contree_storage::error::{Error as StorageError, ErrorKind as StorageErrorKind};
use contree_storage::path::{
    RenameScope, SEPARATOR, combine_paths, file_name, folder_name, is_valid_name, rename_path, to_uniform_path,
};
use contree_storage::{FileIndex, FileStorage, RenameBatch};
use exn::OptionExt;
use tracing::instrument;

/// Keep the storage frame as a child, surfacing name problems as our own.
fn storage_error(err: StorageError) -> Error {
    let kind = match &*err {
        StorageErrorKind::InvalidName(name) => ErrorKind::InvalidName(name.clone()),
        _ => ErrorKind::Storage,
    };
    err.raise(kind)
}

fn replace_each<S: FileStorage + ?Sized>(
    storage: &S,
    indexes: &[FileIndex],
    replacement: &Replacement,
    scope: RenameScope,
) -> Result<RenameBatch> {
    if indexes.is_empty() {
        exn::bail!(ErrorKind::NothingSelected);
    }
    let marker = &storage.options().marker;
    let mut batch = RenameBatch::new();
    for &index in indexes {
        let path = storage.file_path(index).map_err(storage_error)?;
        let renamed = rename_path(path, marker, scope, |text| replacement.apply(text)).map_err(storage_error)?;
        batch.insert(index, renamed);
    }
    tracing::debug!(files = batch.len(), ?scope, "Built replacement batch");
    Ok(batch)
}

/// Apply `replacement` to the file name of each selected file.
///
/// A replacement that introduces a `/` fails with
/// [`InvalidName`](ErrorKind::InvalidName); use [`edit_paths`] to move files
/// between folders.
#[instrument(skip_all, fields(files = indexes.len()))]
pub fn rename_names<S: FileStorage + ?Sized>(
    storage: &S,
    indexes: &[FileIndex],
    replacement: &Replacement,
) -> Result<RenameBatch> {
    replace_each(storage, indexes, replacement, RenameScope::FileName)
}

/// Apply `replacement` to the whole path of each selected file.
#[instrument(skip_all, fields(files = indexes.len()))]
pub fn edit_paths<S: FileStorage + ?Sized>(
    storage: &S,
    indexes: &[FileIndex],
    replacement: &Replacement,
) -> Result<RenameBatch> {
    replace_each(storage, indexes, replacement, RenameScope::WholePath)
}

/// Move everything under `directory` up one level, dissolving the folder
/// into its parent.
///
/// `a/b` turns `a/b/c/d.txt` into `a/c/d.txt`.
#[instrument(skip(storage))]
pub fn flatten_directory<S: FileStorage + ?Sized>(storage: &S, directory: &str) -> Result<RenameBatch> {
    let directory = to_uniform_path(directory);
    let directory = directory.trim_end_matches(SEPARATOR);
    if directory.is_empty() || !is_valid_name(directory, true) {
        exn::bail!(ErrorKind::InvalidName(directory.to_string()));
    }
    let prefix = format!("{directory}/");
    let indexes = storage.folder_indexes(&prefix).map_err(storage_error)?;
    if indexes.is_empty() {
        exn::bail!(ErrorKind::NothingSelected);
    }

    let case = storage.options().case_sensitivity;
    let parent = folder_name(directory);
    let mut batch = RenameBatch::new();
    for index in indexes {
        let path = storage.file_path(index).map_err(storage_error)?;
        let rest = case.strip_prefix(path, &prefix).ok_or_raise(|| ErrorKind::Storage)?;
        batch.insert(index, combine_paths(parent, rest));
    }
    tracing::debug!(files = batch.len(), "Built flatten batch");
    Ok(batch)
}

/// Move every file of the tree to the top level, keeping only its name.
#[instrument(skip_all)]
pub fn flatten_all<S: FileStorage + ?Sized>(storage: &S) -> Result<RenameBatch> {
    (0..storage.files_count())
        .map(|index| storage.file_name(index).map(|name| (index, name)).map_err(storage_error))
        .collect()
}

/// Whether [`wrap`] can work on `indexes`: at least one file, all in the same
/// folder.
pub fn can_wrap<S: FileStorage + ?Sized>(storage: &S, indexes: &[FileIndex]) -> Result<bool> {
    let Some((&first, rest)) = indexes.split_first() else {
        return Ok(false);
    };
    let case = storage.options().case_sensitivity;
    let parent = folder_name(storage.file_path(first).map_err(storage_error)?);
    for &index in rest {
        if !case.equals(folder_name(storage.file_path(index).map_err(storage_error)?), parent) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Move the selected files into a new sub-folder `name` of their shared
/// parent folder.
///
/// One leading and one trailing `/` are dropped from `name`; what remains
/// must be a valid single segment.
#[instrument(skip(storage))]
pub fn wrap<S: FileStorage + ?Sized>(storage: &S, indexes: &[FileIndex], name: &str) -> Result<RenameBatch> {
    let uniform = to_uniform_path(name);
    let name = uniform.strip_prefix(SEPARATOR).unwrap_or(&*uniform);
    let name = name.strip_suffix(SEPARATOR).unwrap_or(name);
    if !is_valid_name(name, false) {
        exn::bail!(ErrorKind::InvalidName(name.to_string()));
    }
    if !can_wrap(storage, indexes)? {
        exn::bail!(match indexes.is_empty() {
            true => ErrorKind::NothingSelected,
            false => ErrorKind::MixedParents,
        });
    }

    let mut batch = RenameBatch::new();
    for &index in indexes {
        let path = storage.file_path(index).map_err(storage_error)?;
        let wrapper = combine_paths(folder_name(path), name);
        batch.insert(index, combine_paths(&wrapper, file_name(path)));
    }
    Ok(batch)
}

/// Every file's current path, as a batch that restores this exact layout
/// when submitted later.
pub fn current_paths<S: FileStorage + ?Sized>(storage: &S) -> Result<RenameBatch> {
    (0..storage.files_count())
        .map(|index| storage.file_path(index).map(|path| (index, path)).map_err(storage_error))
        .collect()
}
