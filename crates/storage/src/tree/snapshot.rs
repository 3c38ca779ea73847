//! In-memory content tree, detached from any physical files.

use super::{FileStorage, sealed};
use crate::engine::check_tree;
use crate::entry::{FileEntry, FileIndex};
use crate::error::{ErrorKind, Result};
use crate::options::Options;
use crate::path::{SEPARATOR, is_valid_name, to_uniform_path};
use exn::OptionExt;

/// A content tree that only exists in memory, e.g. one parsed from a manifest
/// before anything has been downloaded.
///
/// Renames update the stored paths and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSnapshot {
    options: Options,
    entries: Vec<FileEntry>,
}

impl ContentSnapshot {
    /// Build a tree from `(path, size)` pairs, indexed in the order given.
    ///
    /// Paths are converted to the uniform form first.
    ///
    /// # Errors
    /// - [`InvalidName`](ErrorKind::InvalidName) for an empty path or one with
    ///   illegal characters.
    /// - [`InvalidPath`](ErrorKind::InvalidPath) for a path ending in `/`.
    /// - [`PathConflict`](ErrorKind::PathConflict) if two paths share an
    ///   identity, or a file sits where another file implies a folder.
    pub fn new<P: Into<String>>(files: impl IntoIterator<Item = (P, u64)>, options: Options) -> Result<Self> {
        let mut entries = Vec::new();
        for (index, (path, size)) in files.into_iter().enumerate() {
            let path = path.into();
            if !is_valid_name(&path, true) {
                exn::bail!(ErrorKind::InvalidName(path));
            }
            let path = to_uniform_path(&path).into_owned();
            if path.ends_with(SEPARATOR) {
                exn::bail!(ErrorKind::InvalidPath(path));
            }
            entries.push(FileEntry { index, path, size });
        }
        check_tree(&options, entries.iter().map(|entry| entry.path.as_str()))?;
        tracing::debug!(files = entries.len(), "Loaded content tree");
        Ok(Self { options, entries })
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// Sum of every file's size in bytes.
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|entry| entry.size).sum()
    }

    pub(crate) fn from_parts(options: Options, entries: Vec<FileEntry>) -> Self {
        Self { options, entries }
    }

    pub(crate) fn into_parts(self) -> (Options, Vec<FileEntry>) {
        (self.options, self.entries)
    }

    fn entry(&self, index: FileIndex) -> Result<&FileEntry> {
        self.entries.get(index).ok_or_raise(|| ErrorKind::IndexOutOfRange(index))
    }
}

impl sealed::Sealed for ContentSnapshot {
    fn commit(&mut self, renames: Vec<(FileIndex, String)>) {
        for (index, path) in renames {
            if let Some(entry) = self.entries.get_mut(index) {
                entry.path = path;
            }
        }
    }
}

impl FileStorage for ContentSnapshot {
    fn options(&self) -> &Options {
        &self.options
    }

    fn files_count(&self) -> usize {
        self.entries.len()
    }

    fn file_path(&self, index: FileIndex) -> Result<&str> {
        self.entry(index).map(|entry| entry.path.as_str())
    }

    fn file_size(&self, index: FileIndex) -> Result<u64> {
        self.entry(index).map(|entry| entry.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::RenameBatch;
    use rstest::rstest;

    #[test]
    fn test_new_indexes_in_order() {
        let tree = ContentSnapshot::new([("b", 2), ("a/x", 1)], Options::default()).unwrap();
        assert_eq!(tree.files_count(), 2);
        assert_eq!(tree.file_path(0).unwrap(), "b");
        assert_eq!(tree.file_size(1).unwrap(), 1);
        assert_eq!(tree.file_name(1).unwrap(), "x");
        assert_eq!(tree.total_size(), 3);
        assert_eq!(tree.entries()[1], FileEntry { index: 1, path: "a/x".into(), size: 1 });
    }

    #[rstest]
    #[case("", ErrorKind::InvalidName("".into()))]
    #[case("a/b?", ErrorKind::InvalidName("a/b?".into()))]
    #[case("a/", ErrorKind::InvalidPath("a/".into()))]
    fn test_new_rejects_bad_paths(#[case] path: &str, #[case] expected: ErrorKind) {
        let err = ContentSnapshot::new([(path, 0)], Options::default()).unwrap_err();
        assert_eq!(*err, expected);
    }

    #[test]
    fn test_new_rejects_file_folder_overlap() {
        let err = ContentSnapshot::new([("a", 0), ("a/b", 0)], Options::default()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::PathConflict(_)));
    }

    #[test]
    fn test_index_out_of_range() {
        let tree = ContentSnapshot::new([("a", 0)], Options::default()).unwrap();
        assert_eq!(*tree.file_path(1).unwrap_err(), ErrorKind::IndexOutOfRange(1));
        assert_eq!(*tree.file_size(9).unwrap_err(), ErrorKind::IndexOutOfRange(9));
    }

    #[test]
    fn test_sizes_survive_renames() {
        let mut tree = ContentSnapshot::new([("a", 10), ("b", 20)], Options::default()).unwrap();
        tree.rename_files(&RenameBatch::from_iter([(0, "z/a"), (1, "z/b")])).unwrap();
        assert_eq!(tree.file_size(0).unwrap(), 10);
        assert_eq!(tree.file_size(1).unwrap(), 20);
        assert_eq!(tree.folder_indexes("z/").unwrap(), vec![0, 1]);
    }
}
