//! Content tree models.
//!
//! A content tree is a flat, ordered list of [`FileEntry`] values. Folders
//! are implicit: every proper prefix of a path up to a `/` is a folder, and
//! no entry exists for the folder itself.

use std::collections::BTreeMap;
use std::collections::btree_map;

/// Position of a file in its content tree. Assigned once, never reused.
pub type FileIndex = usize;

/// One file of a content set.
///
/// Only `path` ever changes, and only through a successful rename commit.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileEntry {
    /// Stable position in the content tree
    pub index: FileIndex,
    /// Forward-slash virtual path, possibly carrying the partial marker
    pub path: String,
    /// File size in bytes
    pub size: u64,
}

/// Proposed new paths for a subset of a tree's files.
///
/// Entries are kept in ascending index order, which is also the order the
/// rename engine validates them in. Inserting an index twice replaces the
/// earlier target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameBatch {
    targets: BTreeMap<FileIndex, String>,
}

impl RenameBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target path for `index`, returning the previous target if any.
    pub fn insert(&mut self, index: FileIndex, path: impl Into<String>) -> Option<String> {
        self.targets.insert(index, path.into())
    }

    pub fn get(&self, index: FileIndex) -> Option<&str> {
        self.targets.get(&index).map(String::as_str)
    }

    pub fn contains(&self, index: FileIndex) -> bool {
        self.targets.contains_key(&index)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn indexes(&self) -> impl Iterator<Item = FileIndex> + '_ {
        self.targets.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FileIndex, &str)> + '_ {
        self.targets.iter().map(|(index, path)| (*index, path.as_str()))
    }
}

impl<S: Into<String>> FromIterator<(FileIndex, S)> for RenameBatch {
    fn from_iter<I: IntoIterator<Item = (FileIndex, S)>>(iter: I) -> Self {
        let mut batch = Self::new();
        batch.extend(iter);
        batch
    }
}

impl<S: Into<String>> Extend<(FileIndex, S)> for RenameBatch {
    fn extend<I: IntoIterator<Item = (FileIndex, S)>>(&mut self, iter: I) {
        for (index, path) in iter {
            self.insert(index, path);
        }
    }
}

impl IntoIterator for RenameBatch {
    type Item = (FileIndex, String);
    type IntoIter = btree_map::IntoIter<FileIndex, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.targets.into_iter()
    }
}
