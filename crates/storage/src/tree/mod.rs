//! File Storage variants.
//!
//! Every variant holds the same thing (an ordered list of file paths, each
//! with a size) and exposes the same rename operations through
//! [`FileStorage`]. They differ only in what a successful commit does:
//!
//! - [`ContentSnapshot`] updates its in-memory paths and nothing else.
//! - [`LiveStorage`] updates its paths and then forwards every changed path to
//!   a [rename backend](crate::backend) for the physical move.

mod live;
mod snapshot;

pub use self::live::{LiveStorage, RenameEvent};
pub use self::snapshot::ContentSnapshot;
use crate::engine;
use crate::entry::{FileIndex, RenameBatch};
use crate::error::Result;
use crate::options::Options;
use crate::path::file_name;

pub(crate) mod sealed {
    use crate::entry::FileIndex;

    pub trait Sealed {
        /// Replace the path of every listed file. Only ever called by the
        /// rename engine, after the whole set passed validation.
        fn commit(&mut self, renames: Vec<(FileIndex, String)>);
    }
}

/// Read access to a content tree, plus the rename operations shared by every
/// variant.
///
/// This trait is sealed: the rename engine is the only way to change a path,
/// so outside implementations could not uphold the tree invariants.
///
/// # Examples
///
/// ```
/// use contree_storage::{ContentSnapshot, FileStorage, Options, RenameBatch};
///
/// let mut tree = ContentSnapshot::new([("docs/readme", 10), ("docs/license", 20)], Options::default()).unwrap();
/// tree.rename_folder("docs", "info").unwrap();
/// assert_eq!(tree.file_path(0).unwrap(), "info/readme");
///
/// // Nothing moves unless everything can.
/// let batch = RenameBatch::from_iter([(0, "info/license")]);
/// assert!(tree.rename_files(&batch).is_err());
/// assert_eq!(tree.file_path(0).unwrap(), "info/readme");
/// assert_eq!(tree.file_path(1).unwrap(), "info/license");
/// ```
pub trait FileStorage: sealed::Sealed {
    /// Settings this tree compares and marks paths with.
    fn options(&self) -> &Options;

    fn files_count(&self) -> usize;

    /// Current path of the file at `index`, partial marker included.
    fn file_path(&self, index: FileIndex) -> Result<&str>;

    fn file_size(&self, index: FileIndex) -> Result<u64>;

    /// Last segment of the file's current path.
    fn file_name(&self, index: FileIndex) -> Result<&str> {
        self.file_path(index).map(file_name)
    }

    /// See [`engine::folder_indexes`].
    fn folder_indexes(&self, folder: &str) -> Result<Vec<FileIndex>> {
        engine::folder_indexes(self, folder)
    }

    /// See [`engine::validate_batch`].
    fn validate_batch(&self, batch: &RenameBatch) -> Result<()> {
        engine::validate_batch(self, batch)
    }

    /// See [`engine::rename_files`].
    fn rename_files(&mut self, batch: &RenameBatch) -> Result<()> {
        engine::rename_files(self, batch)
    }

    /// See [`engine::rename_file`].
    fn rename_file(&mut self, old_path: &str, new_path: &str) -> Result<()> {
        engine::rename_file(self, old_path, new_path)
    }

    /// See [`engine::rename_file_checked`].
    fn rename_file_checked(&mut self, index: FileIndex, new_path: &str) -> Result<()> {
        engine::rename_file_checked(self, index, new_path)
    }

    /// See [`engine::folder_rename_batch`].
    fn folder_rename_batch(&self, old_folder: &str, new_folder: &str) -> Result<RenameBatch> {
        engine::folder_rename_batch(self, old_folder, new_folder)
    }

    /// See [`engine::rename_folder`].
    fn rename_folder(&mut self, old_folder: &str, new_folder: &str) -> Result<()> {
        engine::rename_folder(self, old_folder, new_folder)
    }
}
