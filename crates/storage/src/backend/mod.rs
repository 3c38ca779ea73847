//! Rename backends.
//!
//! A [`LiveStorage`](crate::LiveStorage) updates its own paths synchronously
//! and then forwards every committed rename to a [`RenameBackend`], which is
//! where the bytes actually move. The backend runs behind the live tree's
//! queue, so a slow disk never blocks validation or further renames.

mod dry_run;
mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use self::dry_run::DryRunBackend;
pub use self::local::LocalBackend;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockBackend;
use crate::error::Result;
use async_trait::async_trait;

/// Something that can physically move a file of a content tree.
///
/// Paths are uniform virtual paths, relative to whatever root the backend
/// was configured with. Requests for one tree arrive strictly in commit
/// order, one at a time.
///
/// # Examples
///
/// ```
/// use contree_storage::backend::RenameBackend;
/// use contree_storage::error::Result;
///
/// async fn move_twice(backend: &dyn RenameBackend) -> Result<()> {
///     backend.rename("incoming/a.mkv.part", "films/a.mkv.part").await?;
///     backend.rename("films/a.mkv.part", "films/A.mkv.part").await
/// }
/// ```
#[async_trait]
pub trait RenameBackend: Send + Sync {
    /// Name of the configured backend, used for logging only.
    fn name(&self) -> &str;

    /// Move the file at `from` to `to`, creating parent folders as needed.
    ///
    /// Implementations must refuse to overwrite an existing file.
    async fn rename(&self, from: &str, to: &str) -> Result<()>;
}
