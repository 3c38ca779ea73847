//! Local filesystem rename backend.
//!
//! Moves files inside a configured root directory using `tokio::fs`.

use crate::error::{ErrorKind, Result};
use crate::path::to_native_path;
use crate::RenameBackend;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Local filesystem rename backend.
///
/// All virtual paths are relative to the configured root directory. Folders
/// are created on demand and removed again once a rename leaves them empty,
/// so the on-disk layout tracks the implicit folders of the content tree.
///
/// # Examples
///
/// ```no_run
/// use contree_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("downloads", "/srv/downloads/ubuntu-iso")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    /// Root directory of the content set
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPath`](ErrorKind::InvalidPath) if `root` is not an
    /// absolute path to an existing directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() || !root.is_dir() {
            exn::bail!(ErrorKind::InvalidPath(root.display().to_string()));
        }
        Ok(Self { name: name.into(), root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the absolute path for a virtual path.
    ///
    /// Anything that could escape the root (absolute paths, `..`, drive
    /// prefixes) is rejected.
    fn absolute_path(&self, path: &str) -> Result<PathBuf> {
        let native = to_native_path(path);
        let mut absolute = self.root.clone();
        for component in Path::new(native.as_ref()).components() {
            match component {
                Component::Normal(segment) => absolute.push(segment),
                Component::CurDir => {},
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    exn::bail!(ErrorKind::InvalidPath(path.to_string()))
                },
            }
        }
        if absolute == self.root {
            exn::bail!(ErrorKind::InvalidPath(path.to_string()));
        }
        Ok(absolute)
    }

    fn map_io_error(e: std::io::Error, path: &str) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_string()),
            _ => ErrorKind::Backend(format!("{path}: {e}")),
        }
    }

    /// Remove folders between `from` and the root that the last rename left
    /// empty. Best effort; a folder that is still in use stays.
    async fn prune_empty_parents(&self, from: &Path) {
        let mut folder = from.parent();
        while let Some(current) = folder
            && current != self.root
            && current.starts_with(&self.root)
        {
            if fs::remove_dir(current).await.is_err() {
                break;
            }
            tracing::debug!(folder = %current.display(), "Removed empty folder");
            folder = current.parent();
        }
    }
}

#[async_trait]
impl RenameBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let from_path = self.absolute_path(from)?;
        let to_path = self.absolute_path(to)?;
        if fs::try_exists(&to_path).await.map_err(|e| Self::map_io_error(e, to))? {
            exn::bail!(ErrorKind::Backend(format!("destination already exists: {to}")));
        }
        // Create parent directories for destination if needed
        if let Some(parent) = to_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, to))?;
        }
        fs::rename(&from_path, &to_path).await.map_err(|e| Self::map_io_error(e, from))?;
        self.prune_empty_parents(&from_path).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn backend_with(files: &[&str]) -> (tempfile::TempDir, LocalBackend) {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            let path = dir.path().join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, file.as_bytes()).unwrap();
        }
        let backend = LocalBackend::new("test", dir.path()).unwrap();
        (dir, backend)
    }

    #[test]
    fn test_new_requires_absolute_path() {
        assert!(LocalBackend::new("test", "relative/path").is_err());
    }

    #[test]
    fn test_new_requires_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LocalBackend::new("test", dir.path().join("missing")).is_err());
    }

    #[tokio::test]
    async fn test_rename_creates_folders_and_prunes_empty_ones() {
        let (dir, backend) = backend_with(&["a/b/file.txt", "keep/other.txt"]);
        backend.rename("a/b/file.txt", "c/d/file.txt").await.unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("c/d/file.txt")).unwrap(), "a/b/file.txt");
        assert!(!dir.path().join("a").exists());
        assert!(dir.path().join("keep/other.txt").exists());
        assert!(dir.path().exists());
    }

    #[tokio::test]
    async fn test_rename_keeps_non_empty_folders() {
        let (dir, backend) = backend_with(&["a/one", "a/two"]);
        backend.rename("a/one", "one").await.unwrap();
        assert!(dir.path().join("a/two").exists());
        assert!(dir.path().join("one").exists());
    }

    #[tokio::test]
    async fn test_rename_refuses_overwrite() {
        let (dir, backend) = backend_with(&["a", "b"]);
        let err = backend.rename("a", "b").await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(std::fs::read_to_string(dir.path().join("b")).unwrap(), "b");
    }

    #[tokio::test]
    async fn test_rename_missing_source() {
        let (_dir, backend) = backend_with(&[]);
        let err = backend.rename("missing", "b").await.unwrap_err();
        assert_eq!(*err, ErrorKind::NotFound("missing".into()));
    }

    #[rstest]
    #[case("../escape")]
    #[case("a/../../escape")]
    #[case("/etc/passwd")]
    #[case("")]
    #[tokio::test]
    async fn test_rename_rejects_paths_outside_root(#[case] target: &str) {
        let (dir, backend) = backend_with(&["a"]);
        let err = backend.rename("a", target).await.unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidPath(target.into()));
        assert!(dir.path().join("a").exists());
    }
}
