//! In-memory rename backend for testing.

use crate::RenameBackend;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::collections::BTreeSet;
use tokio::sync::RwLock;

/// In-memory rename backend for testing.
///
/// Files are kept in a set behind a [`RwLock`], so renames can operate on
/// `&self` without external synchronisation. Renaming a path that is not in
/// the set (or onto one that is) fails the same way a real disk would.
///
/// # Examples
///
/// Needs the `mock` feature.
///
/// ```ignore
/// use contree_storage::backend::{MockBackend, RenameBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files(["incoming/a.mkv"]);
/// backend.rename("incoming/a.mkv", "films/a.mkv").await?;
/// assert_eq!(backend.files().await, vec!["films/a.mkv"]);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    files: RwLock<BTreeSet<String>>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    pub fn with_files(files: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: "mock".to_string(),
            files: RwLock::new(files.into_iter().map(Into::into).collect()),
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Every path currently held, sorted.
    pub async fn files(&self) -> Vec<String> {
        self.files.read().await.iter().cloned().collect()
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [&str; 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl RenameBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let mut guard = self.files.write().await;
        if guard.contains(to) {
            exn::bail!(ErrorKind::Backend(format!("destination already exists: {to}")));
        }
        if !guard.remove(from) {
            exn::bail!(ErrorKind::NotFound(from.to_string()));
        }
        guard.insert(to.to_string());
        Ok(())
    }
}
