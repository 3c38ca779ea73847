//! Dry-run rename backend.
//!
//! Wraps another backend and prevents renames from executing, but indicates
//! success on return.

use crate::error::Result;
use crate::{BackendHandle, RenameBackend};
use async_trait::async_trait;

/// Dry-run rename backend.
///
/// Wraps another backend and silently drops every rename, logging an
/// [`info event`](tracing::Event) instead.
#[derive(Clone)]
pub struct DryRunBackend {
    inner: BackendHandle,
}
impl DryRunBackend {
    pub fn new(inner: BackendHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl RenameBackend for DryRunBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        tracing::info!(backend = self.inner.name(), from, to, "Skipping rename during dry run");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_rename_is_skipped() {
        let inner = Arc::new(MockBackend::with_files(["a"]).with_name("disk"));
        let backend = DryRunBackend::new(inner.clone());
        assert_eq!(backend.name(), "disk");
        backend.rename("a", "b").await.unwrap();
        assert_eq!(inner.files().await, vec!["a"]);
    }
}
