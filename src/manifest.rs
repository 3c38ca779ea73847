//! JSON manifest describing a content tree.

use crate::error::{ErrorKind, Result};
use contree_storage::{ContentSnapshot, FileEntry, Options};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub path: String,
    pub size: u64,
}

/// On-disk form of a content tree. File order is the file index.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub files: Vec<ManifestFile>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path).or_raise(|| ErrorKind::Manifest(path.to_path_buf()))?;
        let manifest: Self = serde_json::from_slice(&raw).or_raise(|| ErrorKind::Manifest(path.to_path_buf()))?;
        tracing::debug!(path = %path.display(), files = manifest.files.len(), "Read manifest");
        Ok(manifest)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_vec_pretty(self).or_raise(|| ErrorKind::Manifest(path.to_path_buf()))?;
        std::fs::write(path, raw).or_raise(|| ErrorKind::Manifest(path.to_path_buf()))?;
        tracing::info!(path = %path.display(), files = self.files.len(), "Wrote manifest");
        Ok(())
    }

    pub fn into_snapshot(self, options: Options) -> contree_storage::error::Result<ContentSnapshot> {
        ContentSnapshot::new(self.files.into_iter().map(|file| (file.path, file.size)), options)
    }
}

impl From<&[FileEntry]> for Manifest {
    fn from(entries: &[FileEntry]) -> Self {
        let files = entries.iter().map(|entry| ManifestFile { path: entry.path.clone(), size: entry.size }).collect();
        Self { files }
    }
}
