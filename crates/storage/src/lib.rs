//! Content tree storage.
//!
//! A content set (a torrent, a dataset, a backup) is a fixed, ordered list of
//! files addressed by forward-slash virtual paths. This crate keeps such a
//! list, validates arbitrary rename batches against it, and commits them
//! all-or-nothing:
//!
//! - [`path`] holds the pure path utilities (names, markers, transforms).
//! - [`engine`] is the validate-then-commit rename algorithm.
//! - [`ContentSnapshot`] and [`LiveStorage`] are the two [`FileStorage`]
//!   variants; the latter forwards committed renames to a
//!   [`RenameBackend`].

pub mod backend;
pub mod engine;
mod entry;
pub mod error;
mod options;
pub mod path;
mod tree;

pub use crate::backend::RenameBackend;
pub use crate::entry::{FileEntry, FileIndex, RenameBatch};
pub use crate::options::{CaseSensitivity, Options};
pub use crate::path::PartialMarker;
pub use crate::tree::{ContentSnapshot, FileStorage, LiveStorage, RenameEvent};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn RenameBackend + Send + Sync>;
