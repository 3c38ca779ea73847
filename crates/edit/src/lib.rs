//! Batch builders.
//!
//! Every function here reads a [`FileStorage`](contree_storage::FileStorage)
//! and returns a [`RenameBatch`](contree_storage::RenameBatch) describing the
//! user's intent. Nothing is renamed until the caller submits the batch, so a
//! builder can be previewed, validated, or thrown away freely.

mod batch;
pub mod error;
mod replace;

pub use crate::batch::{can_wrap, current_paths, edit_paths, flatten_all, flatten_directory, rename_names, wrap};
pub use crate::replace::Replacement;
