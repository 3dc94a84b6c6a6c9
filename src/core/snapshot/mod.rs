//! core::snapshot
//!
//! Snapshot storage: commits as directories of files plus a metadata record.
//!
//! # Modules
//!
//! - [`schema`] - Commit metadata record and the loaded [`Commit`] view
//! - [`entry`] - Incoming file entries (in-memory or spooled)
//! - [`store`] - The append-only [`SnapshotStore`]

pub mod entry;
pub mod schema;
pub mod store;

pub use entry::{FileContent, FileEntry};
pub use schema::{Commit, CommitMetadata, MetadataError, SEED_MESSAGE};
pub use store::{write_commit_dir, RepoHandle, RepoWriter, SnapshotStore, StoreError};
