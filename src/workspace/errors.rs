//! workspace::errors
//!
//! Error types for client-side working directory operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::archive::ArchiveError;
use crate::core::config::ConfigError;
use crate::core::ops::LockError;
use crate::core::snapshot::{MetadataError, StoreError};
use crate::core::types::TypeError;
use crate::engine::SyncError;

/// Errors from working directory operations.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// No tracking record in the directory or any ancestor.
    #[error("'{0}' is not a pit working directory (run 'pit clone' first)")]
    NotTracked(PathBuf),

    /// Clone destination is already present.
    #[error("destination '{0}' already exists")]
    DestinationExists(PathBuf),

    /// The working tree matches the last known snapshot.
    #[error("no changes to commit")]
    NoChanges,

    /// A working tree file exceeds the per-file ceiling; nothing is staged.
    #[error("file '{path}' is {size} bytes, over the {limit} byte limit")]
    FileTooLarge { path: String, size: u64, limit: u64 },

    /// A push stopped partway; every staged commit is still queued.
    #[error("push interrupted after {acknowledged} of {total} commit(s): {source}")]
    PushInterrupted {
        acknowledged: usize,
        total: usize,
        #[source]
        source: SyncError,
    },

    /// The archive names a different repository than the one requested.
    #[error("archive is for '{found}', expected '{expected}'")]
    RepoMismatch { expected: String, found: String },

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Path(#[from] TypeError),

    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub(crate) fn io_err(path: &std::path::Path) -> impl FnOnce(std::io::Error) -> WorkspaceError + '_ {
    move |source| WorkspaceError::Io {
        path: path.to_path_buf(),
        source,
    }
}
