//! engine::errors
//!
//! The sync operation error taxonomy.
//!
//! Every operation fails with a [`SyncError`] whose [`ErrorKind`] is a
//! stable, machine-readable code. Errors are terminal: the engine never
//! retries. Lower-layer errors are folded in through `From` impls so that
//! store and codec internals surface as the right kind.

use thiserror::Error;

use crate::auth::AuthError;
use crate::core::archive::ArchiveError;
use crate::core::snapshot::StoreError;
use crate::core::types::TypeError;

/// Stable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AuthFailed,
    NotAuthorized,
    AlreadyExists,
    RepoNotFound,
    CommitNotFound,
    NoCommits,
    NoChanges,
    FileTooLarge,
    CorruptArchive,
    InvalidInput,
    StorageFault,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AuthFailed => "auth_failed",
            ErrorKind::NotAuthorized => "not_authorized",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::RepoNotFound => "repo_not_found",
            ErrorKind::CommitNotFound => "commit_not_found",
            ErrorKind::NoCommits => "no_commits",
            ErrorKind::NoChanges => "no_changes",
            ErrorKind::FileTooLarge => "file_too_large",
            ErrorKind::CorruptArchive => "corrupt_archive",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::StorageFault => "storage_fault",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from sync operations.
///
/// `Clone` so that test doubles can replay scripted failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("'{identity}' is not authorized for '{repo}'")]
    NotAuthorized { identity: String, repo: String },

    #[error("repository '{0}' already exists")]
    AlreadyExists(String),

    #[error("repository '{0}' not found")]
    RepoNotFound(String),

    #[error("commit '{id}' not found in '{repo}'")]
    CommitNotFound { repo: String, id: String },

    #[error("repository '{0}' has no commits")]
    NoCommits(String),

    #[error("no changes to commit")]
    NoChanges,

    #[error("file '{path}' is {size} bytes, over the {limit} byte limit")]
    FileTooLarge { path: String, size: u64, limit: u64 },

    #[error("corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage fault: {0}")]
    StorageFault(String),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::AuthFailed(_) => ErrorKind::AuthFailed,
            SyncError::NotAuthorized { .. } => ErrorKind::NotAuthorized,
            SyncError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            SyncError::RepoNotFound(_) => ErrorKind::RepoNotFound,
            SyncError::CommitNotFound { .. } => ErrorKind::CommitNotFound,
            SyncError::NoCommits(_) => ErrorKind::NoCommits,
            SyncError::NoChanges => ErrorKind::NoChanges,
            SyncError::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            SyncError::CorruptArchive(_) => ErrorKind::CorruptArchive,
            SyncError::InvalidInput(_) => ErrorKind::InvalidInput,
            SyncError::StorageFault(_) => ErrorKind::StorageFault,
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(repo) => SyncError::AlreadyExists(repo.to_string()),
            StoreError::RepoNotFound(repo) => SyncError::RepoNotFound(repo.to_string()),
            StoreError::CommitNotFound { repo, id } => SyncError::CommitNotFound {
                repo: repo.to_string(),
                id,
            },
            other => SyncError::StorageFault(other.to_string()),
        }
    }
}

impl From<ArchiveError> for SyncError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::Corrupt(msg) => SyncError::CorruptArchive(msg),
            ArchiveError::EntryTooLarge { path, size, limit } => {
                SyncError::FileTooLarge { path, size, limit }
            }
            other => SyncError::StorageFault(other.to_string()),
        }
    }
}

impl From<AuthError> for SyncError {
    fn from(err: AuthError) -> Self {
        if err.is_rejection() {
            SyncError::AuthFailed(err.to_string())
        } else {
            SyncError::StorageFault(err.to_string())
        }
    }
}

impl From<TypeError> for SyncError {
    fn from(err: TypeError) -> Self {
        SyncError::InvalidInput(err.to_string())
    }
}
