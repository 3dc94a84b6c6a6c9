//! remote::traits
//!
//! The `Remote` trait: the client's view of a pit server.
//!
//! # Design
//!
//! The trait is async because every operation crosses a transport (or at
//! least a blocking filesystem boundary). All methods return
//! [`SyncError`], whose [`ErrorKind`](crate::engine::ErrorKind) is what
//! the workspace layer branches on (e.g. `NoChanges` during push replay).
//!
//! # Example
//!
//! ```ignore
//! use pit::remote::Remote;
//!
//! async fn show(remote: &dyn Remote, creds: &Credentials) -> Result<(), SyncError> {
//!     for name in remote.list_repositories(creds).await? {
//!         println!("{}", name);
//!     }
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;

use crate::auth::Credentials;
use crate::core::snapshot::FileEntry;
use crate::core::types::{CommitId, RepoName, RepoRef};
use crate::engine::{CommitSummary, Snapshot, SyncError};

/// Client-side interface to a pit server.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
#[async_trait]
pub trait Remote: Send + Sync {
    /// Transport name for diagnostics (e.g. "local", "mock").
    fn name(&self) -> &'static str;

    /// Create a repository owned by the authenticated identity.
    async fn create_repository(
        &self,
        credentials: &Credentials,
        name: &RepoName,
    ) -> Result<RepoRef, SyncError>;

    /// Commit a complete file set; returns the assigned id.
    ///
    /// # Errors
    ///
    /// - `NoChanges` if the set equals the server's latest commit
    /// - `FileTooLarge` naming the offending file
    async fn commit(
        &self,
        credentials: &Credentials,
        repo: &RepoRef,
        message: &str,
        files: Vec<FileEntry>,
    ) -> Result<CommitId, SyncError>;

    /// Latest commit of a repository as an archive.
    async fn clone_repository(
        &self,
        credentials: &Credentials,
        repo: &RepoRef,
    ) -> Result<Snapshot, SyncError>;

    /// A specific commit (latest if `id` is `None`) as an archive.
    async fn pull(
        &self,
        credentials: &Credentials,
        repo: &RepoRef,
        id: Option<&str>,
    ) -> Result<Snapshot, SyncError>;

    /// Names of all repositories owned by the authenticated identity.
    async fn list_repositories(&self, credentials: &Credentials)
        -> Result<Vec<RepoName>, SyncError>;

    /// Commit history, oldest first.
    async fn log(
        &self,
        credentials: &Credentials,
        repo: &RepoRef,
    ) -> Result<Vec<CommitSummary>, SyncError>;
}
