//! remote::local
//!
//! In-process remote backed by a [`SyncController`].
//!
//! Every call runs on tokio's blocking pool: the controller does
//! filesystem I/O and may block on a repository writer lock, neither of
//! which belongs on an async worker thread.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::traits::Remote;
use crate::auth::Credentials;
use crate::core::snapshot::FileEntry;
use crate::core::types::{CommitId, RepoName, RepoRef};
use crate::engine::{CommitSummary, Snapshot, SyncController, SyncError};

/// A remote that talks to a controller in the same process.
#[derive(Clone)]
pub struct LocalRemote {
    controller: Arc<SyncController>,
}

impl LocalRemote {
    pub fn new(controller: Arc<SyncController>) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &SyncController {
        &self.controller
    }

    async fn run<T, F>(&self, op: &'static str, f: F) -> Result<T, SyncError>
    where
        T: Send + 'static,
        F: FnOnce(&SyncController) -> Result<T, SyncError> + Send + 'static,
    {
        let controller = Arc::clone(&self.controller);
        debug!(op, "local remote call");
        tokio::task::spawn_blocking(move || f(&controller))
            .await
            .map_err(|e| SyncError::StorageFault(format!("{op} task failed: {e}")))?
    }
}

#[async_trait]
impl Remote for LocalRemote {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn create_repository(
        &self,
        credentials: &Credentials,
        name: &RepoName,
    ) -> Result<RepoRef, SyncError> {
        let credentials = credentials.clone();
        let name = name.clone();
        self.run("create_repository", move |c| {
            c.create_repository(&credentials, &name).map(|handle| handle.repo)
        })
        .await
    }

    async fn commit(
        &self,
        credentials: &Credentials,
        repo: &RepoRef,
        message: &str,
        files: Vec<FileEntry>,
    ) -> Result<CommitId, SyncError> {
        let credentials = credentials.clone();
        let repo = repo.clone();
        let message = message.to_string();
        self.run("commit", move |c| {
            c.commit(&credentials, &repo, &message, &files)
        })
        .await
    }

    async fn clone_repository(
        &self,
        credentials: &Credentials,
        repo: &RepoRef,
    ) -> Result<Snapshot, SyncError> {
        let credentials = credentials.clone();
        let repo = repo.clone();
        self.run("clone", move |c| c.clone_repository(&credentials, &repo))
            .await
    }

    async fn pull(
        &self,
        credentials: &Credentials,
        repo: &RepoRef,
        id: Option<&str>,
    ) -> Result<Snapshot, SyncError> {
        let credentials = credentials.clone();
        let repo = repo.clone();
        let id = id.map(str::to_string);
        self.run("pull", move |c| c.pull(&credentials, &repo, id.as_deref()))
            .await
    }

    async fn list_repositories(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<RepoName>, SyncError> {
        let credentials = credentials.clone();
        self.run("list_repositories", move |c| c.list_repositories(&credentials))
            .await
    }

    async fn log(
        &self,
        credentials: &Credentials,
        repo: &RepoRef,
    ) -> Result<Vec<CommitSummary>, SyncError> {
        let credentials = credentials.clone();
        let repo = repo.clone();
        self.run("log", move |c| c.log(&credentials, &repo)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        CredentialStore, MemoryCredentialStore, OwnerPolicy, PasswordAuthenticator, PasswordRecord,
    };
    use crate::core::config::Limits;
    use crate::core::snapshot::SnapshotStore;
    use crate::core::types::{Identity, RelPath};
    use crate::engine::ErrorKind;
    use tempfile::TempDir;

    fn remote(temp: &TempDir) -> LocalRemote {
        let creds = Arc::new(MemoryCredentialStore::new());
        creds
            .set_password(&Identity::new("alice").unwrap(), PasswordRecord::new("pw"))
            .unwrap();
        let controller = SyncController::new(
            SnapshotStore::open(temp.path().to_path_buf()).unwrap(),
            Arc::new(PasswordAuthenticator::new(creds)),
            Arc::new(OwnerPolicy),
            Limits::default(),
        );
        LocalRemote::new(Arc::new(controller))
    }

    fn alice() -> Credentials {
        Credentials::password(Identity::new("alice").unwrap(), "pw")
    }

    #[tokio::test]
    async fn full_round_trip() {
        let temp = TempDir::new().unwrap();
        let remote = remote(&temp);

        let repo = remote
            .create_repository(&alice(), &RepoName::new("proj").unwrap())
            .await
            .unwrap();
        assert_eq!(repo.to_string(), "alice/proj");

        let files = vec![FileEntry::bytes(RelPath::new("a.txt").unwrap(), "x")];
        let id = remote.commit(&alice(), &repo, "first", files).await.unwrap();
        assert_eq!(id.to_string(), "002_first");

        let snapshot = remote.pull(&alice(), &repo, None).await.unwrap();
        assert_eq!(snapshot.commit, id);

        let log = remote.log(&alice(), &repo).await.unwrap();
        assert_eq!(log.len(), 2);
    }

    #[tokio::test]
    async fn errors_pass_through() {
        let temp = TempDir::new().unwrap();
        let remote = remote(&temp);
        let repo = RepoRef::parse("alice/missing").unwrap();

        let err = remote.clone_repository(&alice(), &repo).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RepoNotFound);
    }
}
