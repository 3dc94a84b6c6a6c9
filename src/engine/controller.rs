//! engine::controller
//!
//! The server-side Sync Controller.
//!
//! # Operation Shape
//!
//! Every operation runs the same prologue before touching storage:
//!
//! ```text
//! verify credentials -> check ownership -> validate input -> store
//! ```
//!
//! so an authentication or authorization failure never leaves partial
//! state behind.
//!
//! # Commit Validation
//!
//! The server never trusts a client's view of what changed. On commit it
//! probes every file's size against the ceiling (before reading content),
//! hashes all content itself and diffs against its own latest manifest
//! while holding the repository writer lock. An empty diff is
//! [`SyncError::NoChanges`] and nothing is written.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::errors::SyncError;
use crate::auth::{AccessPolicy, Authenticator, Credentials};
use crate::core::archive;
use crate::core::config::Limits;
use crate::core::diff::{self, FileManifest};
use crate::core::snapshot::{FileEntry, RepoHandle, SnapshotStore};
use crate::core::types::{CommitId, CommitMessage, Identity, RepoName, RepoRef};

/// A serialized commit, ready to transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub commit: CommitId,
    /// Zip archive of the commit's files plus descriptor
    pub archive: Vec<u8>,
}

/// One entry of a repository's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    pub id: CommitId,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub files: usize,
}

/// Server-side coordinator for create / commit / clone / pull / list.
///
/// Shared across concurrent requests; all mutable state lives in the
/// [`SnapshotStore`], which serializes writers per repository.
pub struct SyncController {
    store: SnapshotStore,
    auth: Arc<dyn Authenticator>,
    policy: Arc<dyn AccessPolicy>,
    limits: Limits,
}

impl SyncController {
    pub fn new(
        store: SnapshotStore,
        auth: Arc<dyn Authenticator>,
        policy: Arc<dyn AccessPolicy>,
        limits: Limits,
    ) -> Self {
        Self {
            store,
            auth,
            policy,
            limits,
        }
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Verify a credential claim.
    pub fn authenticate(&self, credentials: &Credentials) -> Result<Identity, SyncError> {
        let identity = self.auth.verify(credentials).map_err(|e| {
            debug!(scheme = credentials.scheme(), error = %e, "authentication rejected");
            SyncError::from(e)
        })?;
        Ok(identity)
    }

    fn authorize(&self, credentials: &Credentials, repo: &RepoRef) -> Result<Identity, SyncError> {
        let identity = self.authenticate(credentials)?;
        if !self.policy.owns(&identity, repo) {
            debug!(identity = %identity, repo = %repo, "not authorized");
            return Err(SyncError::NotAuthorized {
                identity: identity.to_string(),
                repo: repo.to_string(),
            });
        }
        Ok(identity)
    }

    fn require_repo(&self, repo: &RepoRef) -> Result<(), SyncError> {
        if self.store.exists(repo) {
            Ok(())
        } else {
            Err(SyncError::RepoNotFound(repo.to_string()))
        }
    }

    /// Create a repository owned by the authenticated identity.
    ///
    /// # Errors
    ///
    /// - [`SyncError::AuthFailed`] if the claim does not verify
    /// - [`SyncError::AlreadyExists`] if the owner already has this name
    pub fn create_repository(
        &self,
        credentials: &Credentials,
        name: &RepoName,
    ) -> Result<RepoHandle, SyncError> {
        let owner = self.authenticate(credentials)?;
        let repo = RepoRef::new(owner, name.clone());
        Ok(self.store.create_repository(&repo)?)
    }

    /// Commit a complete file set.
    ///
    /// # Errors
    ///
    /// - [`SyncError::AuthFailed`] / [`SyncError::NotAuthorized`]
    /// - [`SyncError::RepoNotFound`] if the repository does not exist
    /// - [`SyncError::InvalidInput`] for reserved or duplicate paths
    /// - [`SyncError::FileTooLarge`] naming the first oversized file
    /// - [`SyncError::NoChanges`] if the set matches the latest commit
    pub fn commit(
        &self,
        credentials: &Credentials,
        repo: &RepoRef,
        message: &str,
        files: &[FileEntry],
    ) -> Result<CommitId, SyncError> {
        self.authorize(credentials, repo)?;
        self.require_repo(repo)?;

        let incoming = self.validate_files(files)?;

        let writer = self.store.writer(repo)?;
        let previous = writer
            .latest_commit()?
            .map(|c| c.metadata.files)
            .unwrap_or_default();

        let changes = diff::detect(&previous, &incoming);
        if !changes.is_different() {
            debug!(repo = %repo, "commit rejected: no changes");
            return Err(SyncError::NoChanges);
        }

        let message = CommitMessage::new(message, self.limits.max_message_len);
        let commit = writer.append_commit(&message, files)?;
        info!(
            repo = %repo,
            commit = %commit.id(),
            added = changes.added.len(),
            changed = changes.changed.len(),
            removed = changes.removed.len(),
            "commit accepted"
        );
        Ok(commit.id().clone())
    }

    /// Probe sizes, reject reserved/duplicate paths and hash everything.
    fn validate_files(&self, files: &[FileEntry]) -> Result<FileManifest, SyncError> {
        let mut seen = BTreeSet::new();
        for entry in files {
            if entry.path.is_reserved() {
                return Err(SyncError::InvalidInput(format!(
                    "'{}' is a reserved name",
                    entry.path
                )));
            }
            if !seen.insert(&entry.path) {
                return Err(SyncError::InvalidInput(format!(
                    "duplicate path '{}'",
                    entry.path
                )));
            }
            let size = entry
                .content
                .size()
                .map_err(|e| SyncError::StorageFault(format!("{}: {}", entry.path, e)))?;
            if size > self.limits.max_file_size {
                return Err(SyncError::FileTooLarge {
                    path: entry.path.to_string(),
                    size,
                    limit: self.limits.max_file_size,
                });
            }
        }

        let mut manifest = FileManifest::new();
        for entry in files {
            let hash = entry
                .content
                .hash()
                .map_err(|e| SyncError::StorageFault(format!("{}: {}", entry.path, e)))?;
            manifest.insert(entry.path.clone(), hash);
        }
        Ok(manifest)
    }

    /// Latest commit as an archive, for binding a new working directory.
    ///
    /// # Errors
    ///
    /// - [`SyncError::NoCommits`] if the repository has no history
    pub fn clone_repository(
        &self,
        credentials: &Credentials,
        repo: &RepoRef,
    ) -> Result<Snapshot, SyncError> {
        self.authorize(credentials, repo)?;
        self.require_repo(repo)?;

        let commit = self
            .store
            .latest_commit(repo)?
            .ok_or_else(|| SyncError::NoCommits(repo.to_string()))?;
        let archive = archive::pack(&commit, repo)?;
        info!(repo = %repo, commit = %commit.id(), "clone served");
        Ok(Snapshot {
            commit: commit.id().clone(),
            archive,
        })
    }

    /// A specific commit (or the latest) as an archive.
    ///
    /// # Errors
    ///
    /// - [`SyncError::CommitNotFound`] if `id` names no commit
    pub fn pull(
        &self,
        credentials: &Credentials,
        repo: &RepoRef,
        id: Option<&str>,
    ) -> Result<Snapshot, SyncError> {
        self.authorize(credentials, repo)?;
        self.require_repo(repo)?;

        let commit = match id {
            Some(id) => self.store.commit_by_id(repo, id)?,
            None => self
                .store
                .latest_commit(repo)?
                .ok_or_else(|| SyncError::NoCommits(repo.to_string()))?,
        };
        let archive = archive::pack(&commit, repo)?;
        info!(repo = %repo, commit = %commit.id(), "pull served");
        Ok(Snapshot {
            commit: commit.id().clone(),
            archive,
        })
    }

    /// Names of all repositories owned by the authenticated identity.
    pub fn list_repositories(&self, credentials: &Credentials) -> Result<Vec<RepoName>, SyncError> {
        let owner = self.authenticate(credentials)?;
        Ok(self.store.list_repositories(&owner)?)
    }

    /// Commit history, oldest first.
    pub fn log(
        &self,
        credentials: &Credentials,
        repo: &RepoRef,
    ) -> Result<Vec<CommitSummary>, SyncError> {
        self.authorize(credentials, repo)?;
        self.require_repo(repo)?;

        self.store
            .list_commits(repo)?
            .iter()
            .map(|id| -> Result<CommitSummary, SyncError> {
                let commit = self.store.commit_by_id(repo, &id.to_string())?;
                Ok(CommitSummary {
                    id: commit.id().clone(),
                    message: commit.message().to_string(),
                    timestamp: commit.timestamp(),
                    files: commit.manifest().len(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        CredentialStore, MemoryCredentialStore, OwnerPolicy, PasswordAuthenticator, PasswordRecord,
    };
    use crate::core::archive::decode;
    use crate::core::types::RelPath;
    use crate::engine::ErrorKind;
    use tempfile::TempDir;

    const LIMIT: u64 = 16;

    struct Fixture {
        _temp: TempDir,
        controller: SyncController,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::open(temp.path().to_path_buf()).unwrap();
        let creds = Arc::new(MemoryCredentialStore::new());
        for user in ["alice", "bob"] {
            creds
                .set_password(&Identity::new(user).unwrap(), PasswordRecord::new("pw"))
                .unwrap();
        }
        let controller = SyncController::new(
            store,
            Arc::new(PasswordAuthenticator::new(creds)),
            Arc::new(OwnerPolicy),
            Limits {
                max_file_size: LIMIT,
                max_message_len: 200,
            },
        );
        Fixture {
            _temp: temp,
            controller,
        }
    }

    fn login(user: &str) -> Credentials {
        Credentials::password(Identity::new(user).unwrap(), "pw")
    }

    fn repo() -> RepoRef {
        RepoRef::parse("alice/proj").unwrap()
    }

    fn name() -> RepoName {
        RepoName::new("proj").unwrap()
    }

    fn file(path: &str, content: &str) -> FileEntry {
        FileEntry::bytes(RelPath::new(path).unwrap(), content)
    }

    #[test]
    fn create_then_duplicate() {
        let f = fixture();
        let handle = f.controller.create_repository(&login("alice"), &name()).unwrap();
        assert_eq!(handle.repo, repo());

        let err = f
            .controller
            .create_repository(&login("alice"), &name())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn create_with_bad_credentials_leaves_nothing() {
        let f = fixture();
        let bad = Credentials::password(Identity::new("alice").unwrap(), "wrong");
        let err = f.controller.create_repository(&bad, &name()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthFailed);
        assert!(!f.controller.store().exists(&repo()));
    }

    #[test]
    fn first_commit_and_pull() {
        let f = fixture();
        f.controller.create_repository(&login("alice"), &name()).unwrap();

        let id = f
            .controller
            .commit(&login("alice"), &repo(), "first", &[file("a.txt", "x")])
            .unwrap();
        assert_eq!(id.to_string(), "002_first");

        let snapshot = f.controller.pull(&login("alice"), &repo(), None).unwrap();
        assert_eq!(snapshot.commit, id);
        let archive = decode(&snapshot.archive, LIMIT).unwrap();
        let paths: Vec<_> = archive.paths().map(RelPath::as_str).collect();
        assert_eq!(paths, vec!["a.txt"]);
        assert_eq!(archive.get(&RelPath::new("a.txt").unwrap()), Some(&b"x"[..]));
    }

    #[test]
    fn identical_commit_is_no_changes() {
        let f = fixture();
        f.controller.create_repository(&login("alice"), &name()).unwrap();
        let files = [file("a.txt", "x")];
        f.controller
            .commit(&login("alice"), &repo(), "first", &files)
            .unwrap();

        let err = f
            .controller
            .commit(&login("alice"), &repo(), "again", &files)
            .unwrap_err();
        assert_eq!(err, SyncError::NoChanges);
        assert_eq!(f.controller.store().list_commits(&repo()).unwrap().len(), 2);
    }

    #[test]
    fn empty_set_against_seed_is_no_changes() {
        let f = fixture();
        f.controller.create_repository(&login("alice"), &name()).unwrap();
        let err = f
            .controller
            .commit(&login("alice"), &repo(), "nothing", &[])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoChanges);
    }

    #[test]
    fn removal_is_a_change() {
        let f = fixture();
        f.controller.create_repository(&login("alice"), &name()).unwrap();
        f.controller
            .commit(&login("alice"), &repo(), "two", &[file("a", "1"), file("b", "2")])
            .unwrap();
        let id = f
            .controller
            .commit(&login("alice"), &repo(), "drop b", &[file("a", "1")])
            .unwrap();
        assert_eq!(id.to_string(), "003_drop_b");
    }

    #[test]
    fn size_ceiling_is_inclusive() {
        let f = fixture();
        f.controller.create_repository(&login("alice"), &name()).unwrap();

        let exact = "x".repeat(LIMIT as usize);
        f.controller
            .commit(&login("alice"), &repo(), "exact", &[file("ok", &exact)])
            .unwrap();

        let over = "x".repeat(LIMIT as usize + 1);
        let err = f
            .controller
            .commit(
                &login("alice"),
                &repo(),
                "over",
                &[file("small", "y"), file("big.bin", &over)],
            )
            .unwrap_err();
        assert!(matches!(&err, SyncError::FileTooLarge { path, .. } if path == "big.bin"));
        assert_eq!(f.controller.store().list_commits(&repo()).unwrap().len(), 2);
    }

    #[test]
    fn reserved_and_duplicate_paths_rejected() {
        let f = fixture();
        f.controller.create_repository(&login("alice"), &name()).unwrap();

        let err = f
            .controller
            .commit(&login("alice"), &repo(), "m", &[file(".pit-meta.json", "{}")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = f
            .controller
            .commit(&login("alice"), &repo(), "m", &[file("a", "1"), file("a", "2")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn other_identity_not_authorized() {
        let f = fixture();
        f.controller.create_repository(&login("alice"), &name()).unwrap();

        let err = f
            .controller
            .commit(&login("bob"), &repo(), "m", &[file("a", "1")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAuthorized);

        let err = f.controller.pull(&login("bob"), &repo(), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAuthorized);
    }

    #[test]
    fn missing_repo_and_commit() {
        let f = fixture();
        let err = f
            .controller
            .clone_repository(&login("alice"), &repo())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RepoNotFound);

        f.controller.create_repository(&login("alice"), &name()).unwrap();
        let err = f
            .controller
            .pull(&login("alice"), &repo(), Some("042_nope"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CommitNotFound);
    }

    #[test]
    fn pull_specific_commit() {
        let f = fixture();
        f.controller.create_repository(&login("alice"), &name()).unwrap();
        f.controller
            .commit(&login("alice"), &repo(), "v1", &[file("a", "1")])
            .unwrap();
        f.controller
            .commit(&login("alice"), &repo(), "v2", &[file("a", "2")])
            .unwrap();

        let snapshot = f
            .controller
            .pull(&login("alice"), &repo(), Some("002_v1"))
            .unwrap();
        let archive = decode(&snapshot.archive, LIMIT).unwrap();
        assert_eq!(archive.get(&RelPath::new("a").unwrap()), Some(&b"1"[..]));
    }

    #[test]
    fn clone_of_fresh_repo_is_seed() {
        let f = fixture();
        f.controller.create_repository(&login("alice"), &name()).unwrap();
        let snapshot = f
            .controller
            .clone_repository(&login("alice"), &repo())
            .unwrap();
        assert_eq!(snapshot.commit.to_string(), "001_initial");
    }

    #[test]
    fn list_and_log() {
        let f = fixture();
        f.controller.create_repository(&login("alice"), &name()).unwrap();
        f.controller
            .create_repository(&login("alice"), &RepoName::new("other").unwrap())
            .unwrap();
        f.controller.create_repository(&login("bob"), &name()).unwrap();

        let names: Vec<String> = f
            .controller
            .list_repositories(&login("alice"))
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(names, vec!["other", "proj"]);

        f.controller
            .commit(&login("alice"), &repo(), "first", &[file("a", "1")])
            .unwrap();
        let log = f.controller.log(&login("alice"), &repo()).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].id.to_string(), "001_initial");
        assert_eq!(log[1].message, "first");
        assert_eq!(log[1].files, 1);
    }

    #[test]
    fn message_is_capped() {
        let f = fixture();
        f.controller.create_repository(&login("alice"), &name()).unwrap();
        let long = "m".repeat(500);
        f.controller
            .commit(&login("alice"), &repo(), &long, &[file("a", "1")])
            .unwrap();
        let log = f.controller.log(&login("alice"), &repo()).unwrap();
        assert_eq!(log[1].message.chars().count(), 200);
    }
}
