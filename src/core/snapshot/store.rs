//! core::snapshot::store
//!
//! Durable, append-only commit history for every repository.
//!
//! # Architecture
//!
//! The store owns the server storage tree described in
//! [`crate::core::paths`]. Every repository is a directory of commit
//! directories named by [`CommitId`]; each commit carries its full file set
//! plus a [`CommitMetadata`] record.
//!
//! # Write Path
//!
//! The only mutators are [`SnapshotStore::create_repository`] and
//! [`RepoWriter::append_commit`]. A `RepoWriter` holds the repository's
//! [`RepoLock`] for its whole lifetime, so "read latest, compute next id,
//! write new commit" is linearized per repository. New commits are built
//! in a hidden temp directory and renamed into place, so readers see either
//! no commit or a complete one.
//!
//! # Invariants
//!
//! - Commit indices are dense, start at 1 (the seed) and only grow
//! - A written commit directory is never modified again
//! - Repositories are never removed
//!
//! # Example
//!
//! ```no_run
//! use pit::core::snapshot::{FileEntry, SnapshotStore};
//! use pit::core::types::{CommitMessage, RelPath, RepoRef};
//! use std::path::PathBuf;
//!
//! let store = SnapshotStore::open(PathBuf::from("/srv/pit")).unwrap();
//! let repo = RepoRef::parse("alice/proj").unwrap();
//! store.create_repository(&repo).unwrap();
//!
//! let writer = store.writer(&repo).unwrap();
//! let files = vec![FileEntry::bytes(RelPath::new("a.txt").unwrap(), "x")];
//! let commit = writer
//!     .append_commit(&CommitMessage::new("first", 200), &files)
//!     .unwrap();
//! assert_eq!(commit.id().to_string(), "002_first");
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::entry::FileEntry;
use super::schema::{Commit, CommitMetadata, MetadataError, SEED_MESSAGE};
use crate::core::diff::FileManifest;
use crate::core::ops::lock::{LockError, RepoLock};
use crate::core::paths::{StoragePaths, TEMP_PREFIX};
use crate::core::types::{CommitId, CommitMessage, Identity, RepoName, RepoRef};

/// Errors from snapshot storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("repository '{0}' already exists")]
    AlreadyExists(RepoRef),

    #[error("repository '{0}' not found")]
    RepoNotFound(RepoRef),

    #[error("commit '{id}' not found in '{repo}'")]
    CommitNotFound { repo: RepoRef, id: String },

    #[error("storage i/o error at '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Lock(#[from] LockError),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Handle to a repository returned by creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoHandle {
    pub repo: RepoRef,
    /// Root directory of the repository in storage.
    pub path: PathBuf,
    /// The seeded initial commit.
    pub seed: CommitId,
}

/// The server-side snapshot store.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    paths: StoragePaths,
}

impl SnapshotStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&root).map_err(io_err(&root))?;
        Ok(Self {
            paths: StoragePaths::new(root),
        })
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    pub fn exists(&self, repo: &RepoRef) -> bool {
        self.paths.commits_dir(repo).is_dir()
    }

    /// Create a repository seeded with the empty initial commit.
    ///
    /// The repository is assembled in a temp directory and renamed into
    /// place, so a concurrent create of the same name yields exactly one
    /// winner and readers never see a repository without its seed.
    ///
    /// # Errors
    ///
    /// - [`StoreError::AlreadyExists`] if the repository exists
    pub fn create_repository(&self, repo: &RepoRef) -> Result<RepoHandle, StoreError> {
        let repo_dir = self.paths.repo_dir(repo);
        if repo_dir.exists() {
            return Err(StoreError::AlreadyExists(repo.clone()));
        }

        let owner_dir = self.paths.owner_dir(&repo.owner);
        fs::create_dir_all(&owner_dir).map_err(io_err(&owner_dir))?;

        let staging = owner_dir.join(format!("{}{}", TEMP_PREFIX, uuid::Uuid::new_v4()));
        let result = self.build_seeded_repo(&staging).and_then(|seed| {
            match fs::rename(&staging, &repo_dir) {
                Ok(()) => Ok(seed),
                Err(_) if repo_dir.exists() => Err(StoreError::AlreadyExists(repo.clone())),
                Err(e) => Err(io_err(&repo_dir)(e)),
            }
        });

        match result {
            Ok(seed) => {
                info!(repo = %repo, "repository created");
                Ok(RepoHandle {
                    repo: repo.clone(),
                    path: repo_dir,
                    seed,
                })
            }
            Err(e) => {
                let _ = fs::remove_dir_all(&staging);
                Err(e)
            }
        }
    }

    fn build_seeded_repo(&self, staging: &Path) -> Result<CommitId, StoreError> {
        let message = CommitMessage::new(SEED_MESSAGE, SEED_MESSAGE.len());
        let seed = CommitId::new(1, &message);
        let seed_dir = staging.join("commits").join(seed.to_string());
        fs::create_dir_all(&seed_dir).map_err(io_err(&seed_dir))?;
        CommitMetadata::new(seed.clone(), message, FileManifest::new()).write(&seed_dir)?;
        Ok(seed)
    }

    /// Names of all repositories owned by `owner`, sorted.
    pub fn list_repositories(&self, owner: &Identity) -> Result<Vec<RepoName>, StoreError> {
        let owner_dir = self.paths.owner_dir(owner);
        if !owner_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&owner_dir).map_err(io_err(&owner_dir))? {
            let entry = entry.map_err(io_err(&owner_dir))?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Ok(name) = RepoName::new(name) else {
                continue;
            };
            if entry.path().join("commits").is_dir() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Ids of all commits in a repository, oldest first.
    pub fn list_commits(&self, repo: &RepoRef) -> Result<Vec<CommitId>, StoreError> {
        let commits_dir = self.paths.commits_dir(repo);
        if !commits_dir.is_dir() {
            return Err(StoreError::RepoNotFound(repo.clone()));
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&commits_dir).map_err(io_err(&commits_dir))? {
            let entry = entry.map_err(io_err(&commits_dir))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with('.') || !entry.path().is_dir() {
                continue;
            }
            match CommitId::parse(name) {
                Ok(id) => ids.push(id),
                Err(e) => warn!(repo = %repo, entry = name, error = %e, "skipping foreign entry"),
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// The most recent commit, or `None` for an empty history.
    pub fn latest_commit(&self, repo: &RepoRef) -> Result<Option<Commit>, StoreError> {
        match self.list_commits(repo)?.pop() {
            Some(id) => self.load(repo, &id).map(Some),
            None => Ok(None),
        }
    }

    /// Look up a commit by its full id string.
    ///
    /// # Errors
    ///
    /// - [`StoreError::RepoNotFound`] if the repository does not exist
    /// - [`StoreError::CommitNotFound`] if no commit has this id
    pub fn commit_by_id(&self, repo: &RepoRef, id: &str) -> Result<Commit, StoreError> {
        if !self.exists(repo) {
            return Err(StoreError::RepoNotFound(repo.clone()));
        }
        let not_found = || StoreError::CommitNotFound {
            repo: repo.clone(),
            id: id.to_string(),
        };
        let parsed = CommitId::parse(id).map_err(|_| not_found())?;
        if !self.paths.commit_dir(repo, &parsed).is_dir() {
            return Err(not_found());
        }
        self.load(repo, &parsed)
    }

    fn load(&self, repo: &RepoRef, id: &CommitId) -> Result<Commit, StoreError> {
        let dir = self.paths.commit_dir(repo, id);
        let metadata = CommitMetadata::read(&dir)?;
        Ok(Commit { metadata, dir })
    }

    /// Open an exclusive writer on a repository.
    ///
    /// Blocks while another writer holds the repository.
    pub fn writer(&self, repo: &RepoRef) -> Result<RepoWriter<'_>, StoreError> {
        if !self.exists(repo) {
            return Err(StoreError::RepoNotFound(repo.clone()));
        }
        let lock = RepoLock::acquire(&self.paths.repo_lock_path(repo))?;
        debug!(repo = %repo, "writer lock acquired");
        Ok(RepoWriter {
            store: self,
            repo: repo.clone(),
            _lock: lock,
        })
    }

    /// Append a commit, taking the writer lock for the duration.
    pub fn append_commit(
        &self,
        repo: &RepoRef,
        message: &CommitMessage,
        files: &[FileEntry],
    ) -> Result<Commit, StoreError> {
        self.writer(repo)?.append_commit(message, files)
    }
}

/// Exclusive write access to one repository.
///
/// Dropping the writer releases the repository lock.
#[derive(Debug)]
pub struct RepoWriter<'a> {
    store: &'a SnapshotStore,
    repo: RepoRef,
    _lock: RepoLock,
}

impl RepoWriter<'_> {
    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    /// Latest commit as seen under the lock.
    pub fn latest_commit(&self) -> Result<Option<Commit>, StoreError> {
        self.store.latest_commit(&self.repo)
    }

    /// Write a new commit containing exactly `files`.
    ///
    /// The id is the latest index plus one. The caller is responsible for
    /// having established that the files differ from the latest commit.
    pub fn append_commit(
        &self,
        message: &CommitMessage,
        files: &[FileEntry],
    ) -> Result<Commit, StoreError> {
        let paths = &self.store.paths;
        let next_index = self
            .store
            .list_commits(&self.repo)?
            .last()
            .map_or(1, |id| id.index() + 1);
        let id = CommitId::new(next_index, message);

        let temp_dir = paths.temp_commit_dir(&self.repo);
        let final_dir = paths.commit_dir(&self.repo, &id);

        let result = write_commit_dir(&temp_dir, &id, message, files).and_then(|metadata| {
            fs::rename(&temp_dir, &final_dir).map_err(io_err(&final_dir))?;
            Ok(metadata)
        });

        match result {
            Ok(metadata) => {
                info!(
                    repo = %self.repo,
                    commit = %id,
                    files = files.len(),
                    "commit appended"
                );
                Ok(Commit {
                    metadata,
                    dir: final_dir,
                })
            }
            Err(e) => {
                let _ = fs::remove_dir_all(&temp_dir);
                Err(e)
            }
        }
    }
}

/// Materialize a commit directory (files + metadata record) at `dir`.
///
/// Shared by the server store and the client staging area, which use the
/// same on-disk scheme.
pub fn write_commit_dir(
    dir: &Path,
    id: &CommitId,
    message: &CommitMessage,
    files: &[FileEntry],
) -> Result<CommitMetadata, StoreError> {
    fs::create_dir_all(dir).map_err(io_err(dir))?;

    let mut manifest = FileManifest::new();
    for entry in files {
        let dest = entry.path.to_fs(dir);
        entry.content.write_to(&dest).map_err(io_err(&dest))?;
        let hash = entry.content.hash().map_err(io_err(&dest))?;
        manifest.insert(entry.path.clone(), hash);
    }

    let metadata = CommitMetadata::new(id.clone(), message.clone(), manifest);
    metadata.write(dir)?;
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::paths::METADATA_FILE;
    use crate::core::types::RelPath;
    use tempfile::TempDir;

    fn setup() -> (TempDir, SnapshotStore, RepoRef) {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::open(temp.path().join("storage")).unwrap();
        let repo = RepoRef::parse("alice/proj").unwrap();
        (temp, store, repo)
    }

    fn msg(s: &str) -> CommitMessage {
        CommitMessage::new(s, 200)
    }

    fn file(path: &str, content: &str) -> FileEntry {
        FileEntry::bytes(RelPath::new(path).unwrap(), content)
    }

    #[test]
    fn create_seeds_initial_commit() {
        let (_t, store, repo) = setup();
        let handle = store.create_repository(&repo).unwrap();

        assert_eq!(handle.seed.to_string(), "001_initial");
        let latest = store.latest_commit(&repo).unwrap().unwrap();
        assert_eq!(latest.id().index(), 1);
        assert!(latest.manifest().is_empty());
    }

    #[test]
    fn create_twice_fails() {
        let (_t, store, repo) = setup();
        store.create_repository(&repo).unwrap();
        assert!(matches!(
            store.create_repository(&repo),
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn create_leaves_no_temp_dirs() {
        let (_t, store, repo) = setup();
        store.create_repository(&repo).unwrap();
        let leftovers: Vec<_> = fs::read_dir(store.paths().owner_dir(&repo.owner))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn append_assigns_dense_ids() {
        let (_t, store, repo) = setup();
        store.create_repository(&repo).unwrap();

        let c2 = store
            .append_commit(&repo, &msg("first"), &[file("a.txt", "x")])
            .unwrap();
        let c3 = store
            .append_commit(&repo, &msg("second change"), &[file("a.txt", "y")])
            .unwrap();

        assert_eq!(c2.id().to_string(), "002_first");
        assert_eq!(c3.id().to_string(), "003_second_change");
        let ids: Vec<u32> = store
            .list_commits(&repo)
            .unwrap()
            .iter()
            .map(CommitId::index)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn append_preserves_subdirectories_and_metadata() {
        let (_t, store, repo) = setup();
        store.create_repository(&repo).unwrap();

        let commit = store
            .append_commit(
                &repo,
                &msg("nested"),
                &[file("src/lib.rs", "fn main() {}"), file("README", "hi")],
            )
            .unwrap();

        assert!(commit.dir.join("src/lib.rs").is_file());
        assert!(commit.dir.join(METADATA_FILE).is_file());
        assert_eq!(commit.manifest().len(), 2);

        let reloaded = store.commit_by_id(&repo, "002_nested").unwrap();
        assert_eq!(reloaded.metadata, commit.metadata);
        assert_eq!(
            reloaded
                .read_file(&RelPath::new("src/lib.rs").unwrap())
                .unwrap(),
            b"fn main() {}"
        );
    }

    #[test]
    fn commit_by_id_errors() {
        let (_t, store, repo) = setup();
        assert!(matches!(
            store.commit_by_id(&repo, "001_initial"),
            Err(StoreError::RepoNotFound(_))
        ));

        store.create_repository(&repo).unwrap();
        for id in ["009_missing", "garbage", "../../etc"] {
            assert!(matches!(
                store.commit_by_id(&repo, id),
                Err(StoreError::CommitNotFound { .. })
            ));
        }
    }

    #[test]
    fn append_to_missing_repo_fails() {
        let (_t, store, repo) = setup();
        assert!(matches!(
            store.append_commit(&repo, &msg("x"), &[]),
            Err(StoreError::RepoNotFound(_))
        ));
    }

    #[test]
    fn list_repositories_by_owner() {
        let (_t, store, _) = setup();
        for r in ["alice/zeta", "alice/alpha", "bob/other"] {
            store.create_repository(&RepoRef::parse(r).unwrap()).unwrap();
        }

        let alice = Identity::new("alice").unwrap();
        let names: Vec<String> = store
            .list_repositories(&alice)
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);

        let nobody = Identity::new("nobody").unwrap();
        assert!(store.list_repositories(&nobody).unwrap().is_empty());
    }

    #[test]
    fn temp_dirs_are_ignored_by_listing() {
        let (_t, store, repo) = setup();
        store.create_repository(&repo).unwrap();
        fs::create_dir_all(store.paths().temp_commit_dir(&repo)).unwrap();

        assert_eq!(store.list_commits(&repo).unwrap().len(), 1);
    }

    #[test]
    fn failed_append_cleans_up() {
        let (temp, store, repo) = setup();
        store.create_repository(&repo).unwrap();

        let missing = FileEntry::spooled(
            RelPath::new("gone.txt").unwrap(),
            temp.path().join("does-not-exist"),
        );
        assert!(matches!(
            store.append_commit(&repo, &msg("broken"), &[missing]),
            Err(StoreError::Io { .. })
        ));

        let entries: Vec<_> = fs::read_dir(store.paths().commits_dir(&repo))
            .unwrap()
            .filter_map(Result::ok)
            .collect();
        assert_eq!(entries.len(), 1, "only the seed commit should remain");
    }
}
