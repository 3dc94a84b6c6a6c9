//! core::paths
//!
//! Centralized path routing for pit storage locations.
//!
//! # Architecture
//!
//! All on-disk locations are computed here so no other module hard-codes
//! directory names. There are two scopes:
//!
//! - [`StoragePaths`]: the server-side Snapshot Store tree
//! - [`WorkspacePaths`]: a client working directory and its control dir
//!
//! # Server Layout
//!
//! ```text
//! <root>/<owner>/<repo>/
//!     lock                      per-repository writer lock
//!     commits/
//!         001_initial/
//!             .pit-meta.json    metadata record (message, timestamp, manifest)
//!         002_first/
//!             a.txt
//!             .pit-meta.json
//!         .tmp-<uuid>/          commit being written (renamed into place)
//! ```
//!
//! # Client Layout
//!
//! ```text
//! <work_dir>/
//!     .pit/
//!         tracking.toml         tracking record (owner, repo)
//!         base.json             last snapshot known to match the server
//!         lock                  workspace lock (push / pull / commit)
//!         staging/
//!             001_wip/          same scheme as server commit dirs
//! ```
//!
//! # Example
//!
//! ```
//! use pit::core::paths::StoragePaths;
//! use pit::core::types::RepoRef;
//! use std::path::PathBuf;
//!
//! let paths = StoragePaths::new(PathBuf::from("/srv/pit"));
//! let repo = RepoRef::parse("alice/proj").unwrap();
//! assert_eq!(
//!     paths.commits_dir(&repo),
//!     PathBuf::from("/srv/pit/alice/proj/commits")
//! );
//! ```

use std::path::{Path, PathBuf};

use super::types::{CommitId, Identity, RepoRef};

/// Name of the metadata record inside every commit directory.
pub const METADATA_FILE: &str = ".pit-meta.json";

/// Name of the self-configuration descriptor entry inside archives.
pub const DESCRIPTOR_ENTRY: &str = ".pit-origin.json";

/// Name of the client control directory.
pub const CONTROL_DIR: &str = ".pit";

/// Prefix of in-progress commit directories.
pub const TEMP_PREFIX: &str = ".tmp-";

/// Path routing for the server-side snapshot store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    root: PathBuf,
}

impl StoragePaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding all repositories of one owner.
    pub fn owner_dir(&self, owner: &Identity) -> PathBuf {
        self.root.join(owner.as_str())
    }

    /// Root directory of one repository.
    pub fn repo_dir(&self, repo: &RepoRef) -> PathBuf {
        self.owner_dir(&repo.owner).join(repo.name.as_str())
    }

    /// Directory holding the commit subdirectories of a repository.
    pub fn commits_dir(&self, repo: &RepoRef) -> PathBuf {
        self.repo_dir(repo).join("commits")
    }

    /// Directory of a single commit.
    pub fn commit_dir(&self, repo: &RepoRef, id: &CommitId) -> PathBuf {
        self.commits_dir(repo).join(id.to_string())
    }

    /// Per-repository writer lock file.
    pub fn repo_lock_path(&self, repo: &RepoRef) -> PathBuf {
        self.repo_dir(repo).join("lock")
    }

    /// Fresh temp directory name for a commit under construction.
    pub fn temp_commit_dir(&self, repo: &RepoRef) -> PathBuf {
        self.commits_dir(repo)
            .join(format!("{}{}", TEMP_PREFIX, uuid::Uuid::new_v4()))
    }
}

/// Path routing for a client working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePaths {
    work_dir: PathBuf,
}

impl WorkspacePaths {
    pub fn new(work_dir: PathBuf) -> Self {
        Self { work_dir }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// The hidden control directory.
    pub fn control_dir(&self) -> PathBuf {
        self.work_dir.join(CONTROL_DIR)
    }

    /// Tracking record binding this directory to (owner, repo).
    pub fn tracking_path(&self) -> PathBuf {
        self.control_dir().join("tracking.toml")
    }

    /// Manifest of the last snapshot known to match the server.
    pub fn base_path(&self) -> PathBuf {
        self.control_dir().join("base.json")
    }

    /// Workspace lock file.
    pub fn lock_path(&self) -> PathBuf {
        self.control_dir().join("lock")
    }

    /// Local staging area root.
    pub fn staging_dir(&self) -> PathBuf {
        self.control_dir().join("staging")
    }

    /// Directory of one staged commit.
    pub fn staged_commit_dir(&self, id: &CommitId) -> PathBuf {
        self.staging_dir().join(id.to_string())
    }

    /// Check whether the directory is a tracked working tree.
    pub fn is_tracked(&self) -> bool {
        self.tracking_path().is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::CommitId;

    fn repo() -> RepoRef {
        RepoRef::parse("alice/proj").unwrap()
    }

    #[test]
    fn storage_layout() {
        let paths = StoragePaths::new(PathBuf::from("/srv"));
        let id = CommitId::parse("002_first").unwrap();

        assert_eq!(paths.repo_dir(&repo()), PathBuf::from("/srv/alice/proj"));
        assert_eq!(
            paths.commit_dir(&repo(), &id),
            PathBuf::from("/srv/alice/proj/commits/002_first")
        );
        assert_eq!(
            paths.repo_lock_path(&repo()),
            PathBuf::from("/srv/alice/proj/lock")
        );
    }

    #[test]
    fn temp_dirs_are_unique_and_hidden() {
        let paths = StoragePaths::new(PathBuf::from("/srv"));
        let a = paths.temp_commit_dir(&repo());
        let b = paths.temp_commit_dir(&repo());
        assert_ne!(a, b);
        let name = a.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(TEMP_PREFIX));
    }

    #[test]
    fn workspace_layout() {
        let paths = WorkspacePaths::new(PathBuf::from("/work/proj"));
        assert_eq!(paths.control_dir(), PathBuf::from("/work/proj/.pit"));
        assert_eq!(
            paths.tracking_path(),
            PathBuf::from("/work/proj/.pit/tracking.toml")
        );
        assert_eq!(
            paths.staged_commit_dir(&CommitId::parse("001_wip").unwrap()),
            PathBuf::from("/work/proj/.pit/staging/001_wip")
        );
    }

    #[test]
    fn untracked_directory() {
        let temp = tempfile::TempDir::new().unwrap();
        assert!(!WorkspacePaths::new(temp.path().to_path_buf()).is_tracked());
    }
}
