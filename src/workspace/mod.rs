//! workspace
//!
//! The client side: a working directory bound to one server repository.
//!
//! # Architecture
//!
//! A working directory is tracked when `.pit/tracking.toml` names its
//! (owner, repo). Next to it the control directory holds:
//!
//! - `base.json`: the last server snapshot the tree is known to match
//! - `staging/`: the Local Staging Area (commits not yet pushed)
//! - `lock`: held by every mutating operation so commit, push and pull
//!   never interleave
//!
//! Operations that reach the server take a `&dyn Remote` and the caller's
//! [`Credentials`]; the workspace never knows how the server is reached.
//!
//! # Lifecycle
//!
//! ```text
//! clone ──> tracked ──commit──> staged* ──push──> acknowledged ──> base updated
//!              ^                                                     │
//!              └──────────────────────── pull ───────────────────────┘
//! ```
//!
//! # Invariants
//!
//! - A failed push never empties the staging queue
//! - Pull validates the whole archive before the working tree is touched
//! - The control directory is never part of a commit

mod errors;
pub mod staging;
pub mod tree;

pub use errors::WorkspaceError;
pub use staging::{BaseRecord, StagedCommit, StagingArea};

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::auth::Credentials;
use crate::core::archive::{self, Archive};
use crate::core::config::{Config, Limits, TrackingRecord};
use crate::core::diff::{self, Diff, FileManifest};
use crate::core::ops::RepoLock;
use crate::core::paths::WorkspacePaths;
use crate::core::types::{CommitId, CommitMessage, RelPath, RepoRef};
use crate::engine::SyncError;
use crate::remote::Remote;
use errors::io_err;

/// Working tree changes relative to the last known snapshot.
#[derive(Debug, Clone)]
pub struct Status {
    /// Server commit the working tree was last synchronized with
    pub base: Option<CommitId>,
    /// Staged commits not yet acknowledged by the server
    pub pending: usize,
    pub diff: Diff,
}

/// Outcome of a push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushReport {
    /// Server ids assigned in this push, in order
    pub applied: Vec<CommitId>,
    /// Staged commits skipped because an earlier push already delivered them
    pub skipped: usize,
}

impl PushReport {
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty() && self.skipped == 0
    }
}

/// Outcome of a clone or pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullReport {
    pub commit: CommitId,
    pub files: BTreeSet<RelPath>,
    /// Unpushed staged commits that no longer describe the tree
    pub pending: usize,
}

/// A tracked working directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    paths: WorkspacePaths,
    repo: RepoRef,
    limits: Limits,
    staging: StagingArea,
}

impl Workspace {
    /// Open the tracked working directory at `work_dir`.
    pub fn open(work_dir: &Path, limits: Limits) -> Result<Self, WorkspaceError> {
        let paths = WorkspacePaths::new(work_dir.to_path_buf());
        if !paths.is_tracked() {
            return Err(WorkspaceError::NotTracked(work_dir.to_path_buf()));
        }
        let record = Config::read_tracking(work_dir)?;
        Ok(Self::bind(paths, record.repo_ref(), limits))
    }

    /// Open the nearest tracked directory at or above `start`.
    pub fn discover(start: &Path, limits: Limits) -> Result<Self, WorkspaceError> {
        start
            .ancestors()
            .find(|dir| WorkspacePaths::new(dir.to_path_buf()).is_tracked())
            .ok_or_else(|| WorkspaceError::NotTracked(start.to_path_buf()))
            .and_then(|dir| Self::open(dir, limits))
    }

    fn bind(paths: WorkspacePaths, repo: RepoRef, limits: Limits) -> Self {
        let staging = StagingArea::new(paths.clone());
        Self {
            paths,
            repo,
            limits,
            staging,
        }
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    pub fn work_dir(&self) -> &Path {
        self.paths.work_dir()
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    pub fn base(&self) -> Result<Option<BaseRecord>, WorkspaceError> {
        BaseRecord::read(&self.paths)
    }

    fn lock(&self) -> Result<RepoLock, WorkspaceError> {
        Ok(RepoLock::acquire_now(&self.paths.lock_path())?)
    }

    /// The manifest new work is compared against: the newest staged
    /// commit, else the base snapshot, else nothing.
    fn reference_manifest(&self) -> Result<FileManifest, WorkspaceError> {
        if let Some(staged) = self.staging.latest()? {
            return Ok(staged.metadata.files);
        }
        Ok(self.base()?.map(|b| b.files).unwrap_or_default())
    }

    /// Diff the working tree against the last known snapshot.
    pub fn status(&self) -> Result<Status, WorkspaceError> {
        let scan = tree::scan(self.work_dir(), self.limits.max_file_size)?;
        let diff = diff::detect(&self.reference_manifest()?, &scan.manifest);
        Ok(Status {
            base: self.base()?.map(|b| b.commit),
            pending: self.staging.pending()?,
            diff,
        })
    }

    /// Stage the working tree as a local commit.
    ///
    /// # Errors
    ///
    /// - [`WorkspaceError::NoChanges`] if the tree matches the last snapshot
    pub fn commit(&self, message: &str) -> Result<StagedCommit, WorkspaceError> {
        let _lock = self.lock()?;

        let scan = tree::scan(self.work_dir(), self.limits.max_file_size)?;
        let changes = diff::detect(&self.reference_manifest()?, &scan.manifest);
        if !changes.is_different() {
            return Err(WorkspaceError::NoChanges);
        }

        let message = CommitMessage::new(message, self.limits.max_message_len);
        let staged = self.staging.stage(&message, &scan.entries)?;
        info!(
            repo = %self.repo,
            staged = %staged.id(),
            changes = changes.len(),
            "commit staged"
        );
        Ok(staged)
    }

    /// Replay staged commits to the server, oldest first.
    ///
    /// Each accepted commit is marked acknowledged before the next is
    /// sent. A commit the server reports as [`SyncError::NoChanges`] was
    /// delivered by an earlier, interrupted push and is marked with the
    /// server's latest id. The queue is cleared only when every commit
    /// is acknowledged.
    ///
    /// # Errors
    ///
    /// - [`WorkspaceError::PushInterrupted`] on the first rejected commit;
    ///   the queue is left intact for a retry
    pub async fn push(
        &self,
        remote: &dyn Remote,
        credentials: &Credentials,
    ) -> Result<PushReport, WorkspaceError> {
        let _lock = self.lock()?;
        self.push_locked(remote, credentials).await
    }

    async fn push_locked(
        &self,
        remote: &dyn Remote,
        credentials: &Credentials,
    ) -> Result<PushReport, WorkspaceError> {
        let queue = self.staging.list()?;
        let total = queue.len();
        let mut report = PushReport::default();
        let mut last: Option<(CommitId, FileManifest)> = None;

        for mut staged in queue {
            if let Some(server_id) = staged.metadata.acknowledged_as.clone() {
                debug!(staged = %staged.id(), server = %server_id, "already acknowledged");
                report.skipped += 1;
                last = Some((server_id, staged.metadata.files));
                continue;
            }

            let acknowledged = report.skipped + report.applied.len();
            let result = remote
                .commit(
                    credentials,
                    &self.repo,
                    staged.metadata.message.as_str(),
                    staged.entries(),
                )
                .await;

            let server_id = match result {
                Ok(id) => {
                    report.applied.push(id.clone());
                    id
                }
                Err(SyncError::NoChanges) => {
                    let id = latest_server_id(remote, credentials, &self.repo)
                        .await
                        .map_err(|source| WorkspaceError::PushInterrupted {
                            acknowledged,
                            total,
                            source,
                        })?;
                    debug!(staged = %staged.id(), server = %id, "already on server");
                    report.skipped += 1;
                    id
                }
                Err(source) => {
                    warn!(
                        repo = %self.repo,
                        staged = %staged.id(),
                        error = %source,
                        "push interrupted"
                    );
                    return Err(WorkspaceError::PushInterrupted {
                        acknowledged,
                        total,
                        source,
                    });
                }
            };

            staged.acknowledge(server_id.clone())?;
            last = Some((server_id, staged.metadata.files));
        }

        if let Some((commit, files)) = last {
            BaseRecord { commit, files }.write(&self.paths)?;
        }
        self.staging.clear()?;
        info!(
            repo = %self.repo,
            applied = report.applied.len(),
            skipped = report.skipped,
            "push complete"
        );
        Ok(report)
    }

    /// Stage the working tree and push the whole queue.
    ///
    /// A clean tree is only an error when nothing is waiting to be pushed.
    pub async fn commit_and_push(
        &self,
        remote: &dyn Remote,
        credentials: &Credentials,
        message: &str,
    ) -> Result<PushReport, WorkspaceError> {
        match self.commit(message) {
            Ok(_) => {}
            Err(WorkspaceError::NoChanges) if self.staging.pending()? > 0 => {
                debug!(repo = %self.repo, "nothing new to stage, pushing queue");
            }
            Err(e) => return Err(e),
        }
        let _lock = self.lock()?;
        self.push_locked(remote, credentials).await
    }

    /// Replace the working tree with a server commit (latest if `id` is
    /// `None`).
    ///
    /// The archive is fully decoded before anything is erased, so a
    /// corrupt archive leaves the tree untouched. Staged commits are kept
    /// but no longer describe the tree; the report counts them.
    pub async fn pull(
        &self,
        remote: &dyn Remote,
        credentials: &Credentials,
        id: Option<&str>,
    ) -> Result<PullReport, WorkspaceError> {
        let _lock = self.lock()?;

        let pending = self.staging.pending()?;
        let snapshot = remote.pull(credentials, &self.repo, id).await?;
        let archive = decode_for(&snapshot.archive, &self.repo, self.limits)?;

        let removed = tree::clear(self.work_dir())?;
        debug!(removed, "working tree cleared");
        let report = PullReport {
            pending,
            ..install(&self.paths, &archive)?
        };
        info!(
            repo = %self.repo,
            commit = %report.commit,
            files = report.files.len(),
            pending,
            "pulled"
        );
        Ok(report)
    }

    /// Clone `repo` into `<parent>/<repo name>` and track it.
    ///
    /// # Errors
    ///
    /// - [`WorkspaceError::DestinationExists`] if the folder is present
    pub async fn clone_into(
        parent: &Path,
        remote: &dyn Remote,
        credentials: &Credentials,
        repo: &RepoRef,
        limits: Limits,
    ) -> Result<(Self, PullReport), WorkspaceError> {
        let dest = parent.join(repo.name.as_str());
        if dest.exists() {
            return Err(WorkspaceError::DestinationExists(dest));
        }

        let snapshot = remote.clone_repository(credentials, repo).await?;
        let archive = decode_for(&snapshot.archive, repo, limits)?;

        fs::create_dir_all(&dest).map_err(io_err(&dest))?;
        match Self::materialize(&dest, &archive, limits) {
            Ok(done) => {
                info!(repo = %repo, dest = %dest.display(), commit = %done.1.commit, "cloned");
                Ok(done)
            }
            Err(e) => {
                let _ = fs::remove_dir_all(&dest);
                Err(e)
            }
        }
    }

    fn materialize(
        dest: &Path,
        archive: &Archive,
        limits: Limits,
    ) -> Result<(Self, PullReport), WorkspaceError> {
        let repo = archive.descriptor.repo.clone();
        Config::write_tracking(dest, &TrackingRecord::new(&repo))?;
        let paths = WorkspacePaths::new(PathBuf::from(dest));
        let report = install(&paths, archive)?;
        Ok((Self::bind(paths, repo, limits), report))
    }
}

/// Decode a snapshot archive and check it belongs to `repo`.
fn decode_for(bytes: &[u8], repo: &RepoRef, limits: Limits) -> Result<Archive, WorkspaceError> {
    let archive = archive::decode(bytes, limits.max_file_size)?;
    if &archive.descriptor.repo != repo {
        return Err(WorkspaceError::RepoMismatch {
            expected: repo.to_string(),
            found: archive.descriptor.repo.to_string(),
        });
    }
    Ok(archive)
}

/// Extract an archive into the working tree and record it as the base.
fn install(paths: &WorkspacePaths, archive: &Archive) -> Result<PullReport, WorkspaceError> {
    let files = archive.extract_to(paths.work_dir())?;
    BaseRecord {
        commit: archive.descriptor.commit.clone(),
        files: archive.manifest(),
    }
    .write(paths)?;
    Ok(PullReport {
        commit: archive.descriptor.commit.clone(),
        files,
        pending: 0,
    })
}

async fn latest_server_id(
    remote: &dyn Remote,
    credentials: &Credentials,
    repo: &RepoRef,
) -> Result<CommitId, SyncError> {
    remote
        .log(credentials, repo)
        .await?
        .pop()
        .map(|summary| summary.id)
        .ok_or_else(|| SyncError::NoCommits(repo.to_string()))
}
