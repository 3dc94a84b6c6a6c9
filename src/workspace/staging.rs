//! workspace::staging
//!
//! The Local Staging Area and the base record.
//!
//! # Layout
//!
//! Staged commits use the same directory scheme as the server store:
//! `.pit/staging/<index>_<slug>/` holding full file copies plus the
//! metadata record. Local indices start at 1 and are independent of the
//! server's; the server assigns the real id when a commit is pushed.
//!
//! # Acknowledgement
//!
//! Once the server accepts a staged commit, its metadata record gets
//! `acknowledged_as = <server id>`. A push that is retried after an
//! interruption skips acknowledged commits. The queue is only emptied once
//! every staged commit carries a marker.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::errors::{io_err, WorkspaceError};
use crate::core::diff::FileManifest;
use crate::core::paths::{WorkspacePaths, TEMP_PREFIX};
use crate::core::snapshot::{write_commit_dir, CommitMetadata, FileEntry};
use crate::core::types::{CommitId, CommitMessage};

/// The last snapshot known to match the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BaseRecord {
    pub commit: CommitId,
    pub files: FileManifest,
}

impl BaseRecord {
    pub fn read(paths: &WorkspacePaths) -> Result<Option<Self>, WorkspaceError> {
        let path = paths.base_path();
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path).map_err(io_err(&path))?;
        let record = serde_json::from_str(&json).map_err(|e| WorkspaceError::Io {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        Ok(Some(record))
    }

    pub fn write(&self, paths: &WorkspacePaths) -> Result<(), WorkspaceError> {
        let path = paths.base_path();
        let json = serde_json::to_vec_pretty(self).map_err(|e| WorkspaceError::Io {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;

        let temp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path).map_err(io_err(&temp_path))?;
        file.write_all(&json).map_err(io_err(&temp_path))?;
        file.sync_all().map_err(io_err(&temp_path))?;
        fs::rename(&temp_path, &path).map_err(io_err(&path))?;
        Ok(())
    }
}

/// One commit waiting in the staging area.
#[derive(Debug, Clone)]
pub struct StagedCommit {
    pub metadata: CommitMetadata,
    pub dir: PathBuf,
}

impl StagedCommit {
    pub fn id(&self) -> &CommitId {
        &self.metadata.id
    }

    pub fn is_acknowledged(&self) -> bool {
        self.metadata.acknowledged_as.is_some()
    }

    /// The staged files, spooled from the staging directory.
    pub fn entries(&self) -> Vec<FileEntry> {
        self.metadata
            .files
            .paths()
            .map(|path| FileEntry::spooled(path.clone(), path.to_fs(&self.dir)))
            .collect()
    }

    /// Record the server id this commit was accepted as.
    pub fn acknowledge(&mut self, server_id: CommitId) -> Result<(), WorkspaceError> {
        self.metadata.acknowledged_as = Some(server_id);
        self.metadata.write(&self.dir)?;
        Ok(())
    }
}

/// Queue of local commits under `.pit/staging`.
#[derive(Debug, Clone)]
pub struct StagingArea {
    paths: WorkspacePaths,
}

impl StagingArea {
    pub fn new(paths: WorkspacePaths) -> Self {
        Self { paths }
    }

    /// All staged commits, oldest first.
    pub fn list(&self) -> Result<Vec<StagedCommit>, WorkspaceError> {
        let dir = self.paths.staging_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&dir).map_err(io_err(&dir))? {
            let entry = entry.map_err(io_err(&dir))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with('.') {
                continue;
            }
            match CommitId::parse(name) {
                Ok(id) => ids.push(id),
                Err(_) => warn!(entry = name, "ignoring foreign entry in staging area"),
            }
        }
        ids.sort();

        ids.into_iter()
            .map(|id| -> Result<StagedCommit, WorkspaceError> {
                let dir = self.paths.staged_commit_dir(&id);
                let metadata = CommitMetadata::read(&dir)?;
                Ok(StagedCommit { metadata, dir })
            })
            .collect()
    }

    pub fn latest(&self) -> Result<Option<StagedCommit>, WorkspaceError> {
        Ok(self.list()?.pop())
    }

    /// Number of staged commits the server has not acknowledged.
    pub fn pending(&self) -> Result<usize, WorkspaceError> {
        Ok(self.list()?.iter().filter(|c| !c.is_acknowledged()).count())
    }

    /// Stage a complete file set as the next local commit.
    pub fn stage(
        &self,
        message: &CommitMessage,
        files: &[FileEntry],
    ) -> Result<StagedCommit, WorkspaceError> {
        let next = self.list()?.last().map_or(1, |c| c.id().index() + 1);
        let id = CommitId::new(next, message);

        let staging = self.paths.staging_dir();
        fs::create_dir_all(&staging).map_err(io_err(&staging))?;
        let temp_dir = staging.join(format!("{}{}", TEMP_PREFIX, uuid::Uuid::new_v4()));
        let final_dir = self.paths.staged_commit_dir(&id);

        let written = write_commit_dir(&temp_dir, &id, message, files)
            .map_err(WorkspaceError::from)
            .and_then(|metadata| {
                fs::rename(&temp_dir, &final_dir).map_err(io_err(&final_dir))?;
                Ok(metadata)
            });
        match written {
            Ok(metadata) => {
                debug!(commit = %id, files = files.len(), "commit staged");
                Ok(StagedCommit {
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

    /// Remove every staged commit.
    pub fn clear(&self) -> Result<(), WorkspaceError> {
        let dir = self.paths.staging_dir();
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(io_err(&dir))?;
        }
        Ok(())
    }
}
