//! core::snapshot::schema
//!
//! The metadata record stored next to every commit's files.
//!
//! # Format
//!
//! One JSON document named [`METADATA_FILE`] at the root of each commit
//! directory (server commits and client staged commits alike):
//!
//! ```json
//! {
//!   "id": "002_first",
//!   "message": "first",
//!   "timestamp": "2026-10-16T12:00:00Z",
//!   "files": { "a.txt": "2d711642b726b04401627ca9fbac32f5c8530fb1903cc4db02258717921a4881" }
//! }
//! ```
//!
//! The `files` manifest is what the next commit diffs against, so a diff
//! never needs to re-hash the stored snapshot.
//!
//! [`METADATA_FILE`]: crate::core::paths::METADATA_FILE

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::diff::FileManifest;
use crate::core::paths::METADATA_FILE;
use crate::core::types::{CommitId, CommitMessage, RelPath};

/// Message of the synthetic commit seeded into every new repository.
pub const SEED_MESSAGE: &str = "initial";

/// Errors reading or writing a metadata record.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to read commit metadata '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse commit metadata '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write commit metadata '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Metadata record for one commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommitMetadata {
    pub id: CommitId,
    pub message: CommitMessage,
    pub timestamp: DateTime<Utc>,
    /// Path → content hash of every file in the commit.
    pub files: FileManifest,
    /// Server id this staged commit was acknowledged as (client staging only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_as: Option<CommitId>,
}

impl CommitMetadata {
    pub fn new(id: CommitId, message: CommitMessage, files: FileManifest) -> Self {
        Self {
            id,
            message,
            timestamp: Utc::now(),
            files,
            acknowledged_as: None,
        }
    }

    /// Read the record from a commit directory.
    pub fn read(commit_dir: &Path) -> Result<Self, MetadataError> {
        let path = commit_dir.join(METADATA_FILE);
        let json = fs::read_to_string(&path).map_err(|e| MetadataError::ReadError {
            path: path.clone(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| MetadataError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Write the record into a commit directory (temp file + rename).
    pub fn write(&self, commit_dir: &Path) -> Result<(), MetadataError> {
        let path = commit_dir.join(METADATA_FILE);
        let json = serde_json::to_string_pretty(self).map_err(|e| MetadataError::ParseError {
            path: path.clone(),
            message: e.to_string(),
        })?;

        let temp_path = commit_dir.join(format!("{METADATA_FILE}.tmp"));
        let write_err = |source| MetadataError::WriteError {
            path: path.clone(),
            source,
        };
        let mut file = fs::File::create(&temp_path).map_err(write_err)?;
        file.write_all(json.as_bytes()).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        fs::rename(&temp_path, &path).map_err(write_err)?;
        Ok(())
    }
}

/// A commit as read back from disk.
#[derive(Debug, Clone)]
pub struct Commit {
    pub metadata: CommitMetadata,
    /// Directory holding the commit's files.
    pub dir: PathBuf,
}

impl Commit {
    pub fn id(&self) -> &CommitId {
        &self.metadata.id
    }

    pub fn message(&self) -> &CommitMessage {
        &self.metadata.message
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.metadata.timestamp
    }

    pub fn manifest(&self) -> &FileManifest {
        &self.metadata.files
    }

    /// Location of one of the commit's files.
    pub fn file_path(&self, path: &RelPath) -> PathBuf {
        path.to_fs(&self.dir)
    }

    pub fn read_file(&self, path: &RelPath) -> std::io::Result<Vec<u8>> {
        fs::read(self.file_path(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ContentHash;
    use tempfile::TempDir;

    fn sample() -> CommitMetadata {
        let mut files = FileManifest::new();
        files.insert(RelPath::new("a.txt").unwrap(), ContentHash::of(b"x"));
        CommitMetadata::new(
            CommitId::parse("002_first").unwrap(),
            CommitMessage::new("first", 200),
            files,
        )
    }

    #[test]
    fn write_then_read() {
        let temp = TempDir::new().unwrap();
        let meta = sample();
        meta.write(temp.path()).unwrap();

        assert!(temp.path().join(METADATA_FILE).exists());
        assert!(!temp.path().join(format!("{METADATA_FILE}.tmp")).exists());
        assert_eq!(CommitMetadata::read(temp.path()).unwrap(), meta);
    }

    #[test]
    fn acknowledgement_omitted_when_absent() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("acknowledged_as").is_none());
    }

    #[test]
    fn missing_record_is_read_error() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            CommitMetadata::read(temp.path()),
            Err(MetadataError::ReadError { .. })
        ));
    }

    #[test]
    fn malformed_record_is_parse_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(METADATA_FILE), "{\"id\": 3}").unwrap();
        assert!(matches!(
            CommitMetadata::read(temp.path()),
            Err(MetadataError::ParseError { .. })
        ));
    }

    #[test]
    fn commit_reads_its_files() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("dir")).unwrap();
        fs::write(temp.path().join("dir/b.txt"), "hello").unwrap();

        let commit = Commit {
            metadata: sample(),
            dir: temp.path().to_path_buf(),
        };
        let content = commit
            .read_file(&RelPath::new("dir/b.txt").unwrap())
            .unwrap();
        assert_eq!(content, b"hello");
        assert_eq!(commit.id().to_string(), "002_first");
    }
}
