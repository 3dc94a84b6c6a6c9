//! core::archive
//!
//! Archive Codec: zip transfer format for one commit's file set.
//!
//! # Format
//!
//! A zip archive whose entries are the commit's files under forward-slash
//! relative names, plus one reserved top-level descriptor entry
//! ([`DESCRIPTOR_ENTRY`]) naming the source repository and commit. The
//! commit metadata record is never packed.
//!
//! # Decoding
//!
//! [`decode`] validates the whole archive before anything touches disk:
//! unreadable zip structure, unsafe entry names, duplicate entries or a
//! missing descriptor are all [`ArchiveError::Corrupt`]. Entries are
//! bounded by the per-file size ceiling, so decode memory is bounded by
//! entry count times ceiling. Only a fully decoded [`Archive`] can be
//! extracted, which is what lets callers clear a working tree safely.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::core::diff::FileManifest;
use crate::core::paths::DESCRIPTOR_ENTRY;
use crate::core::snapshot::Commit;
use crate::core::types::{CommitId, ContentHash, RelPath, RepoRef};

/// Size cap for the descriptor entry, independent of the file ceiling.
pub const MAX_DESCRIPTOR_SIZE: u64 = 4096;

/// Errors from packing or unpacking archives.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("corrupt archive: {0}")]
    Corrupt(String),

    #[error("archive entry '{path}' is {size} bytes, over the {limit} byte limit")]
    EntryTooLarge { path: String, size: u64, limit: u64 },

    #[error("archive i/o error at '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to build archive: {0}")]
    Build(String),
}

/// The self-configuration entry carried inside every archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveDescriptor {
    pub repo: RepoRef,
    pub commit: CommitId,
}

/// A fully validated, in-memory archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub descriptor: ArchiveDescriptor,
    files: BTreeMap<RelPath, Vec<u8>>,
}

impl Archive {
    pub fn paths(&self) -> impl Iterator<Item = &RelPath> {
        self.files.keys()
    }

    pub fn get(&self, path: &RelPath) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Content hashes of every file, as a diff baseline.
    pub fn manifest(&self) -> FileManifest {
        self.files
            .iter()
            .map(|(path, bytes)| (path.clone(), ContentHash::of(bytes)))
            .collect()
    }

    /// Write every file below `dest`, returning the extracted paths.
    ///
    /// Existing files at the same paths are overwritten; nothing else in
    /// `dest` is touched. The descriptor is not written.
    pub fn extract_to(&self, dest: &Path) -> Result<BTreeSet<RelPath>, ArchiveError> {
        let mut extracted = BTreeSet::new();
        for (path, bytes) in &self.files {
            let target = path.to_fs(dest);
            let io_err = |source| ArchiveError::Io {
                path: target.clone(),
                source,
            };
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
            fs::write(&target, bytes).map_err(io_err)?;
            extracted.insert(path.clone());
        }
        debug!(dest = %dest.display(), files = extracted.len(), "archive extracted");
        Ok(extracted)
    }
}

/// Pack a commit's files (never its metadata record) into a zip archive.
pub fn pack(commit: &Commit, repo: &RepoRef) -> Result<Vec<u8>, ArchiveError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let build_err = |e: zip::result::ZipError| ArchiveError::Build(e.to_string());

    for path in commit.manifest().paths() {
        let bytes = commit.read_file(path).map_err(|source| ArchiveError::Io {
            path: commit.file_path(path),
            source,
        })?;
        writer.start_file(path.as_str(), options).map_err(build_err)?;
        writer
            .write_all(&bytes)
            .map_err(|e| ArchiveError::Build(e.to_string()))?;
    }

    let descriptor = ArchiveDescriptor {
        repo: repo.clone(),
        commit: commit.id().clone(),
    };
    let json = serde_json::to_vec_pretty(&descriptor)
        .map_err(|e| ArchiveError::Build(e.to_string()))?;
    writer
        .start_file(DESCRIPTOR_ENTRY, options)
        .map_err(build_err)?;
    writer
        .write_all(&json)
        .map_err(|e| ArchiveError::Build(e.to_string()))?;

    let cursor = writer.finish().map_err(build_err)?;
    let bytes = cursor.into_inner();
    debug!(repo = %repo, commit = %commit.id(), bytes = bytes.len(), "archive packed");
    Ok(bytes)
}

/// Decode and validate an archive without touching the filesystem.
pub fn decode(bytes: &[u8], max_file_size: u64) -> Result<Archive, ArchiveError> {
    let corrupt = |e: zip::result::ZipError| ArchiveError::Corrupt(e.to_string());
    let mut zip = ZipArchive::new(Cursor::new(bytes)).map_err(corrupt)?;

    let mut files = BTreeMap::new();
    let mut descriptor = None;

    for i in 0..zip.len() {
        let entry = zip.by_index(i).map_err(corrupt)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();

        if name == DESCRIPTOR_ENTRY {
            let raw = read_bounded(entry, &name, MAX_DESCRIPTOR_SIZE)?;
            let parsed: ArchiveDescriptor = serde_json::from_slice(&raw)
                .map_err(|e| ArchiveError::Corrupt(format!("bad descriptor: {e}")))?;
            if descriptor.replace(parsed).is_some() {
                return Err(ArchiveError::Corrupt("duplicate descriptor".into()));
            }
            continue;
        }

        let path = RelPath::new(name.as_str())
            .map_err(|e| ArchiveError::Corrupt(format!("unsafe entry name: {e}")))?;
        if path.is_reserved() {
            return Err(ArchiveError::Corrupt(format!(
                "reserved entry name '{name}'"
            )));
        }
        let content = read_bounded(entry, &name, max_file_size)?;
        if files.insert(path, content).is_some() {
            return Err(ArchiveError::Corrupt(format!("duplicate entry '{name}'")));
        }
    }

    let descriptor =
        descriptor.ok_or_else(|| ArchiveError::Corrupt("missing descriptor entry".into()))?;
    Ok(Archive { descriptor, files })
}

/// Decode `bytes` and extract them below `dest`.
///
/// Nothing is written unless the whole archive decodes.
pub fn unpack(
    bytes: &[u8],
    dest: &Path,
    max_file_size: u64,
) -> Result<(ArchiveDescriptor, BTreeSet<RelPath>), ArchiveError> {
    let archive = decode(bytes, max_file_size)?;
    let paths = archive.extract_to(dest)?;
    Ok((archive.descriptor, paths))
}

fn read_bounded(entry: impl Read, name: &str, limit: u64) -> Result<Vec<u8>, ArchiveError> {
    let mut buf = Vec::new();
    entry
        .take(limit + 1)
        .read_to_end(&mut buf)
        .map_err(|e| ArchiveError::Corrupt(format!("unreadable entry '{name}': {e}")))?;
    if buf.len() as u64 > limit {
        return Err(ArchiveError::EntryTooLarge {
            path: name.to_string(),
            size: buf.len() as u64,
            limit,
        });
    }
    Ok(buf)
}
