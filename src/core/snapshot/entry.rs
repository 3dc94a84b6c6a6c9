//! core::snapshot::entry
//!
//! Incoming file entries for a new commit.
//!
//! Content is either already in memory or spooled to a file on disk (an
//! upload buffer, a staged commit, a working tree file). Spooled content
//! can be size-probed through filesystem metadata before a single byte is
//! read, which is how the per-file size ceiling avoids buffering oversized
//! files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::core::types::{ContentHash, RelPath};

/// Where a file's bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Bytes(Vec<u8>),
    Spooled(PathBuf),
}

impl FileContent {
    /// Size in bytes, without reading spooled content.
    pub fn size(&self) -> io::Result<u64> {
        match self {
            FileContent::Bytes(bytes) => Ok(bytes.len() as u64),
            FileContent::Spooled(path) => Ok(fs::metadata(path)?.len()),
        }
    }

    /// SHA-256 of the content, streaming spooled files.
    pub fn hash(&self) -> io::Result<ContentHash> {
        match self {
            FileContent::Bytes(bytes) => Ok(ContentHash::of(bytes)),
            FileContent::Spooled(path) => ContentHash::of_file(path),
        }
    }

    /// Write the content to `dest`, creating parent directories.
    pub fn write_to(&self, dest: &Path) -> io::Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        match self {
            FileContent::Bytes(bytes) => fs::write(dest, bytes),
            FileContent::Spooled(path) => fs::copy(path, dest).map(|_| ()),
        }
    }

    /// Load the whole content into memory.
    pub fn read(&self) -> io::Result<Vec<u8>> {
        match self {
            FileContent::Bytes(bytes) => Ok(bytes.clone()),
            FileContent::Spooled(path) => fs::read(path),
        }
    }
}

/// One file of a commit: relative path plus content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: RelPath,
    pub content: FileContent,
}

impl FileEntry {
    pub fn bytes(path: RelPath, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            path,
            content: FileContent::Bytes(bytes.into()),
        }
    }

    pub fn spooled(path: RelPath, file: PathBuf) -> Self {
        Self {
            path,
            content: FileContent::Spooled(file),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn spooled_and_bytes_agree() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("f");
        fs::write(&file, b"payload").unwrap();

        let spooled = FileContent::Spooled(file);
        let bytes = FileContent::Bytes(b"payload".to_vec());

        assert_eq!(spooled.size().unwrap(), 7);
        assert_eq!(bytes.size().unwrap(), 7);
        assert_eq!(spooled.hash().unwrap(), bytes.hash().unwrap());
        assert_eq!(spooled.read().unwrap(), b"payload");
    }

    #[test]
    fn write_to_creates_parents() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("a/b/c.txt");
        FileContent::Bytes(b"x".to_vec()).write_to(&dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"x");
    }

    #[test]
    fn missing_spool_file_errors_on_probe() {
        let content = FileContent::Spooled(PathBuf::from("/definitely/not/here"));
        assert!(content.size().is_err());
    }
}
