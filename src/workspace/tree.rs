//! workspace::tree
//!
//! Reading and resetting the working tree.
//!
//! Everything below the working directory is content except top-level
//! names with the reserved `.pit` prefix. Symlinks are not followed and
//! are skipped with a warning.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use super::errors::{io_err, WorkspaceError};
use crate::core::diff::FileManifest;
use crate::core::snapshot::FileEntry;
use crate::core::types::{ContentHash, RelPath, RESERVED_PREFIX};

/// Current content of the working tree.
#[derive(Debug, Clone, Default)]
pub struct TreeScan {
    /// Every regular file, spooled from its working tree location
    pub entries: Vec<FileEntry>,
    pub manifest: FileManifest,
}

fn is_reserved_top_level(root: &Path, path: &Path) -> bool {
    path.parent() == Some(root)
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(RESERVED_PREFIX))
}

/// Walk the working tree and hash every file.
///
/// Files over `max_file_size` are rejected before they are read.
pub fn scan(root: &Path, max_file_size: u64) -> Result<TreeScan, WorkspaceError> {
    let mut scan = TreeScan::default();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_reserved_top_level(root, e.path()));

    for entry in walker {
        let entry = entry.map_err(|e| WorkspaceError::Io {
            path: e.path().unwrap_or(root).to_path_buf(),
            source: e.into(),
        })?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        if !file_type.is_file() {
            warn!(path = %entry.path().display(), "skipping non-regular file");
            continue;
        }

        let rel = RelPath::from_fs(root, entry.path())?;
        let size = entry
            .metadata()
            .map_err(|e| WorkspaceError::Io {
                path: entry.path().to_path_buf(),
                source: e.into(),
            })?
            .len();
        if size > max_file_size {
            return Err(WorkspaceError::FileTooLarge {
                path: rel.to_string(),
                size,
                limit: max_file_size,
            });
        }
        let hash = ContentHash::of_file(entry.path()).map_err(io_err(entry.path()))?;
        scan.manifest.insert(rel.clone(), hash);
        scan.entries
            .push(FileEntry::spooled(rel, entry.path().to_path_buf()));
    }

    debug!(root = %root.display(), files = scan.entries.len(), "working tree scanned");
    Ok(scan)
}

/// Remove everything below `root` except reserved top-level entries.
pub fn clear(root: &Path) -> Result<usize, WorkspaceError> {
    let mut removed = 0;
    for entry in fs::read_dir(root).map_err(io_err(root))? {
        let entry = entry.map_err(io_err(root))?;
        let path = entry.path();
        if is_reserved_top_level(root, &path) {
            continue;
        }
        let file_type = entry.file_type().map_err(io_err(&path))?;
        if file_type.is_dir() {
            fs::remove_dir_all(&path).map_err(io_err(&path))?;
        } else {
            fs::remove_file(&path).map_err(io_err(&path))?;
        }
        removed += 1;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn scan_skips_control_entries() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.txt", "a");
        write(temp.path(), "docs/b.md", "b");
        write(temp.path(), ".pit/tracking.toml", "owner = \"x\"");
        write(temp.path(), ".pitignore-me", "reserved");
        write(temp.path(), "docs/.pit-not-top-level", "kept");

        let scan = scan(temp.path(), 1024).unwrap();
        let paths: Vec<_> = scan.manifest.paths().map(RelPath::as_str).collect();
        assert_eq!(paths, vec!["a.txt", "docs/.pit-not-top-level", "docs/b.md"]);
        assert_eq!(scan.entries.len(), 3);
    }

    #[test]
    fn scan_rejects_oversized_files() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "small.txt", "1234");
        write(temp.path(), "dir/big.bin", "12345");

        assert_eq!(scan(temp.path(), 5).unwrap().entries.len(), 2);
        match scan(temp.path(), 4).unwrap_err() {
            WorkspaceError::FileTooLarge { path, size, limit } => {
                assert_eq!(path, "dir/big.bin");
                assert_eq!((size, limit), (5, 4));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn clear_keeps_control_dir() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.txt", "a");
        write(temp.path(), "nested/deep/b.txt", "b");
        write(temp.path(), ".pit/base.json", "{}");

        assert_eq!(clear(temp.path()).unwrap(), 2);
        assert!(!temp.path().join("a.txt").exists());
        assert!(!temp.path().join("nested").exists());
        assert!(temp.path().join(".pit/base.json").exists());
    }
}
