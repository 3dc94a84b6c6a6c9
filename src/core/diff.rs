//! core::diff
//!
//! Change detection between two file manifests.
//!
//! A [`FileManifest`] maps relative paths to content hashes. Two manifests
//! are compared purely by key membership and hash equality; sizes and
//! modification times never enter the comparison, so metadata-only changes
//! are invisible and same-size edits are still detected.
//!
//! Hashing is the caller's job. [`detect`] is a pure function.
//!
//! # Example
//!
//! ```
//! use pit::core::diff::{detect, FileManifest};
//! use pit::core::types::{ContentHash, RelPath};
//!
//! let mut old = FileManifest::new();
//! old.insert(RelPath::new("a.txt").unwrap(), ContentHash::of(b"x"));
//!
//! let mut new = old.clone();
//! new.insert(RelPath::new("b.txt").unwrap(), ContentHash::of(b"y"));
//!
//! let diff = detect(&old, &new);
//! assert!(diff.is_different());
//! assert_eq!(diff.added.len(), 1);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::types::{ContentHash, RelPath};

/// Path → content hash mapping for one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileManifest(BTreeMap<RelPath, ContentHash>);

impl FileManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a manifest by hashing in-memory content.
    pub fn from_contents<'a>(files: impl IntoIterator<Item = (&'a RelPath, &'a [u8])>) -> Self {
        Self(
            files
                .into_iter()
                .map(|(path, content)| (path.clone(), ContentHash::of(content)))
                .collect(),
        )
    }

    pub fn insert(&mut self, path: RelPath, hash: ContentHash) -> Option<ContentHash> {
        self.0.insert(path, hash)
    }

    pub fn get(&self, path: &RelPath) -> Option<&ContentHash> {
        self.0.get(path)
    }

    pub fn contains(&self, path: &RelPath) -> bool {
        self.0.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &RelPath> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RelPath, &ContentHash)> {
        self.0.iter()
    }
}

impl FromIterator<(RelPath, ContentHash)> for FileManifest {
    fn from_iter<I: IntoIterator<Item = (RelPath, ContentHash)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Classification of the differences between two manifests.
///
/// Callers must not rely on iteration order of the sets for anything
/// beyond display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diff {
    /// Paths present only in the new manifest.
    pub added: BTreeSet<RelPath>,
    /// Paths present only in the old manifest.
    pub removed: BTreeSet<RelPath>,
    /// Paths present in both with different hashes.
    pub changed: BTreeSet<RelPath>,
}

impl Diff {
    /// True when nothing was added, removed or changed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    pub fn is_different(&self) -> bool {
        !self.is_empty()
    }

    /// Total number of classified paths.
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.changed.len()
    }
}

impl std::fmt::Display for Diff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "no changes");
        }
        let mut lines = Vec::with_capacity(self.len());
        lines.extend(self.added.iter().map(|p| format!("A {p}")));
        lines.extend(self.changed.iter().map(|p| format!("M {p}")));
        lines.extend(self.removed.iter().map(|p| format!("D {p}")));
        write!(f, "{}", lines.join("\n"))
    }
}

/// Compare two manifests.
pub fn detect(old: &FileManifest, new: &FileManifest) -> Diff {
    let mut diff = Diff::default();

    for (path, new_hash) in new.iter() {
        match old.get(path) {
            None => {
                diff.added.insert(path.clone());
            }
            Some(old_hash) if old_hash != new_hash => {
                diff.changed.insert(path.clone());
            }
            Some(_) => {}
        }
    }

    diff.removed = old
        .paths()
        .filter(|path| !new.contains(path))
        .cloned()
        .collect();

    diff
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(entries: &[(&str, &str)]) -> FileManifest {
        entries
            .iter()
            .map(|(p, c)| (RelPath::new(*p).unwrap(), ContentHash::of(c.as_bytes())))
            .collect()
    }

    fn paths(names: &[&str]) -> BTreeSet<RelPath> {
        names.iter().map(|n| RelPath::new(*n).unwrap()).collect()
    }

    #[test]
    fn identical_manifests_are_not_different() {
        let m = manifest(&[("a.txt", "x"), ("dir/b.txt", "y")]);
        let diff = detect(&m, &m.clone());
        assert!(diff.is_empty());
        assert!(!diff.is_different());
    }

    #[test]
    fn empty_to_empty_is_empty() {
        assert!(detect(&FileManifest::new(), &FileManifest::new()).is_empty());
    }

    #[test]
    fn classifies_all_three_kinds() {
        let old = manifest(&[("keep", "1"), ("edit", "2"), ("gone", "3")]);
        let new = manifest(&[("keep", "1"), ("edit", "changed"), ("fresh", "4")]);

        let diff = detect(&old, &new);
        assert_eq!(diff.added, paths(&["fresh"]));
        assert_eq!(diff.removed, paths(&["gone"]));
        assert_eq!(diff.changed, paths(&["edit"]));
        assert_eq!(diff.len(), 3);
    }

    #[test]
    fn same_size_edit_is_detected() {
        let diff = detect(&manifest(&[("f", "aaaa")]), &manifest(&[("f", "bbbb")]));
        assert_eq!(diff.changed, paths(&["f"]));
    }

    #[test]
    fn display_lists_changes() {
        let diff = detect(&manifest(&[("old", "1")]), &manifest(&[("new", "1")]));
        assert_eq!(diff.to_string(), "A new\nD old");
        assert_eq!(Diff::default().to_string(), "no changes");
    }

    #[test]
    fn from_contents_hashes_bytes() {
        let path = RelPath::new("a.txt").unwrap();
        let m = FileManifest::from_contents([(&path, b"x".as_slice())]);
        assert_eq!(m.get(&path), Some(&ContentHash::of(b"x")));
    }

    #[test]
    fn manifest_serializes_as_map() {
        let m = manifest(&[("a.txt", "x")]);
        let json = serde_json::to_value(&m).unwrap();
        assert!(json.get("a.txt").is_some());
        let back: FileManifest = serde_json::from_value(json).unwrap();
        assert_eq!(back, m);
    }
}
