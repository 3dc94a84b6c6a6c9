//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`Identity`] - Authenticated principal name (repository owner)
//! - [`RepoName`] - Validated repository name
//! - [`RepoRef`] - (owner, name) pair addressing one repository
//! - [`RelPath`] - Normalized forward-slash path relative to a file tree root
//! - [`ContentHash`] - SHA-256 digest of file content
//! - [`CommitMessage`] - Sanitized, length-capped commit message
//! - [`CommitId`] - Dense commit index plus message slug (`002_first`)
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, so a `RelPath` can always be joined onto a
//! storage root without escaping it.
//!
//! # Examples
//!
//! ```
//! use pit::core::types::{CommitId, CommitMessage, RelPath};
//!
//! let message = CommitMessage::new("first", 200);
//! let id = CommitId::new(2, &message);
//! assert_eq!(id.to_string(), "002_first");
//!
//! assert!(RelPath::new("src/main.rs").is_ok());
//! assert!(RelPath::new("../etc/passwd").is_err());
//! ```

use std::cmp::Ordering;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Reserved name prefix for control entries (client control dir, archive
/// descriptor, commit metadata record).
pub const RESERVED_PREFIX: &str = ".pit";

/// Number of message characters carried into a commit id slug.
pub const SLUG_LEN: usize = 20;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("invalid repository name: {0}")]
    InvalidRepoName(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid content hash: {0}")]
    InvalidHash(String),

    #[error("invalid commit id: {0}")]
    InvalidCommitId(String),
}

/// Shared validation for identities and repository names.
///
/// Both end up as directory names in server storage, so they are limited
/// to a portable character set.
fn validate_name(name: &str, what: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err(format!("{what} cannot be empty"));
    }
    if name.len() > 64 {
        return Err(format!("{what} cannot be longer than 64 characters"));
    }
    if name.starts_with('.') || name.starts_with('-') {
        return Err(format!("{what} cannot start with '.' or '-'"));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(format!("{what} cannot contain '{c}'"));
    }
    Ok(())
}

macro_rules! name_type {
    ($(#[$meta:meta])* $name:ident, $variant:ident, $what:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a new validated value.
            pub fn new(value: impl Into<String>) -> Result<Self, TypeError> {
                let value = value.into();
                validate_name(&value, $what).map_err(TypeError::$variant)?;
                Ok(Self(value))
            }

            /// Get the value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = TypeError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(s)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

name_type!(
    /// An authenticated principal.
    ///
    /// Identities own repositories and name the first level of the
    /// server storage tree.
    Identity,
    InvalidIdentity,
    "identity"
);

name_type!(
    /// A repository name, unique per owner.
    RepoName,
    InvalidRepoName,
    "repository name"
);

impl Identity {
    /// Identity derived from a public key digest: `key-` plus the first
    /// eight digest bytes in hex.
    pub fn from_key_digest(digest: &[u8]) -> Self {
        let prefix = &digest[..digest.len().min(8)];
        Self(format!("key-{}", hex::encode(prefix)))
    }
}

/// Address of one repository: (owner identity, name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: Identity,
    pub name: RepoName,
}

impl RepoRef {
    pub fn new(owner: Identity, name: RepoName) -> Self {
        Self { owner, name }
    }

    /// Parse an `owner/name` string.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let (owner, name) = s
            .split_once('/')
            .ok_or_else(|| TypeError::InvalidRepoName(format!("expected owner/name, got '{s}'")))?;
        Ok(Self::new(Identity::new(owner)?, RepoName::new(name)?))
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A normalized relative path inside a file tree.
///
/// Components are joined with `/` regardless of platform. Absolute paths,
/// empty components, `.` and `..` are rejected, as are backslashes, so
/// joining a `RelPath` onto a root can never escape that root.
///
/// # Example
///
/// ```
/// use pit::core::types::RelPath;
///
/// let path = RelPath::new("docs/guide.md").unwrap();
/// assert_eq!(path.as_str(), "docs/guide.md");
/// assert_eq!(path.file_name(), "guide.md");
///
/// assert!(RelPath::new("/abs").is_err());
/// assert!(RelPath::new("a//b").is_err());
/// assert!(RelPath::new("a\\b").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelPath(String);

impl RelPath {
    /// Create a validated relative path from a forward-slash string.
    pub fn new(path: impl Into<String>) -> Result<Self, TypeError> {
        let path = path.into();
        if path.is_empty() {
            return Err(TypeError::InvalidPath("path cannot be empty".into()));
        }
        if path.contains('\\') {
            return Err(TypeError::InvalidPath(format!(
                "'{path}' must use forward slashes"
            )));
        }
        if path.contains('\0') {
            return Err(TypeError::InvalidPath("path cannot contain NUL".into()));
        }
        for component in path.split('/') {
            match component {
                "" => {
                    return Err(TypeError::InvalidPath(format!(
                        "'{path}' has an empty component or is absolute"
                    )))
                }
                "." | ".." => {
                    return Err(TypeError::InvalidPath(format!(
                        "'{path}' cannot contain '.' or '..'"
                    )))
                }
                _ => {}
            }
        }
        Ok(Self(path))
    }

    /// Build a `RelPath` from a filesystem path below `root`.
    pub fn from_fs(root: &Path, full: &Path) -> Result<Self, TypeError> {
        let rel = full.strip_prefix(root).map_err(|_| {
            TypeError::InvalidPath(format!(
                "'{}' is not under '{}'",
                full.display(),
                root.display()
            ))
        })?;
        let mut parts = Vec::new();
        for component in rel.components() {
            match component {
                Component::Normal(part) => parts.push(
                    part.to_str()
                        .ok_or_else(|| {
                            TypeError::InvalidPath(format!(
                                "'{}' is not valid UTF-8",
                                rel.display()
                            ))
                        })?
                        .to_string(),
                ),
                _ => {
                    return Err(TypeError::InvalidPath(format!(
                        "'{}' is not a plain relative path",
                        rel.display()
                    )))
                }
            }
        }
        Self::new(parts.join("/"))
    }

    /// Resolve this path below `root`.
    pub fn to_fs(&self, root: &Path) -> PathBuf {
        self.0.split('/').fold(root.to_path_buf(), |acc, c| acc.join(c))
    }

    /// First path component.
    pub fn top_level(&self) -> &str {
        self.0.split('/').next().unwrap_or(&self.0)
    }

    /// Last path component.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Whether the top-level component is reserved for control data.
    pub fn is_reserved(&self) -> bool {
        self.top_level().starts_with(RESERVED_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RelPath {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RelPath> for String {
    fn from(path: RelPath) -> Self {
        path.0
    }
}

impl std::fmt::Display for RelPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SHA-256 digest of file content, stored as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Hash a byte slice.
    pub fn of(content: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(content)))
    }

    /// Hash a reader without buffering it whole.
    pub fn of_reader(mut reader: impl std::io::Read) -> std::io::Result<Self> {
        let mut hasher = Sha256::new();
        std::io::copy(&mut reader, &mut hasher)?;
        Ok(Self(hex::encode(hasher.finalize())))
    }

    /// Hash a file on disk.
    pub fn of_file(path: &Path) -> std::io::Result<Self> {
        Self::of_reader(std::fs::File::open(path)?)
    }

    /// Parse a hex digest.
    pub fn from_hex(hex_str: impl Into<String>) -> Result<Self, TypeError> {
        let s = hex_str.into().to_ascii_lowercase();
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidHash(format!(
                "expected 64 hex characters, got '{s}'"
            )));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ContentHash {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(s)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A sanitized commit message.
///
/// Control characters other than newline are dropped, surrounding
/// whitespace is trimmed and the result is capped at `max_len` characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitMessage(String);

impl CommitMessage {
    pub fn new(raw: &str, max_len: usize) -> Self {
        let cleaned: String = raw
            .chars()
            .filter(|c| *c == '\n' || !c.is_control())
            .collect();
        Self(cleaned.trim().chars().take(max_len).collect())
    }

    /// Filesystem-safe slug used in commit ids.
    ///
    /// Whitespace becomes `_`, characters outside `[A-Za-z0-9._-]` are
    /// dropped, and the first [`SLUG_LEN`] characters are kept. An empty
    /// slug falls back to `commit`.
    pub fn slug(&self) -> String {
        let normalized: String = self
            .0
            .chars()
            .filter_map(|c| {
                if c.is_whitespace() {
                    Some('_')
                } else if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    Some(c)
                } else {
                    None
                }
            })
            .take(SLUG_LEN)
            .collect();
        let trimmed = normalized.trim_end_matches('.');
        if trimmed.is_empty() {
            "commit".to_string()
        } else {
            trimmed.to_string()
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CommitMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one commit within a repository.
///
/// Rendered as the zero-padded (at least three digit) index, an underscore
/// and the message slug. Ordering is by index, so ids past `999` still sort
/// correctly even though their directory names no longer do.
///
/// # Example
///
/// ```
/// use pit::core::types::CommitId;
///
/// let id = CommitId::parse("012_fix_the_parser").unwrap();
/// assert_eq!(id.index(), 12);
/// assert_eq!(id.slug(), "fix_the_parser");
/// assert_eq!(id.to_string(), "012_fix_the_parser");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitId {
    index: u32,
    slug: String,
}

impl CommitId {
    /// Build the id for the commit at `index` carrying `message`.
    pub fn new(index: u32, message: &CommitMessage) -> Self {
        Self {
            index,
            slug: message.slug(),
        }
    }

    /// Parse a commit directory name.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let (digits, slug) = s
            .split_once('_')
            .ok_or_else(|| TypeError::InvalidCommitId(format!("'{s}' has no '_' separator")))?;
        if digits.len() < 3 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(TypeError::InvalidCommitId(format!(
                "'{s}' must start with a zero-padded index"
            )));
        }
        let index: u32 = digits
            .parse()
            .map_err(|_| TypeError::InvalidCommitId(format!("'{s}' index out of range")))?;
        if index == 0 {
            return Err(TypeError::InvalidCommitId(format!(
                "'{s}' index must start at 1"
            )));
        }
        if slug.is_empty()
            || !slug
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(TypeError::InvalidCommitId(format!(
                "'{s}' has an invalid slug"
            )));
        }
        Ok(Self {
            index,
            slug: slug.to_string(),
        })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }
}

impl Ord for CommitId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index
            .cmp(&other.index)
            .then_with(|| self.slug.cmp(&other.slug))
    }
}

impl PartialOrd for CommitId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl TryFrom<String> for CommitId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<CommitId> for String {
    fn from(id: CommitId) -> Self {
        id.to_string()
    }
}

impl std::fmt::Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:03}_{}", self.index, self.slug)
    }
}
