//! core
//!
//! Core domain types, storage and codecs for pit.
//!
//! # Modules
//!
//! - [`types`] - Strong types: Identity, RepoName, RelPath, CommitId, etc.
//! - [`diff`] - File manifests and the Change Detector
//! - [`paths`] - Centralized path routing for server and client storage
//! - [`ops`] - Exclusive locking
//! - [`snapshot`] - Commit metadata schema and the Snapshot Store
//! - [`archive`] - Zip Archive Codec
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid names and paths from reaching disk
//! - Schemas are strict and self-describing
//! - Writes are atomic: temp file or directory, then rename

pub mod archive;
pub mod config;
pub mod diff;
pub mod ops;
pub mod paths;
pub mod snapshot;
pub mod types;
