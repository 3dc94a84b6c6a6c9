//! remote::mock
//!
//! Fault-injecting remote for deterministic testing.
//!
//! # Design
//!
//! `MockRemote` wraps a real backend (usually a [`LocalRemote`] over a temp
//! store) and records every call. A [`FailOn`] rule can make selected calls
//! fail with a scripted [`SyncError`] before they reach the backend, which
//! is how interrupted pushes are simulated.
//!
//! # Example
//!
//! ```ignore
//! use pit::remote::mock::{FailOn, MockRemote};
//! use pit::engine::SyncError;
//!
//! // Let the first commit through, reject every later one.
//! let remote = MockRemote::wrap(local).fail_on(FailOn::Commit {
//!     skip: 1,
//!     error: SyncError::AuthFailed("revoked".into()),
//! });
//! ```
//!
//! [`LocalRemote`]: super::LocalRemote

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::Remote;
use crate::auth::Credentials;
use crate::core::snapshot::FileEntry;
use crate::core::types::{CommitId, RepoName, RepoRef};
use crate::engine::{CommitSummary, Snapshot, SyncError};

/// Mock remote for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Clone)]
pub struct MockRemote {
    backend: Arc<dyn Remote>,
    inner: Arc<Mutex<MockRemoteInner>>,
}

/// Internal mutable state.
#[derive(Debug, Default)]
struct MockRemoteInner {
    /// Failure rule (for testing error paths).
    fail_on: Option<FailOn>,
    /// Commit calls seen so far, used by `FailOn::Commit`.
    commit_calls: usize,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail create_repository with the given error.
    Create(SyncError),
    /// Pass the first `skip` commit calls through, fail the rest.
    Commit { skip: usize, error: SyncError },
    /// Fail clone_repository with the given error.
    Clone(SyncError),
    /// Fail pull with the given error.
    Pull(SyncError),
    /// Fail list_repositories with the given error.
    List(SyncError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    Create {
        name: String,
    },
    Commit {
        repo: String,
        message: String,
        paths: Vec<String>,
    },
    Clone {
        repo: String,
    },
    Pull {
        repo: String,
        id: Option<String>,
    },
    List,
    Log {
        repo: String,
    },
}

impl MockRemote {
    /// Wrap a backend remote.
    pub fn wrap(backend: impl Remote + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
            inner: Arc::new(Mutex::new(MockRemoteInner::default())),
        }
    }

    /// Configure the mock to fail on a specific operation.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.set_fail_on(fail_on);
        self
    }

    /// Replace the failure rule on a shared mock.
    pub fn set_fail_on(&self, fail_on: FailOn) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_on = Some(fail_on);
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_on = None;
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        let inner = self.inner.lock().unwrap();
        inner.operations.clone()
    }

    /// Recorded commit operations only.
    pub fn commits(&self) -> Vec<MockOperation> {
        self.operations()
            .into_iter()
            .filter(|op| matches!(op, MockOperation::Commit { .. }))
            .collect()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.clear();
    }

    /// Record an operation.
    fn record(&self, op: MockOperation) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(op);
    }

    /// Check if we should fail and return the error if so.
    fn check_fail(&self, expected: &str) -> Option<SyncError> {
        let mut inner = self.inner.lock().unwrap();
        if expected == "commit" {
            inner.commit_calls += 1;
        }
        let calls = inner.commit_calls;
        match &inner.fail_on {
            Some(FailOn::Create(e)) if expected == "create" => Some(e.clone()),
            Some(FailOn::Commit { skip, error }) if expected == "commit" && calls > *skip => {
                Some(error.clone())
            }
            Some(FailOn::Clone(e)) if expected == "clone" => Some(e.clone()),
            Some(FailOn::Pull(e)) if expected == "pull" => Some(e.clone()),
            Some(FailOn::List(e)) if expected == "list" => Some(e.clone()),
            _ => None,
        }
    }
}

#[async_trait]
impl Remote for MockRemote {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_repository(
        &self,
        credentials: &Credentials,
        name: &RepoName,
    ) -> Result<RepoRef, SyncError> {
        self.record(MockOperation::Create {
            name: name.to_string(),
        });
        if let Some(err) = self.check_fail("create") {
            return Err(err);
        }
        self.backend.create_repository(credentials, name).await
    }

    async fn commit(
        &self,
        credentials: &Credentials,
        repo: &RepoRef,
        message: &str,
        files: Vec<FileEntry>,
    ) -> Result<CommitId, SyncError> {
        self.record(MockOperation::Commit {
            repo: repo.to_string(),
            message: message.to_string(),
            paths: files.iter().map(|f| f.path.to_string()).collect(),
        });
        if let Some(err) = self.check_fail("commit") {
            return Err(err);
        }
        self.backend.commit(credentials, repo, message, files).await
    }

    async fn clone_repository(
        &self,
        credentials: &Credentials,
        repo: &RepoRef,
    ) -> Result<Snapshot, SyncError> {
        self.record(MockOperation::Clone {
            repo: repo.to_string(),
        });
        if let Some(err) = self.check_fail("clone") {
            return Err(err);
        }
        self.backend.clone_repository(credentials, repo).await
    }

    async fn pull(
        &self,
        credentials: &Credentials,
        repo: &RepoRef,
        id: Option<&str>,
    ) -> Result<Snapshot, SyncError> {
        self.record(MockOperation::Pull {
            repo: repo.to_string(),
            id: id.map(str::to_string),
        });
        if let Some(err) = self.check_fail("pull") {
            return Err(err);
        }
        self.backend.pull(credentials, repo, id).await
    }

    async fn list_repositories(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<RepoName>, SyncError> {
        self.record(MockOperation::List);
        if let Some(err) = self.check_fail("list") {
            return Err(err);
        }
        self.backend.list_repositories(credentials).await
    }

    async fn log(
        &self,
        credentials: &Credentials,
        repo: &RepoRef,
    ) -> Result<Vec<CommitSummary>, SyncError> {
        self.record(MockOperation::Log {
            repo: repo.to_string(),
        });
        self.backend.log(credentials, repo).await
    }
}
