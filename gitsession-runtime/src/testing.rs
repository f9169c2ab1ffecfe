//! In-memory model source for unit tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use gitsession_core::{
    Branch, BranchSortOrder, Commit, Ref, Remote, RetryConfig, SessionConfig, StatusEntry,
    Submodule,
};
use gitsession_git::{Git, GitError, Repository, StatusListing};

use crate::session::Session;
use crate::synchronizer::ModelSource;

/// Serves whatever status entries it holds and counts overlapping calls.
#[derive(Debug, Default)]
pub(crate) struct FakeSource {
    pub root: PathBuf,
    pub entries: Mutex<Vec<StatusEntry>>,
    pub status_delay: Duration,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub calls: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        FakeSource {
            root: PathBuf::from("/repo"),
            status_delay: Duration::from_millis(20),
            ..FakeSource::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_entries(&self, entries: Vec<StatusEntry>) {
        *self.entries.lock().expect("entries lock") = entries;
    }
}

pub(crate) fn entry(x: char, y: char, path: &str) -> StatusEntry {
    StatusEntry {
        x,
        y,
        path: path.into(),
        original_path: None,
    }
}

#[async_trait]
impl ModelSource for FakeSource {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn status(&self, _: bool, limit: usize) -> Result<StatusListing, GitError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.status_delay.is_zero() {
            tokio::time::sleep(self.status_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let mut entries = self.entries.lock().expect("entries lock").clone();
        let did_hit_limit = entries.len() > limit;
        entries.truncate(limit);
        Ok(StatusListing {
            entries,
            did_hit_limit,
        })
    }

    async fn untracked(&self) -> Result<Vec<String>, GitError> {
        Ok(Vec::new())
    }

    async fn head(&self) -> Result<Branch, GitError> {
        Ok(Branch::named("main"))
    }

    async fn refs(&self, _: BranchSortOrder) -> Result<Vec<Ref>, GitError> {
        Ok(Vec::new())
    }

    async fn remotes(&self) -> Result<Vec<Remote>, GitError> {
        Ok(Vec::new())
    }

    async fn submodules(&self) -> Result<Vec<Submodule>, GitError> {
        Ok(Vec::new())
    }

    async fn rebase_commit(&self) -> Result<Option<Commit>, GitError> {
        Ok(None)
    }
}

pub(crate) fn test_config() -> SessionConfig {
    SessionConfig {
        retry: RetryConfig {
            max_retries: 3,
            base_delay_ms: 10,
        },
        ..SessionConfig::default()
    }
}

/// Session over `source`. The repository's tool path is never spawned.
pub(crate) fn fake_session(source: Arc<FakeSource>, config: SessionConfig) -> Session {
    let git = Arc::new(Git::new("git", "git version 2.43.0"));
    let repository = Arc::new(Repository::new(git, &source.root, source.root.join(".git")));
    Session::with_source(repository, source, config)
}
