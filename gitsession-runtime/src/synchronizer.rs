//! Status synchronizer: one consistent model snapshot per pass.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{watch, Mutex};

use gitsession_core::status::{partition, PartitionOptions};
use gitsession_core::{
    head_short_name, Branch, BranchSortOrder, Commit, Ref, Remote, ResourceGroups, SessionConfig,
    Submodule,
};
use gitsession_git::{GitError, Repository, StatusListing};

use crate::events::EventBus;
use crate::observable::Observable;

/// The reads a status pass needs from a working copy.
#[async_trait]
pub trait ModelSource: Send + Sync {
    fn root(&self) -> &Path;
    async fn status(&self, ignore_submodules: bool, limit: usize) -> Result<StatusListing, GitError>;
    async fn untracked(&self) -> Result<Vec<String>, GitError>;
    async fn head(&self) -> Result<Branch, GitError>;
    async fn refs(&self, sort: BranchSortOrder) -> Result<Vec<Ref>, GitError>;
    async fn remotes(&self) -> Result<Vec<Remote>, GitError>;
    async fn submodules(&self) -> Result<Vec<Submodule>, GitError>;
    async fn rebase_commit(&self) -> Result<Option<Commit>, GitError>;
}

#[async_trait]
impl ModelSource for Repository {
    fn root(&self) -> &Path {
        Repository::root(self)
    }

    async fn status(&self, ignore_submodules: bool, limit: usize) -> Result<StatusListing, GitError> {
        Repository::status(self, ignore_submodules, limit, None).await
    }

    async fn untracked(&self) -> Result<Vec<String>, GitError> {
        Repository::untracked(self, None).await
    }

    async fn head(&self) -> Result<Branch, GitError> {
        self.get_head().await
    }

    async fn refs(&self, sort: BranchSortOrder) -> Result<Vec<Ref>, GitError> {
        self.get_refs(sort).await
    }

    async fn remotes(&self) -> Result<Vec<Remote>, GitError> {
        self.get_remotes().await
    }

    async fn submodules(&self) -> Result<Vec<Submodule>, GitError> {
        self.get_submodules().await
    }

    async fn rebase_commit(&self) -> Result<Option<Commit>, GitError> {
        self.get_rebase_commit().await
    }
}

/// Everything a status pass observed, published as one value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelSnapshot {
    pub head: Option<Branch>,
    /// Branch name, else a tag at HEAD, else the abbreviated commit.
    pub head_label: Option<String>,
    pub refs: Vec<Ref>,
    pub remotes: Vec<Remote>,
    pub submodules: Vec<Submodule>,
    pub rebase_commit: Option<Commit>,
    pub groups: ResourceGroups,
    pub count: usize,
    pub did_hit_limit: bool,
}

/// Owns the published model. Passes are serialized by an internal lock so
/// two overlapping refreshes never interleave their publication.
#[derive(Debug)]
pub struct Synchronizer {
    lock: Mutex<()>,
    model: Observable<Arc<ModelSnapshot>>,
}

impl Default for Synchronizer {
    fn default() -> Self {
        Synchronizer {
            lock: Mutex::new(()),
            model: Observable::new(Arc::new(ModelSnapshot::default())),
        }
    }
}

impl Synchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(&self) -> Arc<ModelSnapshot> {
        self.model.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ModelSnapshot>> {
        self.model.subscribe()
    }

    /// Runs one pass against `source` and publishes the result.
    pub async fn synchronize(
        &self,
        source: &dyn ModelSource,
        config: &SessionConfig,
        events: &EventBus,
    ) -> Result<Arc<ModelSnapshot>, GitError> {
        let _pass = self.lock.lock().await;

        let (listing, untracked, head, refs, remotes, submodules, rebase_commit) = tokio::try_join!(
            source.status(config.ignore_submodules, config.status_limit),
            source.untracked(),
            async {
                // An unborn branch has no resolvable HEAD; that is not a failure.
                Ok::<_, GitError>(source.head().await.ok())
            },
            source.refs(config.branch_sort_order),
            source.remotes(),
            source.submodules(),
            source.rebase_commit(),
        )?;

        let excluded_paths: HashSet<String> = if config.ignore_submodules {
            submodules.iter().map(|s| s.path.clone()).collect()
        } else {
            HashSet::new()
        };
        let groups = partition(
            source.root(),
            &listing.entries,
            &untracked,
            &PartitionOptions { excluded_paths },
        );
        let head_label = head.as_ref().and_then(|h| head_short_name(h, &refs));

        let snapshot = Arc::new(ModelSnapshot {
            count: groups.count(config.count_badge),
            head,
            head_label,
            refs,
            remotes,
            submodules,
            rebase_commit,
            groups,
            did_hit_limit: listing.did_hit_limit,
        });

        tracing::debug!(
            root = %source.root().display(),
            merge = snapshot.groups.merge.len(),
            staged = snapshot.groups.staged.len(),
            tracked = snapshot.groups.tracked.len(),
            untracked = snapshot.groups.untracked.len(),
            did_hit_limit = snapshot.did_hit_limit,
            "status synchronized",
        );
        if snapshot.did_hit_limit {
            tracing::warn!(
                root = %source.root().display(),
                limit = config.status_limit,
                "too many changes, automatic refresh disabled for this repository",
            );
        }

        self.model.set(snapshot.clone());
        events.status_changed();
        Ok(snapshot)
    }

    /// Drops the published model back to empty.
    pub fn clear(&self) {
        self.model.set(Arc::new(ModelSnapshot::default()));
    }
}
