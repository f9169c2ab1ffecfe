//! The per-working-copy session: run pipeline, lifecycle, and the operation
//! façade.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use gitsession_core::{
    Branch, Commit, ErrorKind, LogOptions, ObjectDetails, OperationKind, Ref, SessionConfig, Stash,
};
use gitsession_git::{
    CheckoutOptions, CommitOptions, DiffTarget, FetchOptions, GitError, PullOptions, PushOptions,
    PushTags, RemoteAction, Repository,
};

use crate::error::SessionError;
use crate::events::{EventBus, OperationError, OperationResult, SessionState};
use crate::ledger::OperationLedger;
use crate::observable::Observable;
use crate::retry::{cancellable, RetryPolicy};
use crate::synchronizer::{ModelSnapshot, ModelSource, Synchronizer};

// ---------------------------------------------------------------------------
// 1. Session
// ---------------------------------------------------------------------------

/// Cheap, cloneable handle to one working copy's session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

struct Inner {
    repository: Arc<Repository>,
    source: Arc<dyn ModelSource>,
    config: SessionConfig,
    state: Observable<SessionState>,
    focus: Observable<bool>,
    ledger: OperationLedger,
    events: EventBus,
    limiters: HashMap<OperationKind, Arc<Semaphore>>,
    retry: RetryPolicy,
    synchronizer: Synchronizer,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("root", &self.root())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(repository: Repository, config: SessionConfig) -> Self {
        let repository = Arc::new(repository);
        let source: Arc<dyn ModelSource> = repository.clone();
        Self::with_source(repository, source, config)
    }

    /// Builds a session whose status passes read from `source` instead of the
    /// repository itself.
    pub fn with_source(
        repository: Arc<Repository>,
        source: Arc<dyn ModelSource>,
        config: SessionConfig,
    ) -> Self {
        let limiters = OperationKind::iter()
            .filter(|kind| kind.is_serialized())
            .map(|kind| (kind, Arc::new(Semaphore::new(1))))
            .collect();
        Session {
            inner: Arc::new(Inner {
                repository,
                source,
                retry: RetryPolicy::new(config.retry.clone()),
                config,
                state: Observable::new(SessionState::Idle),
                focus: Observable::new(true),
                ledger: OperationLedger::new(),
                events: EventBus::new(),
                limiters,
                synchronizer: Synchronizer::new(),
            }),
        }
    }

    pub fn root(&self) -> &Path {
        self.inner.repository.root()
    }

    pub fn repository(&self) -> &Repository {
        &self.inner.repository
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn ledger(&self) -> &OperationLedger {
        &self.inner.ledger
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.get()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn is_disposed(&self) -> bool {
        self.state() == SessionState::Disposed
    }

    /// Latest published model.
    pub fn model(&self) -> Arc<ModelSnapshot> {
        self.inner.synchronizer.model()
    }

    pub fn subscribe_model(&self) -> watch::Receiver<Arc<ModelSnapshot>> {
        self.inner.synchronizer.subscribe()
    }

    pub fn is_focused(&self) -> bool {
        self.inner.focus.get()
    }

    /// Host focus signal. Automatic refreshes and fetches wait for focus.
    pub fn set_focused(&self, focused: bool) {
        if self.inner.focus.set(focused) {
            tracing::trace!(root = %self.root().display(), focused, "focus changed");
        }
    }

    /// Moves the session to `Disposed`. Only the first call has any effect.
    pub fn dispose(&self) {
        let changed = self
            .inner
            .state
            .set_if(SessionState::Disposed, |s| *s == SessionState::Idle);
        if changed {
            tracing::info!(root = %self.root().display(), "session disposed");
            self.inner.synchronizer.clear();
            self.inner.events.state_changed(SessionState::Disposed);
        }
    }

    /// Resolves once the session is disposed.
    pub async fn disposed(&self) {
        self.inner
            .state
            .wait_for(|s| *s == SessionState::Disposed)
            .await;
    }

    /// Resolves once no mutating operation is running and the host is focused.
    ///
    /// Both conditions are re-checked after every wake-up since either can
    /// flip back while the other is awaited.
    pub async fn when_idle_and_focused(&self) {
        loop {
            let mut completed = self.inner.events.subscribe_run_completed();
            if !self.inner.ledger.is_idle() {
                let _ = completed.recv().await;
                continue;
            }
            if !self.inner.focus.get() {
                self.inner.focus.wait_for(|focused| *focused).await;
                continue;
            }
            return;
        }
    }

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.is_disposed() {
            return Err(SessionError::Disposed {
                root: self.root().to_path_buf(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// 2. Run pipeline
// ---------------------------------------------------------------------------

/// Ledger registration for one run. Unregisters and reports completion on
/// drop, so an abandoned run still yields exactly one completion event.
struct RunGuard<'a> {
    inner: &'a Inner,
    kind: OperationKind,
    outcome: Option<Option<OperationError>>,
}

impl<'a> RunGuard<'a> {
    fn start(inner: &'a Inner, kind: OperationKind) -> Self {
        inner.ledger.start(kind);
        inner.events.run_started(kind);
        tracing::debug!(%kind, root = %inner.repository.root().display(), "run started");
        RunGuard {
            inner,
            kind,
            outcome: None,
        }
    }

    fn finish(&mut self, error: Option<&GitError>) {
        self.outcome = Some(error.map(|err| OperationError {
            kind: err.kind,
            message: err.to_string(),
        }));
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.inner.ledger.end(self.kind);
        let error = self.outcome.take().unwrap_or_else(|| {
            Some(OperationError {
                kind: Some(ErrorKind::Cancelled),
                message: "operation abandoned".into(),
            })
        });
        match &error {
            None => tracing::debug!(kind = %self.kind, "run completed"),
            Some(err) => tracing::debug!(
                kind = %self.kind,
                error_kind = ?err.kind,
                error = %err.message,
                "run failed",
            ),
        }
        self.inner.events.run_completed(OperationResult {
            operation: self.kind,
            error,
        });
    }
}

impl Session {
    /// Runs `thunk` as an operation of `kind`.
    ///
    /// Serialized kinds queue first-come first-served behind their limiter.
    /// The thunk is retried on lock contention. A successful `Status` or
    /// mutating run refreshes the model before returning.
    pub async fn run<T, F, Fut>(&self, kind: OperationKind, thunk: F) -> Result<T, SessionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GitError>>,
    {
        self.run_inner(kind, None, thunk).await
    }

    /// Like [`Session::run`], with the limiter wait, every attempt, every
    /// backoff sleep and the refresh raced against `token`.
    pub async fn run_cancellable<T, F, Fut>(
        &self,
        kind: OperationKind,
        token: &CancellationToken,
        thunk: F,
    ) -> Result<T, SessionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GitError>>,
    {
        self.run_inner(kind, Some(token), thunk).await
    }

    async fn run_inner<T, F, Fut>(
        &self,
        kind: OperationKind,
        cancel: Option<&CancellationToken>,
        thunk: F,
    ) -> Result<T, SessionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GitError>>,
    {
        self.ensure_live()?;
        let _permit = self.acquire(kind, cancel).await?;
        // Disposal may have happened while queued.
        self.ensure_live()?;

        let mut guard = RunGuard::start(&self.inner, kind);
        let result = self.execute(kind, cancel, thunk).await;
        guard.finish(result.as_ref().err());
        drop(guard);
        result.map_err(SessionError::from)
    }

    async fn acquire(
        &self,
        kind: OperationKind,
        cancel: Option<&CancellationToken>,
    ) -> Result<Option<OwnedSemaphorePermit>, GitError> {
        let Some(limiter) = self.inner.limiters.get(&kind) else {
            return Ok(None);
        };
        let limiter = limiter.clone();
        cancellable(cancel, async move {
            limiter
                .acquire_owned()
                .await
                .map(Some)
                .map_err(|_| GitError::new(format!("{kind} limiter closed")))
        })
        .await
    }

    async fn execute<T, F, Fut>(
        &self,
        kind: OperationKind,
        cancel: Option<&CancellationToken>,
        thunk: F,
    ) -> Result<T, GitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GitError>>,
    {
        let outcome = self.attempt_and_refresh(kind, cancel, thunk).await;
        if let Err(err) = &outcome {
            if err.kind == Some(ErrorKind::NotAGitRepository) {
                self.dispose();
            }
        }
        outcome
    }

    async fn attempt_and_refresh<T, F, Fut>(
        &self,
        kind: OperationKind,
        cancel: Option<&CancellationToken>,
        thunk: F,
    ) -> Result<T, GitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GitError>>,
    {
        let value = self.inner.retry.run(kind, cancel, thunk).await?;
        if kind == OperationKind::Status || !kind.is_read_only() {
            cancellable(cancel, self.synchronize()).await?;
        }
        Ok(value)
    }

    async fn synchronize(&self) -> Result<(), GitError> {
        self.inner
            .synchronizer
            .synchronize(
                self.inner.source.as_ref(),
                &self.inner.config,
                &self.inner.events,
            )
            .await
            .map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// 3. Operation façade
// ---------------------------------------------------------------------------

impl Session {
    /// Refreshes the model.
    pub async fn status(&self) -> Result<Arc<ModelSnapshot>, SessionError> {
        self.run(OperationKind::Status, || async { Ok(()) }).await?;
        Ok(self.model())
    }

    pub async fn status_cancellable(
        &self,
        token: &CancellationToken,
    ) -> Result<Arc<ModelSnapshot>, SessionError> {
        self.run_cancellable(OperationKind::Status, token, || async { Ok(()) })
            .await?;
        Ok(self.model())
    }

    // -- Index and working tree ---------------------------------------------

    pub async fn add(&self, paths: &[PathBuf]) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::Add, move || repo.add(paths)).await
    }

    pub async fn rm(&self, paths: &[PathBuf]) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::Remove, move || repo.rm(paths)).await
    }

    /// Writes `data` as the staged contents of `path`.
    pub async fn stage(&self, path: &Path, data: &str) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::Stage, move || repo.stage(path, data))
            .await?;
        self.inner.events.original_resource_changed(path.to_path_buf());
        Ok(())
    }

    pub async fn apply(&self, patch: &Path, reverse: bool) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::Apply, move || repo.apply(patch, reverse))
            .await
    }

    pub async fn checkout(&self, treeish: &str, paths: &[PathBuf]) -> Result<(), SessionError> {
        let repo = self.repository();
        let options = &CheckoutOptions::default();
        self.run(OperationKind::Checkout, move || {
            repo.checkout(treeish, paths, options)
        })
        .await
    }

    pub async fn checkout_tracking(&self, treeish: &str, detached: bool) -> Result<(), SessionError> {
        let repo = self.repository();
        let options = &CheckoutOptions {
            track: true,
            detached,
        };
        self.run(OperationKind::CheckoutTracking, move || {
            repo.checkout(treeish, &[], options)
        })
        .await
    }

    pub async fn clean(&self, paths: &[PathBuf]) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::Clean, move || repo.clean(paths)).await
    }

    pub async fn revert_files(&self, treeish: &str, paths: &[PathBuf]) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::RevertFiles, move || {
            repo.revert_files(treeish, paths)
        })
        .await
    }

    pub async fn reset(&self, treeish: &str, hard: bool) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::Reset, move || repo.reset(treeish, hard))
            .await
    }

    pub async fn move_path(&self, from: &Path, to: &Path) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::Move, move || repo.move_path(from, to))
            .await
    }

    pub async fn ignore(&self, paths: &[PathBuf]) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::Ignore, move || repo.ignore(paths)).await
    }

    pub async fn check_ignore(
        &self,
        paths: &[PathBuf],
    ) -> Result<std::collections::HashSet<PathBuf>, SessionError> {
        let repo = self.repository();
        self.run(OperationKind::CheckIgnore, move || repo.check_ignore(paths))
            .await
    }

    pub async fn commit(&self, message: &str, options: &CommitOptions) -> Result<(), SessionError> {
        let repo = self.repository();
        let options = &CommitOptions {
            require_user_config: options.require_user_config || self.config().require_user_config,
            ..options.clone()
        };
        self.run(OperationKind::Commit, move || repo.commit(message, options))
            .await
    }

    // -- Branches, tags, history ----------------------------------------------

    pub async fn branch(&self, name: &str, checkout: bool, from: Option<&str>) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::Branch, move || repo.branch(name, checkout, from))
            .await
    }

    pub async fn delete_branch(&self, name: &str, force: bool) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::DeleteBranch, move || {
            repo.delete_branch(name, force)
        })
        .await
    }

    pub async fn rename_branch(&self, name: &str) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::RenameBranch, move || repo.rename_branch(name))
            .await
    }

    pub async fn set_branch_upstream(&self, name: &str, upstream: &str) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::SetBranchUpstream, move || {
            repo.set_branch_upstream(name, upstream)
        })
        .await
    }

    pub async fn delete_ref(&self, refname: &str) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::DeleteRef, move || repo.delete_ref(refname))
            .await
    }

    pub async fn tag(&self, name: &str, message: Option<&str>) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::Tag, move || repo.tag(name, message))
            .await
    }

    pub async fn delete_tag(&self, name: &str) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::DeleteTag, move || repo.delete_tag(name))
            .await
    }

    pub async fn get_branch(&self, name: &str) -> Result<Branch, SessionError> {
        let repo = self.repository();
        self.run(OperationKind::GetBranch, move || repo.get_branch(name))
            .await
    }

    pub async fn get_branches(&self) -> Result<Vec<Ref>, SessionError> {
        let repo = self.repository();
        let sort = self.config().branch_sort_order;
        self.run(OperationKind::GetBranches, move || repo.get_branches(sort))
            .await
    }

    pub async fn find_tracking_branches(&self, upstream: &str) -> Result<Vec<Branch>, SessionError> {
        let repo = self.repository();
        self.run(OperationKind::FindTrackingBranches, move || {
            repo.find_tracking_branches(upstream)
        })
        .await
    }

    pub async fn merge(&self, rev: &str) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::Merge, move || repo.merge(rev)).await
    }

    pub async fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>, SessionError> {
        let repo = self.repository();
        self.run(OperationKind::MergeBase, move || repo.merge_base(a, b))
            .await
    }

    pub async fn cherry_pick(&self, commit: &str) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::CherryPick, move || repo.cherry_pick(commit))
            .await
    }

    pub async fn rebase(&self, onto: &str) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::Rebase, move || repo.rebase(onto)).await
    }

    pub async fn rebase_abort(&self) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::RebaseAbort, move || repo.rebase_abort())
            .await
    }

    pub async fn rebase_continue(&self) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::RebaseContinue, move || repo.rebase_continue())
            .await
    }

    pub async fn log(&self, options: &LogOptions) -> Result<Vec<Commit>, SessionError> {
        let repo = self.repository();
        self.run(OperationKind::Log, move || repo.log(options)).await
    }

    pub async fn log_file(&self, path: &Path, max_entries: Option<u32>) -> Result<Vec<Commit>, SessionError> {
        let repo = self.repository();
        self.run(OperationKind::LogFile, move || repo.log_file(path, max_entries))
            .await
    }

    pub async fn get_commit_template(&self) -> Result<String, SessionError> {
        let repo = self.repository();
        self.run(OperationKind::GetCommitTemplate, move || {
            repo.get_commit_template()
        })
        .await
    }

    // -- Content reads --------------------------------------------------------

    pub async fn blame(&self, path: &Path) -> Result<String, SessionError> {
        let repo = self.repository();
        self.run(OperationKind::Blame, move || repo.blame(path)).await
    }

    pub async fn diff(&self, target: &DiffTarget) -> Result<String, SessionError> {
        let repo = self.repository();
        self.run(OperationKind::Diff, move || repo.diff(target)).await
    }

    /// Working tree against the index, for one path or everything.
    pub async fn diff_working_tree(&self, path: Option<&str>) -> Result<String, SessionError> {
        self.diff(&DiffTarget::WorkingTree {
            path: path.map(str::to_owned),
        })
        .await
    }

    /// Index against HEAD, for one path or everything.
    pub async fn diff_index(&self, path: Option<&str>) -> Result<String, SessionError> {
        self.diff(&DiffTarget::Index {
            path: path.map(str::to_owned),
        })
        .await
    }

    pub async fn diff_with(&self, rev: &str, path: Option<&str>) -> Result<String, SessionError> {
        self.diff(&DiffTarget::WithRef {
            rev: rev.to_owned(),
            path: path.map(str::to_owned),
        })
        .await
    }

    pub async fn diff_between(&self, from: &str, to: &str, path: Option<&str>) -> Result<String, SessionError> {
        self.diff(&DiffTarget::Between {
            from: from.to_owned(),
            to: to.to_owned(),
            path: path.map(str::to_owned),
        })
        .await
    }

    pub async fn show(&self, rev: &str, path: &Path) -> Result<String, SessionError> {
        let repo = self.repository();
        self.run(OperationKind::Show, move || repo.show(rev, path)).await
    }

    pub async fn get_object_details(&self, treeish: &str, path: &Path) -> Result<ObjectDetails, SessionError> {
        let repo = self.repository();
        self.run(OperationKind::GetObjectDetails, move || {
            repo.get_object_details(treeish, path)
        })
        .await
    }

    pub async fn hash_object(&self, data: &str) -> Result<String, SessionError> {
        let repo = self.repository();
        self.run(OperationKind::HashObject, move || repo.hash_object(data))
            .await
    }

    pub async fn set_config(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::Config, move || repo.set_config(key, value))
            .await
    }

    // -- Stashes ---------------------------------------------------------------

    pub async fn create_stash(&self, message: Option<&str>, include_untracked: bool) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::StashPush, move || {
            repo.stash(message, include_untracked)
        })
        .await
    }

    pub async fn apply_stash(&self, index: Option<u32>) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::StashApply, move || repo.apply_stash(index))
            .await
    }

    pub async fn pop_stash(&self, index: Option<u32>) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::StashPop, move || repo.pop_stash(index))
            .await
    }

    pub async fn drop_stash(&self, index: Option<u32>) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::StashDrop, move || repo.drop_stash(index))
            .await
    }

    pub async fn get_stashes(&self) -> Result<Vec<Stash>, SessionError> {
        let repo = self.repository();
        self.run(OperationKind::GetStashes, move || repo.get_stashes())
            .await
    }

    // -- Remotes ----------------------------------------------------------------

    /// Fetch, classified as `FetchAll`, `FetchPrune` or `Fetch` from the
    /// options. A token in the options also cancels the run.
    pub async fn fetch(&self, options: &FetchOptions) -> Result<(), SessionError> {
        let kind = if options.all {
            OperationKind::FetchAll
        } else if options.prune {
            OperationKind::FetchPrune
        } else {
            OperationKind::Fetch
        };
        self.fetch_as(kind, options).await
    }

    pub async fn fetch_all(&self, cancel: Option<CancellationToken>) -> Result<(), SessionError> {
        let options = FetchOptions {
            all: true,
            prune: self.config().prune_on_fetch,
            cancel,
            ..FetchOptions::default()
        };
        self.fetch_as(OperationKind::FetchAll, &options).await
    }

    pub async fn fetch_prune(&self, cancel: Option<CancellationToken>) -> Result<(), SessionError> {
        let options = FetchOptions {
            prune: true,
            cancel,
            ..FetchOptions::default()
        };
        self.fetch_as(OperationKind::FetchPrune, &options).await
    }

    /// Fetches the default remote. `silent` marks it as a background fetch.
    pub async fn fetch_default(&self, silent: bool, cancel: Option<CancellationToken>) -> Result<(), SessionError> {
        let options = FetchOptions {
            prune: self.config().prune_on_fetch,
            silent,
            cancel,
            ..FetchOptions::default()
        };
        self.fetch_as(OperationKind::FetchDefault, &options).await
    }

    async fn fetch_as(&self, kind: OperationKind, options: &FetchOptions) -> Result<(), SessionError> {
        let repo = self.repository();
        let thunk = move || repo.fetch(options);
        match &options.cancel {
            Some(token) => self.run_cancellable(kind, token, thunk).await,
            None => self.run(kind, thunk).await,
        }
    }

    pub async fn pull(&self, options: &PullOptions) -> Result<(), SessionError> {
        let repo = self.repository();
        let thunk = move || repo.pull(options);
        match &options.cancel {
            Some(token) => self.run_cancellable(OperationKind::Pull, token, thunk).await,
            None => self.run(OperationKind::Pull, thunk).await,
        }
    }

    pub async fn push(&self, options: &PushOptions) -> Result<(), SessionError> {
        let repo = self.repository();
        let thunk = move || repo.push(options);
        match &options.cancel {
            Some(token) => self.run_cancellable(OperationKind::Push, token, thunk).await,
            None => self.run(OperationKind::Push, thunk).await,
        }
    }

    pub async fn push_follow_tags(&self, remote: Option<&str>) -> Result<(), SessionError> {
        self.push(&PushOptions {
            remote: remote.map(str::to_owned),
            tags: PushTags::Follow,
            ..PushOptions::default()
        })
        .await
    }

    pub async fn push_tags(&self, remote: Option<&str>) -> Result<(), SessionError> {
        self.push(&PushOptions {
            remote: remote.map(str::to_owned),
            tags: PushTags::All,
            ..PushOptions::default()
        })
        .await
    }

    /// Pushes `name` to `remote`, optionally setting it as upstream.
    pub async fn push_to(&self, remote: &str, name: &str, set_upstream: bool) -> Result<(), SessionError> {
        self.push(&PushOptions {
            remote: Some(remote.to_owned()),
            name: Some(name.to_owned()),
            set_upstream,
            ..PushOptions::default()
        })
        .await
    }

    /// Pull then push, as one `Sync` run.
    pub async fn sync(&self, pull: &PullOptions, push: &PushOptions) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::Sync, move || async move {
            repo.pull(pull).await?;
            repo.push(push).await
        })
        .await
    }

    pub async fn remote(&self, action: RemoteAction, name: &str, arg: Option<&str>) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::Remote, move || repo.remote(action, name, arg))
            .await
    }

    pub async fn add_remote(&self, name: &str, url: &str) -> Result<(), SessionError> {
        self.remote(RemoteAction::Add, name, Some(url)).await
    }

    pub async fn remove_remote(&self, name: &str) -> Result<(), SessionError> {
        self.remote(RemoteAction::Remove, name, None).await
    }

    pub async fn rename_remote(&self, name: &str, new_name: &str) -> Result<(), SessionError> {
        self.remote(RemoteAction::Rename, name, Some(new_name)).await
    }

    pub async fn submodule_update(&self, paths: &[PathBuf]) -> Result<(), SessionError> {
        let repo = self.repository();
        self.run(OperationKind::SubmoduleUpdate, move || {
            repo.submodule_update(paths)
        })
        .await
    }
}
