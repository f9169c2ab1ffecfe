//! Multi-repository model: one session per discovered working copy.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{broadcast, RwLock};

use gitsession_core::SessionConfig;
use gitsession_git::{discovery, Git};

use crate::error::SessionError;
use crate::scheduler::{Action, Debouncer};
use crate::session::Session;
use crate::watcher::watch_repository;

/// Sessions keyed by working-copy root.
pub type SessionMap = HashMap<PathBuf, Session>;

/// Opens, tracks and drops sessions for the working copies under a set of
/// workspace folders.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    git: Arc<Git>,
    config: SessionConfig,
    watch: bool,
    sessions: RwLock<SessionMap>,
    folders: Mutex<Vec<PathBuf>>,
    opened: broadcast::Sender<PathBuf>,
    closed: broadcast::Sender<PathBuf>,
    shutdown: broadcast::Sender<()>,
    scan: Debouncer,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("watch", &self.inner.watch)
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Creates an empty registry. With `watch`, every opened session gets
    /// filesystem watchers and auto-refresh. Must be called inside a Tokio
    /// runtime.
    pub fn new(git: Arc<Git>, config: SessionConfig, watch: bool) -> Self {
        let window = config.discovery_debounce();
        let inner = Arc::new_cyclic(|weak: &Weak<RegistryInner>| {
            let weak = weak.clone();
            let action: Action = Arc::new(move || {
                let weak = weak.clone();
                Box::pin(async move {
                    if let Some(inner) = weak.upgrade() {
                        Registry { inner }.scan_workspace().await;
                    }
                })
            });
            RegistryInner {
                git,
                config,
                watch,
                sessions: RwLock::new(SessionMap::new()),
                folders: Mutex::new(Vec::new()),
                opened: broadcast::channel(64).0,
                closed: broadcast::channel(64).0,
                shutdown: broadcast::channel(16).0,
                scan: Debouncer::new(window, action),
            }
        });
        Registry { inner }
    }

    pub fn subscribe_opened(&self) -> broadcast::Receiver<PathBuf> {
        self.inner.opened.subscribe()
    }

    pub fn subscribe_closed(&self) -> broadcast::Receiver<PathBuf> {
        self.inner.closed.subscribe()
    }

    /// Sessions ordered by root.
    pub async fn sessions(&self) -> Vec<Session> {
        let sessions = self.inner.sessions.read().await;
        let mut all: Vec<Session> = sessions.values().cloned().collect();
        all.sort_by(|a, b| a.root().cmp(b.root()));
        all
    }

    /// The session whose root is the deepest ancestor of `path`.
    pub async fn get(&self, path: &Path) -> Option<Session> {
        let sessions = self.inner.sessions.read().await;
        sessions
            .iter()
            .filter(|(root, _)| path.starts_with(root))
            .max_by_key(|(root, _)| root.components().count())
            .map(|(_, session)| session.clone())
    }

    /// Opens the working copy containing `path`.
    ///
    /// Returns `Ok(None)` for ignored roots, and the existing session when the
    /// root is already open.
    pub async fn open(&self, path: &Path) -> Result<Option<Session>, SessionError> {
        let repository = discovery::open(self.inner.git.clone(), path).await?;
        let root = repository.root().to_path_buf();
        if self.is_ignored(&root) {
            tracing::debug!(root = %root.display(), "repository ignored");
            return Ok(None);
        }

        let mut sessions = self.inner.sessions.write().await;
        if let Some(existing) = sessions.get(&root) {
            return Ok(Some(existing.clone()));
        }
        let session = Session::new(repository, self.inner.config.clone());
        sessions.insert(root.clone(), session.clone());
        drop(sessions);

        tracing::info!(root = %root.display(), "session opened");
        self.track(session.clone());
        let _ = self.inner.opened.send(root);
        Ok(Some(session))
    }

    /// Disposes and forgets the session at `root`.
    pub async fn close(&self, root: &Path) -> bool {
        let removed = self.inner.sessions.write().await.remove(root);
        match removed {
            Some(session) => {
                session.dispose();
                tracing::info!(root = %root.display(), "session closed");
                let _ = self.inner.closed.send(root.to_path_buf());
                true
            }
            None => false,
        }
    }

    pub fn set_workspace_folders(&self, folders: Vec<PathBuf>) {
        *self
            .inner
            .folders
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = folders;
    }

    /// Schedules a debounced discovery scan.
    pub fn trigger_scan(&self) {
        self.inner.scan.trigger();
    }

    /// Scans every workspace folder now. Returns how many candidates turned
    /// out to be open working copies.
    pub async fn scan_workspace(&self) -> usize {
        let folders = self
            .inner
            .folders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let candidates = scan_candidates(&folders, &self.inner.config.scan_repositories).await;
        let mut found = 0;
        for candidate in candidates {
            match self.open(&candidate).await {
                Ok(Some(_)) => found += 1,
                Ok(None) => {}
                Err(err) => {
                    tracing::trace!(path = %candidate.display(), error = %err, "not a repository");
                }
            }
        }
        tracing::debug!(folders = folders.len(), found, "workspace scan finished");
        found
    }

    /// Stops every watcher and disposes every session.
    pub async fn shutdown(&self) {
        let _ = self.inner.shutdown.send(());
        let drained: Vec<Session> = self.inner.sessions.write().await.drain().map(|(_, s)| s).collect();
        for session in drained {
            session.dispose();
        }
    }

    fn is_ignored(&self, root: &Path) -> bool {
        let canonical = |p: &Path| std::fs::canonicalize(p).unwrap_or_else(|_| p.to_path_buf());
        let root = canonical(root);
        self.inner
            .config
            .ignored_repositories
            .iter()
            .any(|ignored| canonical(ignored) == root)
    }

    /// Drops the session from the map once it is disposed; runs its watcher
    /// when enabled.
    fn track(&self, session: Session) {
        let registry = Arc::downgrade(&self.inner);
        let mut shutdown_rx = self.inner.shutdown.subscribe();
        let watcher = self
            .inner
            .watch
            .then(|| tokio::spawn(watch_repository(session.clone(), self.inner.shutdown.subscribe())));

        tokio::spawn(async move {
            let disposed = tokio::select! {
                _ = shutdown_rx.recv() => false,
                _ = session.disposed() => true,
            };
            if let (true, Some(inner)) = (disposed, registry.upgrade()) {
                let root = session.root().to_path_buf();
                if inner.sessions.write().await.remove(&root).is_some() {
                    tracing::info!(root = %root.display(), "disposed session dropped");
                    let _ = inner.closed.send(root);
                }
            }
            if let Some(watcher) = watcher {
                match watcher.await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => tracing::warn!(error = %err, "repository watcher failed"),
                    Err(err) => tracing::warn!(error = %err, "repository watcher task join failure"),
                }
            }
        });
    }
}

/// Folders a scan tries to open: each workspace folder, its direct
/// non-hidden sub-folders, and the configured extra paths (relative ones
/// resolved against each folder). Order is kept, duplicates dropped.
pub async fn scan_candidates(folders: &[PathBuf], extra: &[PathBuf]) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    for folder in folders {
        candidates.push(folder.clone());

        if let Ok(mut entries) = tokio::fs::read_dir(folder).await {
            let mut children = Vec::new();
            while let Ok(Some(entry)) = entries.next_entry().await {
                let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
                let hidden = entry.file_name().to_string_lossy().starts_with('.');
                if is_dir && !hidden {
                    children.push(entry.path());
                }
            }
            children.sort();
            candidates.extend(children);
        }

        for path in extra {
            candidates.push(if path.is_absolute() {
                path.clone()
            } else {
                folder.join(path)
            });
        }
    }

    let mut seen = HashSet::new();
    candidates.retain(|p| seen.insert(p.clone()));
    candidates
}
