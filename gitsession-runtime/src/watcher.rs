//! Filesystem watchers for the working tree and its metadata directory.

use std::fs;
use std::path::{Component, Path, PathBuf};

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use sha2::{Digest, Sha256};
use tokio::sync::{broadcast, mpsc};

use crate::autorefresh::AutoRefresh;
use crate::error::{io_err, SessionError};
use crate::session::Session;

/// Metadata entries whose changes matter to the model.
const METADATA_FILES: &[&str] = &["HEAD", "index", "COMMIT_EDITMSG", "config"];
const METADATA_DIRS: &[&str] = &["refs/heads", "refs/remotes", "refs/tags"];

/// While any of these exists, the tool is mid-operation and events are held.
pub const LOCK_FILES: &[&str] = &["index.lock", "MERGE_HEAD", "REVERT_HEAD", "CHERRY_PICK_HEAD"];

// ---------------------------------------------------------------------------
// 1. Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    WorkingTree(PathBuf),
    /// A relevant entry inside the metadata directory; carries the path
    /// relative to it.
    Metadata(PathBuf),
}

/// Sorts a changed path into working-tree or metadata, or drops it.
pub fn classify_path(root: &Path, dot_git: &Path, path: &Path) -> Option<Change> {
    if let Ok(rel) = path.strip_prefix(dot_git) {
        return is_metadata_relevant(rel).then(|| Change::Metadata(rel.to_path_buf()));
    }
    if path.starts_with(root) && !is_nested_metadata(root, path) {
        return Some(Change::WorkingTree(path.to_path_buf()));
    }
    None
}

fn is_metadata_relevant(rel: &Path) -> bool {
    METADATA_FILES.iter().any(|f| rel == Path::new(f))
        || METADATA_DIRS.iter().any(|d| rel.starts_with(d))
}

/// Paths under a `.git` component anywhere below the root (submodules,
/// nested repositories).
fn is_nested_metadata(root: &Path, path: &Path) -> bool {
    path.strip_prefix(root)
        .map(|rel| {
            rel.components()
                .any(|c| matches!(c, Component::Normal(name) if name == ".git"))
        })
        .unwrap_or(false)
}

fn is_important(rel: &Path) -> bool {
    rel == Path::new("HEAD") || rel.starts_with("refs")
}

fn is_relevant_event_kind(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

// ---------------------------------------------------------------------------
// 2. Lock suppression and index digest
// ---------------------------------------------------------------------------

/// Holds metadata events while the tool has a lock file in place.
///
/// The first held event is kept, plus any for HEAD or refs. All held events
/// are released together with the first event seen once no lock remains.
#[derive(Debug, Default)]
pub struct LockGate {
    held: Vec<PathBuf>,
}

impl LockGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers `rel`; returns the events to deliver now.
    pub fn offer(&mut self, rel: &Path, locked: bool) -> Vec<PathBuf> {
        if locked {
            if (self.held.is_empty() || is_important(rel)) && !self.held.iter().any(|p| p == rel) {
                tracing::trace!(path = %rel.display(), "metadata event held by lock");
                self.held.push(rel.to_path_buf());
            }
            return Vec::new();
        }
        let mut released = std::mem::take(&mut self.held);
        if !released.is_empty() {
            tracing::trace!(count = released.len(), "lock gone, releasing held events");
        }
        if !released.iter().any(|p| p == rel) {
            released.push(rel.to_path_buf());
        }
        released
    }

    pub fn is_holding(&self) -> bool {
        !self.held.is_empty()
    }
}

/// SHA-256 of the last seen index contents.
#[derive(Debug, Default)]
pub struct IndexDigest {
    last: Option<String>,
}

impl IndexDigest {
    /// Records `contents`; `true` if they differ from the previous call.
    pub fn update(&mut self, contents: &[u8]) -> bool {
        let mut hasher = Sha256::new();
        hasher.update(contents);
        let digest = hex::encode(hasher.finalize());
        if self.last.as_deref() == Some(digest.as_str()) {
            return false;
        }
        self.last = Some(digest);
        true
    }
}

fn is_locked(dot_git: &Path) -> bool {
    LOCK_FILES.iter().any(|name| dot_git.join(name).exists())
}

// ---------------------------------------------------------------------------
// 3. Watch task
// ---------------------------------------------------------------------------

/// Watches `session`'s working copy until `shutdown` fires or the session is
/// disposed, feeding changes to an [`AutoRefresh`] and metadata changes to
/// the repository-changed event.
pub async fn watch_repository(
    session: Session,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), SessionError> {
    // Canonicalize so that event paths (which arrive as real paths) match the
    // `starts_with` checks.
    let root = canonical(session.root())?;
    let dot_git = canonical(session.repository().dot_git())?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher: RecommendedWatcher = recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })?;
    watcher.watch(&root, RecursiveMode::Recursive)?;
    if !dot_git.starts_with(&root) {
        watcher.watch(&dot_git, RecursiveMode::Recursive)?;
    }
    tracing::info!(root = %root.display(), dot_git = %dot_git.display(), "watching repository");

    let refresh = AutoRefresh::new(session.clone());
    let mut gate = LockGate::new();
    let mut index = IndexDigest::default();
    if let Ok(contents) = tokio::fs::read(dot_git.join("index")).await {
        index.update(&contents);
    }

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = session.disposed() => {
                tracing::debug!(root = %root.display(), "session disposed, watcher stopping");
                break;
            }
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(error = %err, "watcher event error");
                        continue;
                    }
                };
                if !is_relevant_event_kind(&event.kind) {
                    continue;
                }

                for path in event.paths {
                    match classify_path(&root, &dot_git, &path) {
                        None => {}
                        Some(Change::WorkingTree(path)) => {
                            if path.is_dir() {
                                continue;
                            }
                            tracing::trace!(path = %path.display(), "working tree changed");
                            refresh.on_change(&path);
                        }
                        Some(Change::Metadata(rel)) => {
                            if rel == Path::new("index") {
                                match tokio::fs::read(dot_git.join("index")).await {
                                    Ok(contents) if !index.update(&contents) => {
                                        tracing::trace!("index touched without content change");
                                        continue;
                                    }
                                    _ => {}
                                }
                            }
                            for released in gate.offer(&rel, is_locked(&dot_git)) {
                                let full = dot_git.join(&released);
                                tracing::trace!(path = %full.display(), "metadata changed");
                                session.events().repository_changed(full.clone());
                                refresh.on_change(&full);
                            }
                        }
                    }
                }
            }
        }
    }

    drop(watcher);
    refresh.cancel();
    Ok(())
}

fn canonical(path: &Path) -> Result<PathBuf, SessionError> {
    fs::canonicalize(path).map_err(|e| io_err(path, e))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tempfile::TempDir;

    use crate::testing::{fake_session, test_config, FakeSource};

    use super::*;

    #[test]
    fn classifies_working_tree_and_metadata() {
        let root = Path::new("/repo");
        let dot_git = Path::new("/repo/.git");
        assert_eq!(
            classify_path(root, dot_git, Path::new("/repo/src/lib.rs")),
            Some(Change::WorkingTree(PathBuf::from("/repo/src/lib.rs")))
        );
        assert_eq!(
            classify_path(root, dot_git, Path::new("/repo/.git/refs/heads/main")),
            Some(Change::Metadata(PathBuf::from("refs/heads/main")))
        );
        assert_eq!(
            classify_path(root, dot_git, Path::new("/repo/.git/HEAD")),
            Some(Change::Metadata(PathBuf::from("HEAD")))
        );
        assert_eq!(classify_path(root, dot_git, Path::new("/repo/.git/objects/ab/cd")), None);
        assert_eq!(classify_path(root, dot_git, Path::new("/repo/.git/index.lock")), None);
        assert_eq!(classify_path(root, dot_git, Path::new("/repo/vendor/.git/HEAD")), None);
        assert_eq!(classify_path(root, dot_git, Path::new("/elsewhere/file")), None);
    }

    #[test]
    fn external_metadata_directory_is_recognized() {
        let root = Path::new("/work/tree");
        let dot_git = Path::new("/repos/tree.git/worktrees/tree");
        assert_eq!(
            classify_path(root, dot_git, Path::new("/repos/tree.git/worktrees/tree/index")),
            Some(Change::Metadata(PathBuf::from("index")))
        );
    }

    #[test]
    fn gate_holds_first_and_important_events_until_unlocked() {
        let mut gate = LockGate::new();
        assert!(gate.offer(Path::new("index"), true).is_empty());
        assert!(gate.offer(Path::new("config"), true).is_empty());
        assert!(gate.offer(Path::new("refs/heads/main"), true).is_empty());
        assert!(gate.offer(Path::new("index"), true).is_empty());
        assert!(gate.is_holding());

        let released = gate.offer(Path::new("HEAD"), false);
        assert_eq!(
            released,
            vec![
                PathBuf::from("index"),
                PathBuf::from("refs/heads/main"),
                PathBuf::from("HEAD"),
            ]
        );
        assert!(!gate.is_holding());
        assert_eq!(gate.offer(Path::new("HEAD"), false), vec![PathBuf::from("HEAD")]);
    }

    #[test]
    fn index_digest_ignores_identical_rewrites() {
        let mut digest = IndexDigest::default();
        assert!(digest.update(b"DIRC one"));
        assert!(!digest.update(b"DIRC one"));
        assert!(digest.update(b"DIRC two"));
    }

    #[test]
    fn lock_files_are_detected() {
        let dir = TempDir::new().expect("tempdir");
        assert!(!is_locked(dir.path()));
        fs::write(dir.path().join("MERGE_HEAD"), "abc\n").expect("write");
        assert!(is_locked(dir.path()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn file_write_triggers_a_refresh() {
        let dir = TempDir::new().expect("tempdir");
        let root = fs::canonicalize(dir.path()).expect("canonical");
        fs::create_dir_all(root.join(".git")).expect("dot git");

        let source = Arc::new(FakeSource {
            root: root.clone(),
            status_delay: Duration::ZERO,
            ..FakeSource::new()
        });
        let config = gitsession_core::SessionConfig {
            status_debounce_ms: 50,
            settle_delay_ms: 0,
            ..test_config()
        };
        let session = fake_session(source.clone(), config);
        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let task = tokio::spawn(watch_repository(session, shutdown_tx.subscribe()));

        // Give the backend a moment to register before writing.
        tokio::time::sleep(Duration::from_millis(200)).await;
        fs::write(root.join("a.txt"), "hello").expect("write");

        let refreshed = tokio::time::timeout(Duration::from_secs(10), async {
            while source.calls() == 0 {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await;
        assert!(refreshed.is_ok(), "no refresh after a working-tree write");

        let _ = shutdown_tx.send(());
        task.await.expect("join").expect("watcher");
    }
}
