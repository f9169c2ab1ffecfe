//! Session pipeline against a real scratch working copy.
//!
//! Every test returns early when `git` is not on `PATH`.

use std::path::Path;
use std::sync::Arc;

use gitsession_core::{
    ErrorKind, FileStatus, LogOptions, OperationKind, ResourceGroupKind, SessionConfig,
};
use gitsession_git::{discovery, CommitOptions, ExecOptions, Git};
use gitsession_runtime::{Session, SessionError, SessionState};
use tempfile::TempDir;

async fn scratch() -> Option<(TempDir, Session)> {
    let config = SessionConfig::default();
    let Ok(git) = Git::find(&config).await else {
        eprintln!("git not on PATH; skipping");
        return None;
    };
    let dir = TempDir::new().expect("tempdir");
    let opts = ExecOptions::in_dir(dir.path());
    git.exec(["init", "-q", "-b", "main"], &opts).await.ok()?;
    git.exec(["config", "user.name", "Test"], &opts).await.ok()?;
    git.exec(["config", "user.email", "test@example.com"], &opts).await.ok()?;
    git.exec(["config", "commit.gpgsign", "false"], &opts).await.ok()?;
    let repository = discovery::open(Arc::new(git), dir.path()).await.expect("open");
    Some((dir, Session::new(repository, config)))
}

fn write(root: &Path, name: &str, body: &str) {
    std::fs::write(root.join(name), body).expect("write");
}

async fn committed(session: &Session, name: &str) {
    write(session.root(), name, "one\n");
    session.add(&[]).await.expect("add");
    session
        .commit("initial", &CommitOptions::default())
        .await
        .expect("commit");
}

#[tokio::test]
async fn add_alongside_log_moves_file_to_staged() {
    let Some((_dir, session)) = scratch().await else { return };
    committed(&session, "a.txt").await;
    write(session.root(), "a.txt", "two\n");

    let model = session.status().await.expect("status");
    let a = session.root().join("a.txt");
    let resource = model.groups.find(&a).expect("a.txt listed");
    assert_eq!(resource.group, ResourceGroupKind::Tracked);
    assert_eq!(resource.status, FileStatus::Modified);

    let mut status_events = session.events().subscribe_status();
    let log_options = LogOptions::default();
    let paths = [a.clone()];
    let (added, log) = tokio::join!(session.add(&paths), session.log(&log_options));
    added.expect("add");
    assert_eq!(log.expect("log").len(), 1);

    assert!(status_events.try_recv().is_ok(), "add refreshed the model");
    assert!(status_events.try_recv().is_err(), "exactly one refresh");

    let model = session.model();
    let resource = model.groups.find(&a).expect("a.txt listed");
    assert_eq!(resource.group, ResourceGroupKind::Staged);
    assert_eq!(resource.status, FileStatus::IndexModified);
    assert!(model.groups.tracked.iter().all(|r| r.path != a));
    assert_eq!(model.head_label.as_deref(), Some("main"));
}

#[tokio::test]
async fn untracked_and_conflict_free_counts() {
    let Some((_dir, session)) = scratch().await else { return };
    committed(&session, "base.txt").await;
    write(session.root(), "new.txt", "fresh\n");

    let model = session.status().await.expect("status");
    assert_eq!(model.groups.untracked.len(), 1);
    assert_eq!(model.groups.untracked[0].status, FileStatus::Untracked);
    assert_eq!(model.count, 1);
    assert!(model.groups.merge.is_empty());
}

#[tokio::test]
async fn branch_collision_is_classified() {
    let Some((_dir, session)) = scratch().await else { return };
    committed(&session, "a.txt").await;
    session.branch("dev", false, None).await.expect("branch");
    let err = session
        .branch("dev", false, None)
        .await
        .expect_err("duplicate");
    assert_eq!(err.kind(), Some(ErrorKind::BranchAlreadyExists));
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn removed_repository_disposes_the_session() {
    let Some((_dir, session)) = scratch().await else { return };
    committed(&session, "a.txt").await;
    let mut completed = session.events().subscribe_run_completed();

    std::fs::remove_dir_all(session.repository().dot_git()).expect("remove .git");
    let err = session.status().await.expect_err("gone");
    assert_eq!(err.kind(), Some(ErrorKind::NotAGitRepository));
    assert_eq!(session.state(), SessionState::Disposed);

    let result = completed.recv().await.expect("completion");
    assert_eq!(result.operation, OperationKind::Status);
    assert_eq!(result.error_kind(), Some(ErrorKind::NotAGitRepository));

    let again = session.log(&LogOptions::default()).await;
    assert!(matches!(again, Err(SessionError::Disposed { .. })));
    assert!(completed.try_recv().is_err(), "rejected runs never start");
}

#[tokio::test]
async fn stash_round_trip_refreshes_model() {
    let Some((_dir, session)) = scratch().await else { return };
    committed(&session, "a.txt").await;
    write(session.root(), "a.txt", "changed\n");

    session.create_stash(Some("wip"), false).await.expect("stash");
    assert!(session.model().groups.is_empty());
    assert_eq!(session.get_stashes().await.expect("list").len(), 1);

    session.pop_stash(None).await.expect("pop");
    assert_eq!(session.model().groups.tracked.len(), 1);

    let err = session.pop_stash(None).await.expect_err("nothing left");
    assert_eq!(err.kind(), Some(ErrorKind::NoStashFound));
}
