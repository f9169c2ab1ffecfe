//! Executor behavior against `/bin/sh` standing in for the tool binary.

use std::time::{Duration, Instant};

use gitsession_core::ErrorKind;
use gitsession_git::{argv_len, ExecOptions, Git};
use tokio_util::sync::CancellationToken;

fn sh() -> Git {
    Git::new("/bin/sh", "test")
}

fn script(body: &str) -> Vec<String> {
    vec!["-c".to_string(), body.to_string()]
}

#[tokio::test]
async fn buffered_exec_captures_stdout() {
    let out = sh()
        .exec(script("printf hello"), &ExecOptions::default())
        .await
        .expect("exec");
    assert_eq!(out.exit_code, 0);
    assert_eq!(out.stdout, "hello");
}

#[tokio::test]
async fn stdin_is_written_then_closed() {
    let opts = ExecOptions::default().stdin("from stdin");
    let out = sh().exec(script("cat"), &opts).await.expect("exec");
    assert_eq!(out.stdout, "from stdin");
}

#[tokio::test]
async fn pager_and_locale_are_pinned() {
    let out = sh()
        .exec(script("printf '%s %s' \"$GIT_PAGER\" \"$LC_ALL\""), &ExecOptions::default())
        .await
        .expect("exec");
    assert_eq!(out.stdout, "cat en_US.UTF-8");
}

#[tokio::test]
async fn non_zero_exit_is_classified() {
    let err = sh()
        .exec(
            script("echo 'fatal: not a git repository (or any parent)' >&2; exit 128"),
            &ExecOptions::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, Some(ErrorKind::NotAGitRepository));
    assert_eq!(err.exit_code, Some(128));
}

#[tokio::test]
async fn unmatched_failure_has_no_kind() {
    let err = sh()
        .exec(script("echo boom >&2; exit 3"), &ExecOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, None);
    assert_eq!(err.stderr.trim(), "boom");
}

#[tokio::test]
async fn cancellation_kills_the_child() {
    let token = CancellationToken::new();
    let opts = ExecOptions::default().cancel(Some(token.clone()));
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });

    let started = Instant::now();
    let err = sh().exec(script("sleep 30"), &opts).await.unwrap_err();
    canceller.await.expect("join");

    assert!(err.is_cancelled(), "got {err}");
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn already_cancelled_token_never_spawns() {
    let token = CancellationToken::new();
    token.cancel();
    let opts = ExecOptions::default().cancel(Some(token));
    let err = sh().exec(script("exit 0"), &opts).await.unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn missing_binary_is_git_not_found() {
    let git = Git::new("/definitely/not/here/git", "");
    let err = git.exec(["status"], &ExecOptions::default()).await.unwrap_err();
    assert_eq!(err.kind, Some(ErrorKind::GitNotFound));
}

#[tokio::test]
async fn streamed_records_arrive_in_order() {
    let mut child = sh()
        .stream(script("printf 'a\\0bb\\0ccc\\0'"), &ExecOptions::default())
        .await
        .expect("stream");
    let mut records = Vec::new();
    while let Some(record) = child.next_record(b'\0').await.expect("record") {
        records.push(record);
    }
    assert_eq!(records, vec!["a", "bb", "ccc"]);
    child.finish().await.expect("finish");
}

#[tokio::test]
async fn streamed_child_can_be_killed_early() {
    let mut child = sh()
        .stream(script("yes line"), &ExecOptions::default())
        .await
        .expect("stream");
    for _ in 0..3 {
        assert_eq!(child.next_line().await.expect("line").as_deref(), Some("line"));
    }
    child.kill();
    tokio::time::timeout(Duration::from_secs(5), child.finish())
        .await
        .expect("finish returns after kill")
        .expect("killed child finishes cleanly");
}

#[cfg(unix)]
#[tokio::test]
async fn killed_child_does_not_wait_on_forked_helpers() {
    // The background sleep inherits stderr and outlives a plain kill of `sh`.
    let mut child = sh()
        .stream(script("(sleep 30) & yes line"), &ExecOptions::default())
        .await
        .expect("stream");
    assert_eq!(child.next_line().await.expect("line").as_deref(), Some("line"));
    child.kill();
    tokio::time::timeout(Duration::from_secs(5), child.finish())
        .await
        .expect("finish returns while helpers are torn down")
        .expect("killed child finishes cleanly");
}

#[tokio::test]
async fn chunked_exec_runs_one_invocation_per_chunk() {
    let git = Git::new("/bin/echo", "test").with_max_cli_length(12);
    let paths: Vec<String> = (0..6).map(|i| format!("path{i}")).collect();
    let outputs = git
        .exec_chunked(&[], &paths, &ExecOptions::default())
        .await
        .expect("chunked");
    assert_eq!(outputs.len(), 3);
    let echoed: Vec<String> = outputs
        .iter()
        .flat_map(|o| o.stdout.split_whitespace().map(str::to_owned).collect::<Vec<_>>())
        .collect();
    assert_eq!(echoed, paths);
}

#[tokio::test]
async fn chunk_budget_includes_the_prefix() {
    let git = Git::new("/bin/echo", "test").with_max_cli_length(20);
    let prefix = vec!["prefix".to_string()];
    let paths: Vec<String> = (0..6).map(|i| format!("path{i}")).collect();
    let outputs = git
        .exec_chunked(&prefix, &paths, &ExecOptions::default())
        .await
        .expect("chunked");
    assert_eq!(outputs.len(), 3);
    for output in &outputs {
        let args: Vec<&str> = output.stdout.split_whitespace().collect();
        assert_eq!(args[0], "prefix");
        assert!(argv_len(&args) <= 20, "{args:?}");
    }
}

#[tokio::test]
async fn concurrent_chunks_cover_every_path() {
    let git = Git::new("/bin/echo", "test").with_max_cli_length(10);
    let paths: Vec<String> = (0..20).map(|i| format!("p{i:03}")).collect();
    let outputs = git
        .exec_chunked_concurrent(&[], &paths, &ExecOptions::default(), 5)
        .await
        .expect("chunked");
    let mut echoed: Vec<String> = outputs
        .iter()
        .flat_map(|o| o.stdout.split_whitespace().map(str::to_owned).collect::<Vec<_>>())
        .collect();
    echoed.sort();
    assert_eq!(echoed, paths);
}
