//! `gitsession watch` — foreground session with live refresh and autofetch.

use std::future::Future;

use anyhow::{Context, Result};
use clap::Args;
use tokio::sync::broadcast::{self, error::RecvError};

use gitsession_core::ErrorKind;
use gitsession_runtime::{
    handle_join, watch_repository, AutoFetcher, OperationResult, ProgressTracker, Session,
    SessionError,
};

use super::{block_on, init_tracing, open_session, RepoArgs};

/// Arguments for `gitsession watch`.
#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Never fetch in the background, whatever the config says.
    #[arg(long)]
    pub no_autofetch: bool,
}

impl WatchArgs {
    pub fn run(self) -> Result<()> {
        init_tracing("info");
        block_on(async move {
            let session = open_session(&self.repo.path).await?;
            run(session, !self.no_autofetch).await?;
            Ok(())
        })
    }
}

async fn run(session: Session, autofetch: bool) -> Result<()> {
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let progress = ProgressTracker::spawn(session.clone());
    let fetcher = AutoFetcher::new(session.clone());
    if !autofetch {
        fetcher.disable();
    }

    let model = session
        .status()
        .await
        .context("failed to read initial status")?;
    tracing::info!(
        root = %session.root().display(),
        head = model.head_label.as_deref().unwrap_or("(unborn)"),
        changes = model.count,
        autofetch = fetcher.is_enabled(),
        "session ready",
    );

    let watcher = watch_repository(session.clone(), shutdown_tx.subscribe());
    supervise(session, fetcher, progress, shutdown_tx, watcher).await
}

/// Runs the watcher alongside autofetch, reporting and signal handling. The
/// first task to stop for good (watcher exit, ctrl-c, disposal) shuts the
/// rest down.
async fn supervise<W>(
    session: Session,
    fetcher: AutoFetcher,
    progress: ProgressTracker,
    shutdown_tx: broadcast::Sender<()>,
    watcher: W,
) -> Result<()>
where
    W: Future<Output = Result<(), SessionError>> + Send + 'static,
{
    // Subscribe everyone before the watcher can broadcast.
    let fetch_rx = shutdown_tx.subscribe();
    let report_rx = shutdown_tx.subscribe();
    let mut signal_rx = shutdown_tx.subscribe();

    let watcher_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let result = watcher.await;
            if let Err(err) = &result {
                tracing::error!(error = %err, "watcher stopped");
            }
            let _ = shutdown.send(());
            result
        })
    };

    let fetch_handle = tokio::spawn(async move {
        fetcher.run(fetch_rx).await;
        Ok::<(), SessionError>(())
    });

    let report_handle = {
        let session = session.clone();
        let progress = progress.subscribe();
        tokio::spawn(report(session, progress, report_rx))
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        let session = session.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = signal_rx.recv() => Ok::<(), SessionError>(()),
                _ = session.disposed() => {
                    tracing::warn!("repository disappeared, stopping");
                    let _ = shutdown.send(());
                    Ok(())
                }
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => {
                            let _ = shutdown.send(());
                            Err(SessionError::Io { path: "ctrl-c".into(), source: err })
                        }
                    }
                }
            }
        })
    };

    let (watcher_result, fetch_result, report_result, signal_result) =
        tokio::join!(watcher_handle, fetch_handle, report_handle, signal_handle);
    session.dispose();
    drop(progress);

    handle_join("watcher", watcher_result).context("repository watcher failed")?;
    handle_join("autofetch", fetch_result)?;
    handle_join("report", report_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

/// Logs run completions, status changes and progress transitions.
async fn report(
    session: Session,
    mut progress: tokio::sync::watch::Receiver<bool>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), SessionError> {
    let mut completed = session.events().subscribe_run_completed();
    let mut status = session.events().subscribe_status();
    let mut progress_open = true;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = session.disposed() => break,
            result = completed.recv() => match result {
                Ok(result) => log_completion(&result),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "completion events lagged");
                }
                Err(RecvError::Closed) => break,
            },
            changed = status.recv() => match changed {
                Ok(()) | Err(RecvError::Lagged(_)) => {
                    let model = session.model();
                    tracing::info!(
                        head = model.head_label.as_deref().unwrap_or("(unborn)"),
                        changes = model.count,
                        merge = model.groups.merge.len(),
                        staged = model.groups.staged.len(),
                        "status changed",
                    );
                }
                Err(RecvError::Closed) => break,
            },
            changed = progress.changed(), if progress_open => {
                if changed.is_err() {
                    progress_open = false;
                    continue;
                }
                let visible = *progress.borrow_and_update();
                tracing::debug!(visible, "progress");
            }
        }
    }
    Ok(())
}

fn log_completion(result: &OperationResult) {
    match &result.error {
        None => tracing::debug!(operation = %result.operation, "operation completed"),
        Some(error) if result.error_kind() == Some(ErrorKind::Cancelled) => {
            tracing::debug!(operation = %result.operation, message = %error.message, "operation cancelled");
        }
        Some(error) => tracing::warn!(
            operation = %result.operation,
            kind = ?error.kind,
            message = %error.message,
            "operation failed",
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use gitsession_core::SessionConfig;
    use gitsession_git::{Git, Repository};

    use super::*;

    fn offline_session() -> Session {
        let git = Arc::new(Git::new("git", "git version 2.43.0"));
        let repository = Repository::new(git, "/nonexistent/repo", "/nonexistent/repo/.git");
        Session::new(repository, SessionConfig::default())
    }

    #[tokio::test]
    async fn watcher_failure_stops_every_task() {
        let session = offline_session();
        let fetcher = AutoFetcher::new(session.clone());
        fetcher.disable();
        let progress = ProgressTracker::spawn(session.clone());
        let (shutdown_tx, _) = broadcast::channel::<()>(16);
        let watcher = async {
            Err(SessionError::Io {
                path: PathBuf::from("/nonexistent/repo"),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        };

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            supervise(session.clone(), fetcher, progress, shutdown_tx, watcher),
        )
        .await
        .expect("supervisor exits once the watcher fails");

        let err = result.expect_err("watcher error is reported");
        assert!(format!("{err:#}").contains("repository watcher failed"), "{err:#}");
        assert!(session.is_disposed());
    }
}
