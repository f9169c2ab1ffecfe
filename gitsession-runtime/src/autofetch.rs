//! Periodic background fetch.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;

use gitsession_core::{AutoFetch, ErrorKind};

use crate::error::SessionError;
use crate::observable::Observable;
use crate::session::Session;

/// Fetches on a fixed period while enabled, the session idle and the host
/// focused. Turns itself off when the remote rejects the credentials.
#[derive(Debug, Clone)]
pub struct AutoFetcher {
    session: Session,
    enabled: Arc<Observable<bool>>,
}

impl AutoFetcher {
    pub fn new(session: Session) -> Self {
        let enabled = session.config().autofetch != AutoFetch::Off;
        AutoFetcher {
            session,
            enabled: Arc::new(Observable::new(enabled)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn enable(&self) {
        self.enabled.set(true);
    }

    pub fn disable(&self) {
        self.enabled.set(false);
    }

    /// Loops until `shutdown_rx` fires or the session is disposed.
    pub async fn run(self, shutdown_rx: broadcast::Receiver<()>) {
        let session = self.session.clone();
        let all = session.config().autofetch == AutoFetch::All;
        self.run_with(shutdown_rx, move || {
            let session = session.clone();
            async move {
                if all {
                    session.fetch_all(None).await
                } else {
                    session.fetch_default(true, None).await
                }
            }
        })
        .await;
    }

    async fn run_with<F, Fut>(&self, mut shutdown_rx: broadcast::Receiver<()>, mut fetch: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), SessionError>>,
    {
        let period = self.session.config().autofetch_period();
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => return,
                _ = self.enabled.wait_for(|enabled| *enabled) => {}
            }
            tokio::select! {
                _ = shutdown_rx.recv() => return,
                _ = self.session.when_idle_and_focused() => {}
            }
            if self.session.is_disposed() {
                return;
            }

            match fetch().await {
                Ok(()) => tracing::debug!(root = %self.session.root().display(), "background fetch done"),
                Err(SessionError::Disposed { .. }) => return,
                Err(err) if err.kind() == Some(ErrorKind::AuthenticationFailed) => {
                    tracing::warn!(
                        root = %self.session.root().display(),
                        "background fetch needs credentials, disabling auto-fetch",
                    );
                    self.disable();
                }
                Err(err) => {
                    tracing::debug!(root = %self.session.root().display(), error = %err, "background fetch failed");
                }
            }

            tokio::select! {
                _ = shutdown_rx.recv() => return,
                _ = tokio::time::sleep(period) => {}
                _ = self.enabled.wait_for(|enabled| !*enabled) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use gitsession_core::SessionConfig;
    use gitsession_git::GitError;
    use tokio::time::advance;

    use crate::testing::{fake_session, test_config, FakeSource};

    use super::*;

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    fn fetcher(mode: AutoFetch) -> AutoFetcher {
        let config = SessionConfig {
            autofetch: mode,
            autofetch_period_secs: 180,
            ..test_config()
        };
        AutoFetcher::new(fake_session(Arc::new(FakeSource::new()), config))
    }

    #[tokio::test]
    async fn off_mode_starts_disabled() {
        assert!(!fetcher(AutoFetch::Off).is_enabled());
        assert!(fetcher(AutoFetch::Default).is_enabled());
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn fetches_once_per_period() {
        let fetcher = fetcher(AutoFetch::Default);
        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let calls = Arc::new(AtomicUsize::new(0));

        let task = {
            let fetcher = fetcher.clone();
            let calls = calls.clone();
            let shutdown_rx = shutdown_tx.subscribe();
            tokio::spawn(async move {
                fetcher
                    .run_with(shutdown_rx, move || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        async { Ok(()) }
                    })
                    .await
            })
        };

        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        advance(Duration::from_secs(179)).await;
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        advance(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let _ = shutdown_tx.send(());
        task.await.expect("join");
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn authentication_failure_disables_fetching() {
        let fetcher = fetcher(AutoFetch::All);
        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let calls = Arc::new(AtomicUsize::new(0));

        let task = {
            let fetcher = fetcher.clone();
            let calls = calls.clone();
            let shutdown_rx = shutdown_tx.subscribe();
            tokio::spawn(async move {
                fetcher
                    .run_with(shutdown_rx, move || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        async {
                            Err(SessionError::from(
                                GitError::new("auth").with_kind(ErrorKind::AuthenticationFailed),
                            ))
                        }
                    })
                    .await
            })
        };

        settle().await;
        assert!(!fetcher.is_enabled());
        advance(Duration::from_secs(600)).await;
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        fetcher.enable();
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let _ = shutdown_tx.send(());
        task.await.expect("join");
    }
}
