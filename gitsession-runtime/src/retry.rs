//! Bounded retry for lock-contention failures.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use gitsession_core::{ErrorKind, OperationKind, RetryConfig};
use gitsession_git::GitError;

/// `true` when a failure of `operation` with `kind` is worth another attempt.
///
/// A locked repository is retried for every operation. Ref-lock contention
/// and the multiple-branches rebase error only come up transiently during
/// fetches, pulls and syncs.
pub fn should_retry(operation: OperationKind, kind: ErrorKind) -> bool {
    match kind {
        ErrorKind::RepositoryIsLocked => true,
        ErrorKind::CantLockRef | ErrorKind::CantRebaseMultipleBranches => {
            operation.is_remote() && operation != OperationKind::Push
        }
        _ => false,
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        RetryPolicy { config }
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_retries.saturating_add(1)
    }

    pub fn delay(&self, retry: u32) -> Duration {
        self.config.delay(retry)
    }

    /// Runs `attempt` until it succeeds, fails with a non-retryable kind, or
    /// the attempt budget is spent. Every attempt and backoff sleep is raced
    /// against `cancel`.
    pub async fn run<T, F, Fut>(
        &self,
        operation: OperationKind,
        cancel: Option<&CancellationToken>,
        mut attempt: F,
    ) -> Result<T, GitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GitError>>,
    {
        let mut retry = 0u32;
        loop {
            let err = match cancellable(cancel, attempt()).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let retryable = err.kind.is_some_and(|kind| should_retry(operation, kind));
            if !retryable || retry >= self.config.max_retries {
                return Err(err);
            }

            retry += 1;
            let delay = self.delay(retry);
            tracing::debug!(
                %operation,
                kind = ?err.kind,
                retry,
                delay_ms = delay.as_millis() as u64,
                "retrying after lock contention",
            );
            cancellable(cancel, async {
                tokio::time::sleep(delay).await;
                Ok(())
            })
            .await?;
        }
    }
}

/// Awaits `fut`, resolving with a cancellation error if `cancel` fires first.
pub(crate) async fn cancellable<T, Fut>(
    cancel: Option<&CancellationToken>,
    fut: Fut,
) -> Result<T, GitError>
where
    Fut: Future<Output = Result<T, GitError>>,
{
    match cancel {
        None => fut.await,
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(GitError::cancelled()),
            result = fut => result,
        },
    }
}
