//! Progress indicator driven by the ledger.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::observable::Observable;
use crate::session::Session;

/// How long the indicator stays up after the last progress-worthy run ends.
pub const PROGRESS_OFF_DELAY: Duration = Duration::from_millis(300);

/// Observable "show progress" flag for one session.
#[derive(Debug)]
pub struct ProgressTracker {
    visible: Arc<Observable<bool>>,
    task: Option<JoinHandle<()>>,
}

impl ProgressTracker {
    /// Starts tracking. With `show_progress` off the flag stays `false`.
    pub fn spawn(session: Session) -> Self {
        let visible = Arc::new(Observable::new(false));
        let task = session
            .config()
            .show_progress
            .then(|| tokio::spawn(track(session, visible.clone())));
        ProgressTracker { visible, task }
    }

    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.visible.subscribe()
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn track(session: Session, visible: Arc<Observable<bool>>) {
    let mut started = session.events().subscribe_run_started();
    let mut completed = session.events().subscribe_run_completed();
    let mut off_at: Option<Instant> = None;

    loop {
        let closed = tokio::select! {
            r = started.recv() => matches!(r, Err(RecvError::Closed)),
            r = completed.recv() => matches!(r, Err(RecvError::Closed)),
            _ = tokio::time::sleep_until(off_at.unwrap_or_else(Instant::now)), if off_at.is_some() => {
                off_at = None;
                visible.set(false);
                continue;
            }
        };
        if closed {
            return;
        }

        if session.ledger().should_show_progress() {
            off_at = None;
            visible.set(true);
        } else if visible.get() && off_at.is_none() {
            off_at = Some(Instant::now() + PROGRESS_OFF_DELAY);
        }
    }
}
