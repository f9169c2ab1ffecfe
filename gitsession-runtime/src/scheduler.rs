//! Trailing-edge debouncer shared by discovery and auto-refresh.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Work run when a debounce window closes.
pub type Action = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Debug, Clone, Copy)]
enum Signal {
    Trigger,
    Cancel,
}

/// Runs an action once a burst of triggers has been quiet for `window`.
///
/// Each trigger restarts the window. Triggers that arrive while the action
/// runs coalesce into exactly one follow-up run. Dropping the debouncer stops
/// the timer and any run in progress.
#[derive(Debug)]
pub struct Debouncer {
    tx: mpsc::UnboundedSender<Signal>,
    task: JoinHandle<()>,
}

impl Debouncer {
    pub fn new(window: Duration, action: Action) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(debounce_loop(window, action, rx));
        Debouncer { tx, task }
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(Signal::Trigger);
    }

    /// Drops a pending window without running the action.
    pub fn cancel(&self) {
        let _ = self.tx.send(Signal::Cancel);
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn debounce_loop(window: Duration, action: Action, mut rx: mpsc::UnboundedReceiver<Signal>) {
    'idle: loop {
        match rx.recv().await {
            None => return,
            Some(Signal::Cancel) => continue,
            Some(Signal::Trigger) => {}
        }

        // Trailing edge: wait until `window` passes with no new trigger.
        loop {
            tokio::select! {
                _ = tokio::time::sleep(window) => break,
                signal = rx.recv() => match signal {
                    None => return,
                    Some(Signal::Trigger) => continue,
                    Some(Signal::Cancel) => continue 'idle,
                },
            }
        }

        action().await;
    }
}
