//! Change debouncer: filesystem changes in, status refreshes out.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::scheduler::{Action, Debouncer};
use crate::session::Session;

/// Turns bursts of change notifications into single, well-timed refreshes.
#[derive(Debug)]
pub struct AutoRefresh {
    session: Session,
    debouncer: Debouncer,
}

impl AutoRefresh {
    pub fn new(session: Session) -> Self {
        let window = session.config().status_debounce();
        let settle = session.config().settle_delay();
        let action: Action = {
            let session = session.clone();
            Arc::new(move || {
                let session = session.clone();
                Box::pin(async move { refresh_when_ready(&session, settle).await })
            })
        };
        AutoRefresh {
            debouncer: Debouncer::new(window, action),
            session,
        }
    }

    /// Schedules a refresh for a change at `path`. Returns `false` when the
    /// change was dropped: auto-refresh off, the repository flagged as too
    /// large, the session disposed, or a mutating operation in flight.
    pub fn on_change(&self, path: &Path) -> bool {
        let session = &self.session;
        let dropped = if !session.config().auto_refresh {
            Some("auto-refresh disabled")
        } else if session.is_disposed() {
            Some("session disposed")
        } else if session.model().did_hit_limit {
            Some("status limit reached")
        } else if !session.ledger().is_idle() {
            Some("operation in flight")
        } else {
            None
        };

        if let Some(reason) = dropped {
            tracing::trace!(path = %path.display(), reason, "change dropped");
            return false;
        }
        tracing::trace!(path = %path.display(), "refresh scheduled");
        self.debouncer.trigger();
        true
    }

    pub fn cancel(&self) {
        self.debouncer.cancel();
    }
}

async fn refresh_when_ready(session: &Session, settle: Duration) {
    session.when_idle_and_focused().await;
    if session.is_disposed() {
        return;
    }
    if let Err(err) = session.status().await {
        tracing::warn!(root = %session.root().display(), error = %err, "automatic refresh failed");
    }
    tokio::time::sleep(settle).await;
}
