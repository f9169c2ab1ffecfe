//! Typed event channels emitted by a session.

use std::path::PathBuf;

use serde::Serialize;
use tokio::sync::broadcast;

use gitsession_core::{ErrorKind, OperationKind};

const CHANNEL_CAPACITY: usize = 256;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    Disposed,
}

/// Failure half of an [`OperationResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationError {
    pub kind: Option<ErrorKind>,
    pub message: String,
}

/// Emitted once per completed run, whatever the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationResult {
    pub operation: OperationKind,
    pub error: Option<OperationError>,
}

impl OperationResult {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().and_then(|e| e.kind)
    }
}

/// One broadcast channel per event type.
///
/// Sends never fail: an event with no subscribers is dropped.
#[derive(Debug)]
pub struct EventBus {
    state: broadcast::Sender<SessionState>,
    status: broadcast::Sender<()>,
    run_started: broadcast::Sender<OperationKind>,
    run_completed: broadcast::Sender<OperationResult>,
    repository_changed: broadcast::Sender<PathBuf>,
    original_resource_changed: broadcast::Sender<PathBuf>,
}

impl Default for EventBus {
    fn default() -> Self {
        EventBus {
            state: broadcast::channel(CHANNEL_CAPACITY).0,
            status: broadcast::channel(CHANNEL_CAPACITY).0,
            run_started: broadcast::channel(CHANNEL_CAPACITY).0,
            run_completed: broadcast::channel(CHANNEL_CAPACITY).0,
            repository_changed: broadcast::channel(CHANNEL_CAPACITY).0,
            original_resource_changed: broadcast::channel(CHANNEL_CAPACITY).0,
        }
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn state_changed(&self, state: SessionState) {
        let _ = self.state.send(state);
    }

    pub(crate) fn status_changed(&self) {
        let _ = self.status.send(());
    }

    pub(crate) fn run_started(&self, kind: OperationKind) {
        let _ = self.run_started.send(kind);
    }

    pub(crate) fn run_completed(&self, result: OperationResult) {
        let _ = self.run_completed.send(result);
    }

    pub(crate) fn repository_changed(&self, path: PathBuf) {
        let _ = self.repository_changed.send(path);
    }

    pub(crate) fn original_resource_changed(&self, path: PathBuf) {
        let _ = self.original_resource_changed.send(path);
    }

    pub fn subscribe_state(&self) -> broadcast::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<()> {
        self.status.subscribe()
    }

    pub fn subscribe_run_started(&self) -> broadcast::Receiver<OperationKind> {
        self.run_started.subscribe()
    }

    pub fn subscribe_run_completed(&self) -> broadcast::Receiver<OperationResult> {
        self.run_completed.subscribe()
    }

    pub fn subscribe_repository_changed(&self) -> broadcast::Receiver<PathBuf> {
        self.repository_changed.subscribe()
    }

    pub fn subscribe_original_resource_changed(&self) -> broadcast::Receiver<PathBuf> {
        self.original_resource_changed.subscribe()
    }
}
