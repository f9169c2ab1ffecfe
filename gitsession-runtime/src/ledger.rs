//! Operation ledger: a multiset of the operation kinds currently running.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use gitsession_core::OperationKind;

/// Concurrent-safe count of in-flight operations per kind.
///
/// A kind is present only while its count is above zero. All reads take the
/// same lock as `start`/`end`, so each query sees one consistent snapshot.
#[derive(Debug, Default)]
pub struct OperationLedger {
    running: Mutex<HashMap<OperationKind, usize>>,
}

impl OperationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<OperationKind, usize>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn start(&self, kind: OperationKind) {
        *self.lock().entry(kind).or_insert(0) += 1;
    }

    /// Unregisters one instance of `kind`. Unbalanced calls are ignored.
    pub fn end(&self, kind: OperationKind) {
        let mut running = self.lock();
        match running.get_mut(&kind) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                running.remove(&kind);
            }
            None => tracing::warn!(%kind, "ledger end without matching start"),
        }
    }

    pub fn is_running(&self, kind: OperationKind) -> bool {
        self.lock().contains_key(&kind)
    }

    /// `true` iff nothing but read-only operations is in flight.
    pub fn is_idle(&self) -> bool {
        self.lock().keys().all(|kind| kind.is_read_only())
    }

    pub fn should_show_progress(&self) -> bool {
        self.lock().keys().any(|kind| kind.shows_progress())
    }

    /// Running kinds with their counts, sorted by kind.
    pub fn snapshot(&self) -> Vec<(OperationKind, usize)> {
        let mut entries: Vec<_> = self.lock().iter().map(|(k, v)| (*k, *v)).collect();
        entries.sort();
        entries
    }
}
