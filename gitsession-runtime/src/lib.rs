//! # gitsession-runtime
//!
//! Sessions over working copies: the run pipeline with its ledger, limiters
//! and retry policy; the status synchronizer; change-driven auto-refresh;
//! watchers; background fetch; progress; and a registry that discovers and
//! tracks many working copies at once.
//!
//! ```no_run
//! # async fn demo() -> Result<(), gitsession_runtime::SessionError> {
//! use std::sync::Arc;
//! use gitsession_core::SessionConfig;
//! use gitsession_git::{discovery, Git};
//! use gitsession_runtime::Session;
//!
//! let config = SessionConfig::default();
//! let git = Arc::new(Git::find(&config).await?);
//! let repository = discovery::open(git, std::path::Path::new(".")).await?;
//! let session = Session::new(repository, config);
//! let model = session.status().await?;
//! println!("{} changes", model.count);
//! # Ok(())
//! # }
//! ```

pub mod autofetch;
pub mod autorefresh;
mod error;
pub mod events;
pub mod ledger;
pub mod observable;
pub mod progress;
pub mod registry;
pub mod retry;
pub mod scheduler;
pub mod session;
pub mod synchronizer;
pub mod watcher;

#[cfg(test)]
mod testing;

pub use autofetch::AutoFetcher;
pub use autorefresh::AutoRefresh;
pub use error::{handle_join, SessionError};
pub use events::{EventBus, OperationError, OperationResult, SessionState};
pub use ledger::OperationLedger;
pub use observable::Observable;
pub use progress::ProgressTracker;
pub use registry::Registry;
pub use retry::{should_retry, RetryPolicy};
pub use scheduler::Debouncer;
pub use session::Session;
pub use synchronizer::{ModelSnapshot, ModelSource, Synchronizer};
pub use watcher::watch_repository;
