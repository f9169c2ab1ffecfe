//! # gitsession-git
//!
//! Process executor and per-working-copy command surface.
//!
//! Resolve the binary with [`Git::find`], then [`discovery::open`] a
//! [`Repository`] and call one async method per tool verb. Failures come back
//! as [`GitError`] with their [`ErrorKind`](gitsession_core::ErrorKind)
//! already assigned.

pub mod chunk;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod repository;

pub use chunk::{argv_len, split_in_chunks};
pub use error::{ExecError, GitError};
pub use executor::{ExecOptions, ExecOutput, Git, StreamedChild};
pub use repository::{
    CheckoutOptions, CommitOptions, DiffTarget, FetchOptions, PullOptions, PushOptions, PushTags,
    RemoteAction, Repository, StatusListing,
};
