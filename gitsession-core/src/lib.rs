//! gitsession core library — closed enumerations, classification, parsers,
//! configuration.
//!
//! Public API surface:
//! - [`operation`] — [`OperationKind`] and its exhaustive taxonomy
//! - [`classify`] — stderr/stdout probes → [`ErrorKind`]
//! - [`status`] — file statuses, resource groups, `status -z` parser
//! - [`types`] / [`parse`] — refs, remotes, submodules, commits, stashes
//! - [`config`] — [`SessionConfig`] load

pub mod classify;
pub mod config;
pub mod error;
pub mod operation;
pub mod parse;
pub mod status;
pub mod types;

pub use classify::{classify, is_benign, ClassifyContext};
pub use config::{AutoFetch, BranchSortOrder, CountBadge, RetryConfig, SessionConfig};
pub use error::{ConfigError, ErrorCategory, ErrorKind};
pub use operation::OperationKind;
pub use status::{FileStatus, Resource, ResourceGroupKind, ResourceGroups, StatusEntry, StatusParser};
pub use types::{
    head_short_name, Branch, Commit, LogOptions, ObjectDetails, Ref, RefType, Remote, Stash,
    Submodule, UpstreamRef,
};
