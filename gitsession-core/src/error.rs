//! Error types for gitsession-core.
//!
//! [`ErrorKind`] is the closed taxonomy every classified tool failure maps to;
//! [`ConfigError`] covers configuration loading.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoStaticStr};
use thiserror::Error;

/// All errors that can arise while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (permission denied, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load — includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::config_dir()` returned `None`.
    #[error("cannot determine configuration directory")]
    ConfigDirNotFound,
}

/// Semantic kind attached to a failed tool invocation.
///
/// Assigned once, at the process boundary, and never re-classified.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, IntoStaticStr,
)]
pub enum ErrorKind {
    AuthenticationFailed,
    BadConfigFile,
    BranchAlreadyExists,
    BranchNotFullyMerged,
    CantAccessRemote,
    CantCreatePipe,
    CantLockRef,
    CantOpenResource,
    CantRebaseMultipleBranches,
    Conflict,
    DirtyWorkTree,
    GitNotFound,
    InvalidBranchName,
    IsInSubmodule,
    LocalChangesOverwritten,
    NoLocalChanges,
    NoPathFound,
    NoRemoteReference,
    NoRemoteRepositorySpecified,
    NoStashFound,
    NotAGitRepository,
    NotAtRepositoryRoot,
    NoUpstreamBranch,
    NoUserEmailConfigured,
    NoUserNameConfigured,
    PatchDoesNotApply,
    PermissionDenied,
    PushRejected,
    RemoteConnectionError,
    RepositoryIsLocked,
    RepositoryNotFound,
    StashConflict,
    UnknownPath,
    UnmergedChanges,
    WrongCase,
    /// The caller's cancellation token fired; the subprocess was killed.
    Cancelled,
}

/// Coarse handling class for an [`ErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The path is no longer a usable working copy; the session is disposed.
    Fatal,
    /// The user must act before the operation can succeed.
    Blocking,
    /// The working copy was left in a valid, inspectable conflicted state.
    Conflict,
    /// Transient contention; the run pipeline may retry.
    Retryable,
    /// Anything else, including cancellation.
    Other,
}

impl ErrorKind {
    pub fn category(self) -> ErrorCategory {
        match self {
            ErrorKind::NotAGitRepository => ErrorCategory::Fatal,
            ErrorKind::DirtyWorkTree
            | ErrorKind::PatchDoesNotApply
            | ErrorKind::NoUpstreamBranch
            | ErrorKind::PermissionDenied
            | ErrorKind::AuthenticationFailed
            | ErrorKind::NoUserNameConfigured
            | ErrorKind::NoUserEmailConfigured
            | ErrorKind::LocalChangesOverwritten
            | ErrorKind::UnmergedChanges
            | ErrorKind::PushRejected
            | ErrorKind::BadConfigFile
            | ErrorKind::GitNotFound => ErrorCategory::Blocking,
            ErrorKind::Conflict | ErrorKind::StashConflict => ErrorCategory::Conflict,
            ErrorKind::RepositoryIsLocked
            | ErrorKind::CantLockRef
            | ErrorKind::CantRebaseMultipleBranches => ErrorCategory::Retryable,
            ErrorKind::BranchAlreadyExists
            | ErrorKind::BranchNotFullyMerged
            | ErrorKind::CantAccessRemote
            | ErrorKind::CantCreatePipe
            | ErrorKind::CantOpenResource
            | ErrorKind::InvalidBranchName
            | ErrorKind::IsInSubmodule
            | ErrorKind::NoLocalChanges
            | ErrorKind::NoPathFound
            | ErrorKind::NoRemoteReference
            | ErrorKind::NoRemoteRepositorySpecified
            | ErrorKind::NoStashFound
            | ErrorKind::NotAtRepositoryRoot
            | ErrorKind::RemoteConnectionError
            | ErrorKind::RepositoryNotFound
            | ErrorKind::UnknownPath
            | ErrorKind::WrongCase
            | ErrorKind::Cancelled => ErrorCategory::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
