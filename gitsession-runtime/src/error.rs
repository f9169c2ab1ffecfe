use std::path::PathBuf;

use thiserror::Error;

use gitsession_core::ErrorKind;
use gitsession_git::GitError;

/// Error surface for sessions, watchers and the repository registry.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session stopped accepting work after its repository disappeared.
    #[error("session for {root} is disposed")]
    Disposed { root: PathBuf },

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("config error: {0}")]
    Config(#[from] gitsession_core::ConfigError),

    #[error("{task} task join failure: {message}")]
    Join { task: &'static str, message: String },
}

impl SessionError {
    /// Classified kind of the underlying tool failure, if any.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            SessionError::Git(err) => err.kind,
            SessionError::Disposed { .. }
            | SessionError::Io { .. }
            | SessionError::Notify(_)
            | SessionError::Config(_)
            | SessionError::Join { .. } => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind() == Some(ErrorKind::Cancelled)
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SessionError {
    SessionError::Io {
        path: path.into(),
        source,
    }
}

/// Flattens a joined task's result, naming the task on panic or abort.
pub fn handle_join(
    task: &'static str,
    result: Result<Result<(), SessionError>, tokio::task::JoinError>,
) -> Result<(), SessionError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(SessionError::Join {
            task,
            message: err.to_string(),
        }),
    }
}
