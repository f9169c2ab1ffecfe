//! Error types for gitsession-git.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use gitsession_core::{ClassifyContext, ErrorKind};

/// Failures below the tool's own exit status: spawning, pipes, file reads.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The executable could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The caller's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,
}

/// Convenience constructor for [`ExecError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ExecError {
    ExecError::Io {
        path: path.into(),
        source,
    }
}

/// A failed tool invocation.
///
/// `kind` is assigned once, by the executor, and carried unchanged upward.
#[derive(Debug, Clone)]
pub struct GitError {
    pub message: String,
    pub kind: Option<ErrorKind>,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// `argv[0]` of the failing invocation, if there was one.
    pub verb: Option<String>,
    pub argv: Vec<String>,
    cause: Option<Arc<ExecError>>,
}

impl GitError {
    pub fn new(message: impl Into<String>) -> Self {
        GitError {
            message: message.into(),
            kind: None,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            verb: None,
            argv: Vec::new(),
            cause: None,
        }
    }

    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub(crate) fn with_argv(mut self, argv: &[String]) -> Self {
        let verb = ClassifyContext::from_argv(argv).verb;
        self.verb = (!verb.is_empty()).then(|| verb.to_owned());
        self.argv = argv.to_vec();
        self
    }

    pub fn cancelled() -> Self {
        GitError::from(ExecError::Cancelled)
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == Some(ErrorKind::Cancelled)
    }
}

impl fmt::Display for GitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(kind) = self.kind {
            write!(f, " [{kind}]")?;
        }
        if let Some(code) = self.exit_code {
            write!(f, " (exit code {code})")?;
        }
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            write!(f, ": {stderr}")?;
        }
        Ok(())
    }
}

impl std::error::Error for GitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<ExecError> for GitError {
    fn from(err: ExecError) -> Self {
        let kind = match &err {
            ExecError::Spawn { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                Some(ErrorKind::GitNotFound)
            }
            ExecError::Cancelled => Some(ErrorKind::Cancelled),
            ExecError::Spawn { .. } | ExecError::Io { .. } => None,
        };
        GitError {
            message: err.to_string(),
            kind,
            cause: Some(Arc::new(err)),
            ..GitError::new("")
        }
    }
}
