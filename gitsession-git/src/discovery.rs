//! Locating the working copy that contains a path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::GitError;
use crate::executor::{ExecOptions, Git};
use crate::repository::Repository;

/// `rev-parse --show-toplevel` from `path`.
pub async fn repository_root(git: &Git, path: &Path) -> Result<PathBuf, GitError> {
    let out = git
        .exec(["rev-parse", "--show-toplevel"], &ExecOptions::in_dir(path))
        .await?;
    let root = out.stdout.trim();
    if root.is_empty() {
        return Err(GitError::new(format!("no working copy at {}", path.display())));
    }
    Ok(PathBuf::from(root))
}

/// `rev-parse --git-dir` from `root`, made absolute.
pub async fn repository_dot_git(git: &Git, root: &Path) -> Result<PathBuf, GitError> {
    let out = git
        .exec(["rev-parse", "--git-dir"], &ExecOptions::in_dir(root))
        .await?;
    let dot_git = PathBuf::from(out.stdout.trim());
    Ok(if dot_git.is_absolute() {
        dot_git
    } else {
        root.join(dot_git)
    })
}

/// Opens the working copy containing `path`.
pub async fn open(git: Arc<Git>, path: &Path) -> Result<Repository, GitError> {
    let root = repository_root(&git, path).await?;
    let dot_git = repository_dot_git(&git, &root).await?;
    tracing::debug!(root = %root.display(), dot_git = %dot_git.display(), "opened repository");
    Ok(Repository::new(git, root, dot_git))
}
