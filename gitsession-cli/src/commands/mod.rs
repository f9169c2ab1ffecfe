//! Subcommand implementations and the plumbing they share.

pub mod add;
pub mod commit;
pub mod fetch;
pub mod log;
pub mod scan;
pub mod status;
pub mod watch;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use gitsession_core::SessionConfig;
use gitsession_git::{discovery, Git};
use gitsession_runtime::Session;

/// Repository selection shared by every per-repository subcommand.
#[derive(Args, Debug, Clone)]
pub struct RepoArgs {
    /// Any path inside the working copy.
    #[arg(long, default_value = ".")]
    pub path: PathBuf,
}

/// Logs go to stderr so that `--json` output on stdout stays parseable.
pub fn init_tracing(default_level: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Drives `fut` to completion on a fresh multi-threaded runtime.
pub fn block_on<F: Future<Output = Result<()>>>(fut: F) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    runtime.block_on(fut)
}

pub fn load_config() -> Result<SessionConfig> {
    gitsession_core::config::load().context("failed to load gitsession config")
}

pub async fn find_git(config: &SessionConfig) -> Result<Arc<Git>> {
    let git = Git::find(config).await.context("could not locate git")?;
    Ok(Arc::new(git))
}

/// Opens a session over the repository containing `path`.
pub async fn open_session(path: &Path) -> Result<Session> {
    let config = load_config()?;
    let git = find_git(&config).await?;
    let repository = discovery::open(git, path)
        .await
        .with_context(|| format!("{} is not inside a git repository", path.display()))?;
    Ok(Session::new(repository, config))
}

/// `path` relative to `root`, for display.
pub fn display_relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
