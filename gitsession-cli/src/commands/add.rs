//! `gitsession add` — stage paths.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::{block_on, init_tracing, open_session, RepoArgs};

/// Arguments for `gitsession add`.
#[derive(Args, Debug)]
pub struct AddArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Paths to stage, relative to the current directory.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

impl AddArgs {
    pub fn run(self) -> Result<()> {
        init_tracing("warn");
        block_on(async move {
            let session = open_session(&self.repo.path).await?;
            let cwd = std::env::current_dir().context("could not determine current directory")?;
            let paths: Vec<PathBuf> = self.paths.iter().map(|p| cwd.join(p)).collect();
            session.add(&paths).await.context("failed to stage paths")?;

            let staged = session.model().groups.staged.len();
            println!("staged {} path(s); {staged} staged in total", paths.len());
            Ok(())
        })
    }
}
