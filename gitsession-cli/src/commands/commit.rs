//! `gitsession commit` — record staged changes.

use anyhow::{Context, Result};
use clap::Args;

use gitsession_git::CommitOptions;

use super::{block_on, init_tracing, open_session, RepoArgs};

/// Arguments for `gitsession commit`.
#[derive(Args, Debug)]
pub struct CommitArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Commit message.
    #[arg(short, long)]
    pub message: String,

    /// Stage modified and deleted tracked files first.
    #[arg(short, long)]
    pub all: bool,

    /// Replace the tip of the current branch.
    #[arg(long)]
    pub amend: bool,

    /// Add a Signed-off-by trailer.
    #[arg(short, long)]
    pub signoff: bool,

    /// Skip pre-commit and commit-msg hooks.
    #[arg(long)]
    pub no_verify: bool,
}

impl CommitArgs {
    pub fn run(self) -> Result<()> {
        init_tracing("warn");
        block_on(async move {
            let session = open_session(&self.repo.path).await?;
            let options = CommitOptions {
                all: self.all,
                amend: self.amend,
                signoff: self.signoff,
                no_verify: self.no_verify,
                ..CommitOptions::default()
            };
            session
                .commit(&self.message, &options)
                .await
                .context("commit failed")?;

            let model = session.model();
            let head = model.head_label.as_deref().unwrap_or("HEAD");
            println!("committed on {head}; {} change(s) remaining", model.count);
            Ok(())
        })
    }
}
