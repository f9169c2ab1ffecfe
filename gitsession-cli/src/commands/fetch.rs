//! `gitsession fetch` — update remote-tracking refs.

use anyhow::{Context, Result};
use clap::Args;

use gitsession_git::FetchOptions;

use super::{block_on, init_tracing, open_session, RepoArgs};

/// Arguments for `gitsession fetch`.
#[derive(Args, Debug)]
pub struct FetchArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Fetch every configured remote.
    #[arg(long, conflicts_with = "remote")]
    pub all: bool,

    /// Remove remote-tracking refs that no longer exist upstream.
    #[arg(long)]
    pub prune: bool,

    /// Remote to fetch from.
    #[arg(long)]
    pub remote: Option<String>,

    /// Limit history to this many commits.
    #[arg(long)]
    pub depth: Option<u32>,
}

impl FetchArgs {
    pub fn run(self) -> Result<()> {
        init_tracing("info");
        block_on(async move {
            let session = open_session(&self.repo.path).await?;
            let options = FetchOptions {
                remote: self.remote,
                all: self.all,
                prune: self.prune || session.config().prune_on_fetch,
                depth: self.depth,
                ..FetchOptions::default()
            };
            session.fetch(&options).await.context("fetch failed")?;

            let model = session.model();
            if let Some(head) = &model.head {
                println!(
                    "{}: {} ahead, {} behind",
                    model.head_label.as_deref().unwrap_or("HEAD"),
                    head.ahead.unwrap_or(0),
                    head.behind.unwrap_or(0),
                );
            }
            Ok(())
        })
    }
}
