//! `gitsession log` — recent commits.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use gitsession_core::{Commit, LogOptions};

use super::{block_on, init_tracing, open_session, RepoArgs};

/// Arguments for `gitsession log`.
#[derive(Args, Debug)]
pub struct LogArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Number of commits to show.
    #[arg(short = 'n', long = "max-count", default_value_t = 20)]
    pub max_count: u32,

    /// Only commits touching this path.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct CommitJson<'a> {
    hash: &'a str,
    subject: &'a str,
    author: Option<&'a str>,
    date: Option<String>,
}

impl LogArgs {
    pub fn run(self) -> Result<()> {
        init_tracing("warn");
        block_on(async move {
            let session = open_session(&self.repo.path).await?;
            let options = LogOptions {
                max_entries: Some(self.max_count),
                ..LogOptions::default()
            };
            let commits = match &self.file {
                Some(file) => session.log_file(file, Some(self.max_count)).await,
                None => session.log(&options).await,
            }
            .context("failed to read commit log")?;

            if self.json {
                let payload: Vec<CommitJson<'_>> = commits.iter().map(commit_json).collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&payload).context("failed to serialize log JSON")?
                );
            } else {
                for commit in &commits {
                    println!("{}", commit_line(commit));
                }
            }
            Ok(())
        })
    }
}

fn commit_json(commit: &Commit) -> CommitJson<'_> {
    CommitJson {
        hash: &commit.hash,
        subject: commit.subject(),
        author: commit.author_name.as_deref(),
        date: commit.author_date.map(|d| d.to_rfc3339()),
    }
}

fn commit_line(commit: &Commit) -> String {
    let short: String = commit.hash.chars().take(8).collect();
    let author = commit.author_name.as_deref().unwrap_or("unknown");
    let date = commit
        .author_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    format!(
        "{} {} {} {}",
        short.yellow(),
        date.bright_black(),
        author.cyan(),
        commit.subject()
    )
}
