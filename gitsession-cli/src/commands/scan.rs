//! `gitsession scan` — repository discovery across workspace folders.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use gitsession_runtime::Registry;

use super::{block_on, find_git, init_tracing, load_config};

/// Arguments for `gitsession scan`.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Workspace folders. Each folder and its direct children are probed.
    #[arg(default_value = ".")]
    pub folders: Vec<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct RepositoryRow {
    #[tabled(rename = "Repository")]
    root: String,
    #[tabled(rename = "HEAD")]
    head: String,
    #[tabled(rename = "Changes")]
    changes: usize,
}

impl ScanArgs {
    pub fn run(self) -> Result<()> {
        init_tracing("warn");
        block_on(async move {
            let config = load_config()?;
            let git = find_git(&config).await?;
            let registry = Registry::new(git, config, false);

            let cwd = std::env::current_dir().context("could not determine current directory")?;
            registry.set_workspace_folders(self.folders.iter().map(|f| cwd.join(f)).collect());
            registry.scan_workspace().await;

            let mut rows = Vec::new();
            for session in registry.sessions().await {
                let model = session
                    .status()
                    .await
                    .with_context(|| format!("status failed in {}", session.root().display()))?;
                rows.push(RepositoryRow {
                    root: session.root().display().to_string(),
                    head: model.head_label.clone().unwrap_or_default(),
                    changes: model.count,
                });
            }
            registry.shutdown().await;

            if self.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&rows).context("failed to serialize scan JSON")?
                );
            } else if rows.is_empty() {
                println!("{}", "No repositories found.".yellow());
            } else {
                let mut table = Table::new(rows);
                table.with(Style::rounded());
                println!("{table}");
            }
            Ok(())
        })
    }
}
