//! `gitsession status` — grouped working-copy status.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use gitsession_core::{Resource, ResourceGroupKind};
use gitsession_runtime::ModelSnapshot;

use super::{block_on, display_relative, init_tracing, open_session, RepoArgs};

/// Arguments for `gitsession status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        init_tracing("warn");
        block_on(async move {
            let session = open_session(&self.repo.path).await?;
            let model = session
                .status()
                .await
                .context("failed to read repository status")?;
            if self.json {
                print_json(session.root(), &model)
            } else {
                print_table(session.root(), &model);
                Ok(())
            }
        })
    }
}

#[derive(Serialize)]
struct StatusJson<'a> {
    root: &'a Path,
    #[serde(flatten)]
    model: &'a ModelSnapshot,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Path")]
    path: String,
}

fn print_json(root: &Path, model: &ModelSnapshot) -> Result<()> {
    let payload = StatusJson { root, model };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(root: &Path, model: &ModelSnapshot) {
    println!("{}", head_line(model));

    if model.did_hit_limit {
        println!(
            "{}",
            "Too many changes; only part of the status is shown.".yellow()
        );
    }

    let groups = [
        ResourceGroupKind::Merge,
        ResourceGroupKind::Staged,
        ResourceGroupKind::Tracked,
        ResourceGroupKind::Untracked,
    ];
    let rows: Vec<StatusTableRow> = groups
        .into_iter()
        .flat_map(|kind| model.groups.group(kind).iter().map(move |r| (kind, r)))
        .map(|(kind, resource)| StatusTableRow {
            group: group_indicator(kind),
            status: status_label(resource),
            path: path_label(root, resource),
        })
        .collect();

    if rows.is_empty() {
        println!("Nothing to commit, working tree clean.");
        return;
    }

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!("{} changes", model.count);
}

fn head_line(model: &ModelSnapshot) -> String {
    let label = model
        .head_label
        .clone()
        .unwrap_or_else(|| "(no commits yet)".to_string());
    let mut line = format!("On {}", label.bold());

    if let Some(head) = &model.head {
        if let Some(upstream) = &head.upstream {
            line.push_str(&format!(" tracking {upstream}"));
        }
        match (head.ahead.unwrap_or(0), head.behind.unwrap_or(0)) {
            (0, 0) => {}
            (ahead, behind) => line.push_str(&format!(" [{ahead}↑ {behind}↓]")),
        }
    }
    if let Some(commit) = &model.rebase_commit {
        line.push_str(&format!(" (rebasing {})", commit.subject()));
    }
    line
}

fn group_indicator(kind: ResourceGroupKind) -> String {
    match kind {
        ResourceGroupKind::Merge => "merge".magenta().bold().to_string(),
        ResourceGroupKind::Staged => "staged".green().bold().to_string(),
        ResourceGroupKind::Tracked => "changes".red().bold().to_string(),
        ResourceGroupKind::Untracked => "untracked".bright_black().bold().to_string(),
    }
}

fn status_label(resource: &Resource) -> String {
    match resource.worktree_status {
        Some(worktree) => format!("{} (+ {worktree})", resource.status),
        None => resource.status.to_string(),
    }
}

fn path_label(root: &Path, resource: &Resource) -> String {
    let path = display_relative(root, &resource.path);
    match &resource.original_path {
        Some(original) => format!("{} → {path}", display_relative(root, original)),
        None => path,
    }
}
