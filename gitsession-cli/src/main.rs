//! gitsession — repository session orchestrator CLI.
//!
//! # Usage
//!
//! ```text
//! gitsession status [--path <dir>] [--json]
//! gitsession watch [--path <dir>] [--no-autofetch]
//! gitsession log [--path <dir>] [-n <count>] [--file <path>]
//! gitsession add [--path <dir>] <paths>...
//! gitsession commit [--path <dir>] -m <message> [--all] [--amend]
//! gitsession fetch [--path <dir>] [--all | --prune] [--remote <name>]
//! gitsession scan <folders>... [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    add::AddArgs, commit::CommitArgs, fetch::FetchArgs, log::LogArgs, scan::ScanArgs,
    status::StatusArgs, watch::WatchArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "gitsession",
    version,
    about = "Keep a live, serialized session over a git working copy",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the grouped working-copy status of a repository.
    Status(StatusArgs),

    /// Watch a repository, refreshing status and fetching in the background.
    Watch(WatchArgs),

    /// Show recent commits.
    Log(LogArgs),

    /// Stage paths into the index.
    Add(AddArgs),

    /// Record staged changes as a new commit.
    Commit(CommitArgs),

    /// Download objects and refs from remotes.
    Fetch(FetchArgs),

    /// Discover repositories under workspace folders.
    Scan(ScanArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Status(args) => args.run(),
        Commands::Watch(args) => args.run(),
        Commands::Log(args) => args.run(),
        Commands::Add(args) => args.run(),
        Commands::Commit(args) => args.run(),
        Commands::Fetch(args) => args.run(),
        Commands::Scan(args) => args.run(),
    }
}
