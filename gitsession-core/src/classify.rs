//! Error classifier.
//!
//! A pure function over the text a failed invocation produced. Probes are
//! tried in order: first the ones scoped to the verb that ran, then the
//! global ones. The first match wins; no match yields `None`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ErrorKind;

/// What was run: the tool verb (`argv[0]`) and its remaining arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifyContext<'a> {
    pub verb: &'a str,
    pub args: &'a [String],
}

impl<'a> ClassifyContext<'a> {
    /// Builds a context from a full argv (`["commit", "-m", …]`). Leading
    /// `-c key=value` overrides are skipped.
    pub fn from_argv(argv: &'a [String]) -> Self {
        let mut rest = argv;
        while rest.len() >= 2 && rest[0] == "-c" {
            rest = &rest[2..];
        }
        match rest.split_first() {
            Some((verb, args)) => ClassifyContext { verb, args },
            None => ClassifyContext::default(),
        }
    }

    fn subcommand(&self) -> Option<&str> {
        self.args
            .iter()
            .map(String::as_str)
            .find(|a| !a.starts_with('-'))
    }
}

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

struct Probe {
    stream: Stream,
    pattern: Regex,
    kind: ErrorKind,
}

fn probe(stream: Stream, pattern: &str, kind: ErrorKind) -> Probe {
    Probe {
        stream,
        pattern: Regex::new(pattern).expect("valid probe regex"),
        kind,
    }
}

// ---------------------------------------------------------------------------
// 1. Probe tables
// ---------------------------------------------------------------------------

static GLOBAL: Lazy<Vec<Probe>> = Lazy::new(|| {
    use ErrorKind::*;
    use Stream::Stderr;
    vec![
        probe(
            Stderr,
            r"Another git process seems to be running in this repository|If no other git process is currently running",
            RepositoryIsLocked,
        ),
        probe(Stderr, r"(?i)Authentication failed", AuthenticationFailed),
        probe(Stderr, r"(?i)Not a git repository", NotAGitRepository),
        probe(Stderr, r"bad config file", BadConfigFile),
        probe(
            Stderr,
            r"cannot make pipe for command substitution|cannot create standard input pipe",
            CantCreatePipe,
        ),
        probe(Stderr, r"Repository not found", RepositoryNotFound),
        probe(Stderr, r"unable to access", CantAccessRemote),
        probe(Stderr, r"(?i)branch '.+' is not fully merged", BranchNotFullyMerged),
        probe(Stderr, r"Couldn't find remote ref", NoRemoteReference),
        probe(Stderr, r"(?i)a branch named '.+' already exists", BranchAlreadyExists),
        probe(Stderr, r"'.+' is not a valid branch name", InvalidBranchName),
        probe(Stderr, r"Please,? commit your changes or stash them", DirtyWorkTree),
    ]
});

static PULL_DIRTY: &str = r"(?i)Pull(?:ing)? is not possible because you have unmerged files|Cannot pull with rebase: You have unstaged changes|Your local changes to the following files would be overwritten|Please, commit your changes before you can merge";

static SHOW: Lazy<Vec<Probe>> =
    Lazy::new(|| vec![probe(Stream::Stderr, r"exists on disk, but not in", ErrorKind::WrongCase)]);

static APPLY: Lazy<Vec<Probe>> = Lazy::new(|| {
    vec![probe(
        Stream::Stderr,
        r"patch does not apply",
        ErrorKind::PatchDoesNotApply,
    )]
});

static COMMIT: Lazy<Vec<Probe>> = Lazy::new(|| {
    vec![
        probe(
            Stream::Stderr,
            r"not possible because you have unmerged files",
            ErrorKind::UnmergedChanges,
        ),
        probe(
            Stream::Stderr,
            r"Please tell me who you are\.",
            ErrorKind::NoUserNameConfigured,
        ),
    ]
});

static MERGE: Lazy<Vec<Probe>> =
    Lazy::new(|| vec![probe(Stream::Stdout, r"(?m)^CONFLICT ", ErrorKind::Conflict)]);

static FETCH: Lazy<Vec<Probe>> = Lazy::new(|| {
    use ErrorKind::*;
    vec![
        probe(
            Stream::Stderr,
            r"No remote repository specified\.",
            NoRemoteRepositorySpecified,
        ),
        probe(
            Stream::Stderr,
            r"Could not read from remote repository",
            RemoteConnectionError,
        ),
        probe(
            Stream::Stderr,
            r"(?i)cannot lock ref|unable to update local ref",
            CantLockRef,
        ),
    ]
});

static PULL: Lazy<Vec<Probe>> = Lazy::new(|| {
    use ErrorKind::*;
    vec![
        probe(Stream::Stdout, r"(?m)^CONFLICT \([^)]+\): \b", Conflict),
        probe(Stream::Stderr, r"Please tell me who you are\.", NoUserNameConfigured),
        probe(
            Stream::Stderr,
            r"Could not read from remote repository",
            RemoteConnectionError,
        ),
        probe(Stream::Stderr, PULL_DIRTY, DirtyWorkTree),
        probe(
            Stream::Stderr,
            r"(?i)cannot lock ref|unable to update local ref",
            CantLockRef,
        ),
        probe(
            Stream::Stderr,
            r"(?i)cannot rebase onto multiple branches",
            CantRebaseMultipleBranches,
        ),
    ]
});

static REBASE: Lazy<Vec<Probe>> = Lazy::new(|| {
    use ErrorKind::*;
    vec![
        probe(Stream::Stdout, r"(?m)^CONFLICT \([^)]+\): \b", Conflict),
        probe(
            Stream::Stderr,
            r"(?i)cannot rebase onto multiple branches",
            CantRebaseMultipleBranches,
        ),
    ]
});

static PUSH: Lazy<Vec<Probe>> = Lazy::new(|| {
    use ErrorKind::*;
    vec![
        probe(
            Stream::Stderr,
            r"(?m)^error: failed to push some refs to\b",
            PushRejected,
        ),
        probe(
            Stream::Stderr,
            r"Could not read from remote repository",
            RemoteConnectionError,
        ),
        probe(
            Stream::Stderr,
            r"(?m)^fatal: The current branch .* has no upstream branch",
            NoUpstreamBranch,
        ),
        probe(Stream::Stderr, r"Permission.*denied", PermissionDenied),
    ]
});

static BLAME: Lazy<Vec<Probe>> =
    Lazy::new(|| vec![probe(Stream::Stderr, r"(?m)^fatal: no such path", ErrorKind::NoPathFound)]);

static STASH_PUSH: Lazy<Vec<Probe>> = Lazy::new(|| {
    vec![probe(
        Stream::Stderr,
        r"No local changes to save",
        ErrorKind::NoLocalChanges,
    )]
});

static STASH_RESTORE: Lazy<Vec<Probe>> = Lazy::new(|| {
    use ErrorKind::*;
    vec![
        probe(Stream::Stderr, r"No stash (?:entries )?found", NoStashFound),
        probe(
            Stream::Stderr,
            r"error: Your local changes to the following files would be overwritten",
            LocalChangesOverwritten,
        ),
        probe(Stream::Stdout, r"(?m)^CONFLICT", StashConflict),
    ]
});

static STASH_DROP: Lazy<Vec<Probe>> =
    Lazy::new(|| vec![probe(Stream::Stderr, r"No stash (?:entries )?found", ErrorKind::NoStashFound)]);

static RESET_NEEDS_MERGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^:]+: needs merge\n)+").expect("valid needs-merge regex"));

fn verb_probes(ctx: &ClassifyContext<'_>) -> &'static [Probe] {
    match ctx.verb {
        "show" => SHOW.as_slice(),
        "apply" => APPLY.as_slice(),
        "commit" => COMMIT.as_slice(),
        "merge" => MERGE.as_slice(),
        "fetch" => FETCH.as_slice(),
        "pull" => PULL.as_slice(),
        "rebase" => REBASE.as_slice(),
        "push" => PUSH.as_slice(),
        "blame" => BLAME.as_slice(),
        "stash" => match ctx.subcommand() {
            Some("push") | None => STASH_PUSH.as_slice(),
            Some("pop") | Some("apply") => STASH_RESTORE.as_slice(),
            Some("drop") => STASH_DROP.as_slice(),
            Some(_) => &[],
        },
        _ => &[],
    }
}

// ---------------------------------------------------------------------------
// 2. Public API
// ---------------------------------------------------------------------------

/// Maps a failed invocation to its semantic kind, if any probe recognizes it.
///
/// `exit_code` is `None` when the process did not run to completion. The
/// function never panics on input text.
pub fn classify(
    exit_code: Option<i32>,
    stdout: &str,
    stderr: &str,
    ctx: &ClassifyContext<'_>,
) -> Option<ErrorKind> {
    if exit_code == Some(0) {
        return None;
    }
    verb_probes(ctx)
        .iter()
        .chain(GLOBAL.iter())
        .find(|p| {
            let text = match p.stream {
                Stream::Stdout => stdout,
                Stream::Stderr => stderr,
            };
            p.pattern.is_match(text)
        })
        .map(|p| p.kind)
}

/// `true` when a non-zero exit is an idempotent no-op that should count as success.
pub fn is_benign(ctx: &ClassifyContext<'_>, stdout: &str, stderr: &str) -> bool {
    match ctx.verb {
        "reset" => RESET_NEEDS_MERGE.is_match(stdout),
        "checkout" => {
            let discarding_all = ctx.args.iter().any(|a| a == "--") && ctx.args.iter().any(|a| a == ".");
            discarding_all && stderr.contains("did not match any file(s) known to git")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn run(parts: &[&str], stdout: &str, stderr: &str) -> Option<ErrorKind> {
        let argv = argv(parts);
        classify(Some(1), stdout, stderr, &ClassifyContext::from_argv(&argv))
    }

    #[test]
    fn every_probe_compiles() {
        for table in [
            &*GLOBAL, &*SHOW, &*APPLY, &*COMMIT, &*MERGE, &*FETCH, &*PULL, &*REBASE, &*PUSH,
            &*BLAME, &*STASH_PUSH, &*STASH_RESTORE, &*STASH_DROP,
        ] {
            assert!(!table.is_empty());
        }
        Lazy::force(&RESET_NEEDS_MERGE);
    }

    #[rstest]
    #[case(&["status"], "fatal: Unable to create '/r/.git/index.lock': File exists.\n\nAnother git process seems to be running in this repository", ErrorKind::RepositoryIsLocked)]
    #[case(&["fetch"], "remote: authentication failed for 'https://x'", ErrorKind::AuthenticationFailed)]
    #[case(&["status"], "fatal: not a git repository (or any of the parent directories): .git", ErrorKind::NotAGitRepository)]
    #[case(&["status"], "fatal: bad config file line 3 in .git/config", ErrorKind::BadConfigFile)]
    #[case(&["ls-remote"], "ERROR: Repository not found.", ErrorKind::RepositoryNotFound)]
    #[case(&["branch", "-d", "x"], "error: The branch 'x' is not fully merged.", ErrorKind::BranchNotFullyMerged)]
    #[case(&["branch", "x"], "fatal: A branch named 'x' already exists.", ErrorKind::BranchAlreadyExists)]
    #[case(&["branch", "dev"], "fatal: a branch named 'dev' already exists", ErrorKind::BranchAlreadyExists)]
    #[case(&["branch", "-d", "x"], "error: the branch 'x' is not fully merged", ErrorKind::BranchNotFullyMerged)]
    #[case(&["branch", "a..b"], "fatal: 'a..b' is not a valid branch name.", ErrorKind::InvalidBranchName)]
    #[case(&["checkout", "dev"], "Please commit your changes or stash them before you switch branches.", ErrorKind::DirtyWorkTree)]
    fn global_probes(#[case] parts: &[&str], #[case] stderr: &str, #[case] expected: ErrorKind) {
        assert_eq!(run(parts, "", stderr), Some(expected));
    }

    #[test]
    fn merge_conflict_is_read_from_stdout() {
        let stdout = "Auto-merging a.txt\nCONFLICT (content): Merge conflict in a.txt\n";
        assert_eq!(run(&["merge", "dev"], stdout, ""), Some(ErrorKind::Conflict));
    }

    #[test]
    fn stash_pop_conflict_is_a_stash_conflict() {
        let stdout = "CONFLICT (content): Merge conflict in a.txt\n";
        assert_eq!(
            run(&["stash", "pop", "--index"], stdout, ""),
            Some(ErrorKind::StashConflict)
        );
    }

    #[test]
    fn stash_subcommands_are_scoped() {
        assert_eq!(
            run(&["stash", "push"], "", "No local changes to save"),
            Some(ErrorKind::NoLocalChanges)
        );
        assert_eq!(
            run(&["stash", "drop", "stash@{3}"], "", "error: No stash found."),
            Some(ErrorKind::NoStashFound)
        );
        assert_eq!(
            run(
                &["stash", "apply"],
                "",
                "error: Your local changes to the following files would be overwritten by merge"
            ),
            Some(ErrorKind::LocalChangesOverwritten)
        );
    }

    #[test]
    fn pull_lock_contention_is_cant_lock_ref() {
        assert_eq!(
            run(&["pull"], "", "error: cannot lock ref 'refs/remotes/origin/main'"),
            Some(ErrorKind::CantLockRef)
        );
    }

    #[test]
    fn pull_dirty_tree_beats_global_probe() {
        let stderr = "error: Your local changes to the following files would be overwritten by merge:\n\ta.txt\nPlease commit your changes or stash them before you merge.";
        assert_eq!(run(&["pull"], "", stderr), Some(ErrorKind::DirtyWorkTree));
    }

    #[test]
    fn push_probes() {
        assert_eq!(
            run(&["push"], "", "error: failed to push some refs to 'origin'"),
            Some(ErrorKind::PushRejected)
        );
        assert_eq!(
            run(
                &["push"],
                "",
                "fatal: The current branch dev has no upstream branch."
            ),
            Some(ErrorKind::NoUpstreamBranch)
        );
        assert_eq!(
            run(&["push"], "", "Permission to x/y.git denied to z."),
            Some(ErrorKind::PermissionDenied)
        );
    }

    #[test]
    fn verb_probe_does_not_leak_to_other_verbs() {
        assert_eq!(run(&["log"], "", "fatal: no such path 'a'"), None);
        assert_eq!(
            run(&["blame", "a"], "", "fatal: no such path 'a' in HEAD"),
            Some(ErrorKind::NoPathFound)
        );
    }

    #[test]
    fn config_overrides_do_not_hide_the_verb() {
        assert_eq!(
            run(
                &["-c", "user.useConfigOnly=true", "commit", "--quiet"],
                "",
                "error: Committing is not possible because you have unmerged files."
            ),
            Some(ErrorKind::UnmergedChanges)
        );
    }

    #[test]
    fn success_and_unknown_text_yield_none() {
        let argv = argv(&["status"]);
        let ctx = ClassifyContext::from_argv(&argv);
        assert_eq!(classify(Some(0), "", "Not a git repository", &ctx), None);
        assert_eq!(classify(Some(128), "", "something odd", &ctx), None);
        assert_eq!(classify(None, "", "", &ClassifyContext::default()), None);
    }

    #[test]
    fn benign_reset_and_checkout() {
        let reset = argv(&["reset", "-q", "HEAD", "--", "a"]);
        assert!(is_benign(
            &ClassifyContext::from_argv(&reset),
            "a: needs merge\nb: needs merge\n",
            ""
        ));
        let checkout = argv(&["checkout", "--", "."]);
        assert!(is_benign(
            &ClassifyContext::from_argv(&checkout),
            "",
            "error: pathspec '.' did not match any file(s) known to git"
        ));
        let commit = argv(&["commit"]);
        assert!(!is_benign(&ClassifyContext::from_argv(&commit), "", "x"));
    }

    #[test]
    fn silent_clean_failure_is_not_benign() {
        let clean = argv(&["clean", "-f", "-q", "--", "a.txt"]);
        assert!(!is_benign(&ClassifyContext::from_argv(&clean), "", ""));
    }
}
