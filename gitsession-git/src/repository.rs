//! One working copy's command surface.
//!
//! Each method maps to a single tool verb (occasionally two, e.g. staging
//! contents is `hash-object` then `update-index`). Nothing here tracks
//! concurrency or model state; that is the session's job.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use gitsession_core::parse::{
    self, BRANCH_FORMAT, COMMIT_FORMAT, REF_FORMAT,
};
use gitsession_core::status::StatusEntry;
use gitsession_core::{
    Branch, BranchSortOrder, Commit, ErrorKind, LogOptions, ObjectDetails, Ref, RefType, Remote,
    Stash, StatusParser, Submodule,
};

use crate::error::{io_err, GitError};
use crate::executor::{ExecOptions, ExecOutput, Git};

/// Chunks `clean` may run at once.
const CLEAN_CONCURRENCY: usize = 5;

// ---------------------------------------------------------------------------
// 1. Option structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct CommitOptions {
    pub all: bool,
    pub amend: bool,
    pub signoff: bool,
    pub empty: bool,
    pub no_verify: bool,
    /// Adds `-c user.useConfigOnly=true`.
    pub require_user_config: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub remote: Option<String>,
    pub refspec: Option<String>,
    pub all: bool,
    pub prune: bool,
    pub depth: Option<u32>,
    /// Background fetch: sets `GITSESSION_FETCH_SILENT`.
    pub silent: bool,
    pub cancel: Option<CancellationToken>,
}

#[derive(Debug, Clone, Default)]
pub struct PullOptions {
    pub rebase: bool,
    pub remote: Option<String>,
    pub branch: Option<String>,
    pub tags: bool,
    pub cancel: Option<CancellationToken>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PushTags {
    #[default]
    None,
    Follow,
    All,
}

#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    pub remote: Option<String>,
    pub name: Option<String>,
    pub set_upstream: bool,
    pub tags: PushTags,
    pub force: bool,
    pub cancel: Option<CancellationToken>,
}

#[derive(Debug, Clone, Default)]
pub struct CheckoutOptions {
    pub track: bool,
    pub detached: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffTarget {
    /// Working tree against the index.
    WorkingTree { path: Option<String> },
    /// Index against HEAD.
    Index { path: Option<String> },
    /// Working tree against a revision.
    WithRef { rev: String, path: Option<String> },
    Between { from: String, to: String, path: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteAction {
    Add,
    Remove,
    Rename,
}

/// Output of one streamed status pass.
#[derive(Debug, Clone, Default)]
pub struct StatusListing {
    pub entries: Vec<StatusEntry>,
    pub did_hit_limit: bool,
}

// ---------------------------------------------------------------------------
// 2. Repository
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Repository {
    git: Arc<Git>,
    root: PathBuf,
    dot_git: PathBuf,
}

fn strings<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl Repository {
    pub fn new(git: Arc<Git>, root: impl Into<PathBuf>, dot_git: impl Into<PathBuf>) -> Self {
        Repository {
            git,
            root: root.into(),
            dot_git: dot_git.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dot_git(&self) -> &Path {
        &self.dot_git
    }

    pub fn git(&self) -> &Arc<Git> {
        &self.git
    }

    fn opts(&self) -> ExecOptions {
        ExecOptions::in_dir(&self.root)
    }

    /// `git <args>` in the working copy.
    pub async fn exec<I, S>(&self, args: I) -> Result<ExecOutput, GitError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.git.exec(args, &self.opts()).await
    }

    async fn exec_with(&self, args: Vec<String>, opts: ExecOptions) -> Result<ExecOutput, GitError> {
        self.git.exec(args, &opts).await
    }

    /// Path relative to the root, with `/` separators, for argv use.
    pub fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.to_string_lossy().replace('\\', "/")
    }

    fn relative_all(&self, paths: &[PathBuf]) -> Vec<String> {
        paths.iter().map(|p| self.relative(p)).collect()
    }

    // -----------------------------------------------------------------------
    // 2a. Status and metadata
    // -----------------------------------------------------------------------

    /// Streams `status -z --untracked-files=no` through the incremental parser,
    /// killing the child once `limit` entries have been read.
    pub async fn status(
        &self,
        ignore_submodules: bool,
        limit: usize,
        cancel: Option<CancellationToken>,
    ) -> Result<StatusListing, GitError> {
        let mut args = strings(["status", "-z", "--untracked-files=no"]);
        if ignore_submodules {
            args.push("--ignore-submodules".into());
        }
        let opts = self.opts().cancel(cancel);
        let mut child = self.git.stream(args, &opts).await?;
        let mut parser = StatusParser::new();
        let mut did_hit_limit = false;

        while let Some(record) = child.next_record(b'\0').await? {
            parser.push_record(&record);
            if parser.len() > limit {
                did_hit_limit = true;
                child.kill();
                break;
            }
        }
        child.finish().await?;

        let mut entries = parser.finish();
        entries.truncate(limit);
        Ok(StatusListing {
            entries,
            did_hit_limit,
        })
    }

    /// Untracked paths via `ls-files -z --others --exclude-standard`.
    pub async fn untracked(&self, cancel: Option<CancellationToken>) -> Result<Vec<String>, GitError> {
        let out = self
            .exec_with(
                strings(["ls-files", "-z", "--others", "--exclude-standard"]),
                self.opts().cancel(cancel),
            )
            .await?;
        Ok(out
            .stdout
            .split('\0')
            .filter(|p| !p.is_empty())
            .map(str::to_owned)
            .collect())
    }

    /// HEAD as a named branch (with upstream and counts) or a detached commit.
    pub async fn get_head(&self) -> Result<Branch, GitError> {
        match self.exec(["symbolic-ref", "--short", "HEAD"]).await {
            Ok(out) => {
                let name = out.stdout.trim();
                if name.is_empty() {
                    return Err(GitError::new("symbolic-ref returned an empty name"));
                }
                self.branch_details(name).await
            }
            Err(_) => {
                let out = self.exec(["rev-parse", "HEAD"]).await?;
                let commit = out.stdout.trim();
                if commit.is_empty() {
                    return Err(GitError::new("Error parsing HEAD"));
                }
                Ok(Branch::detached(commit))
            }
        }
    }

    /// A local branch with its upstream and ahead/behind counts.
    pub async fn get_branch(&self, name: &str) -> Result<Branch, GitError> {
        if name == "HEAD" {
            return self.get_head().await;
        }
        self.branch_details(name).await
    }

    async fn branch_details(&self, name: &str) -> Result<Branch, GitError> {
        let refname = format!("refs/heads/{name}");
        let out = self
            .exec(strings([
                "for-each-ref".to_string(),
                "--format".to_string(),
                BRANCH_FORMAT.to_string(),
                refname,
            ]))
            .await?;
        if let Some(branch) = out.stdout.lines().find_map(parse::parse_branch_details) {
            return Ok(branch);
        }
        // Unborn branch: the name exists only as HEAD's target.
        let mut branch = Branch::named(name);
        if let Ok(out) = self.exec(["rev-parse", name]).await {
            let commit = out.stdout.trim();
            if !commit.is_empty() {
                branch.commit = Some(commit.to_owned());
            }
        }
        Ok(branch)
    }

    pub async fn get_refs(&self, sort: BranchSortOrder) -> Result<Vec<Ref>, GitError> {
        let mut args = strings(["for-each-ref", "--format", REF_FORMAT]);
        if sort == BranchSortOrder::Committerdate {
            args.extend(strings(["--sort", "-committerdate"]));
        }
        let out = self.exec(args).await?;
        Ok(parse::parse_refs(&out.stdout))
    }

    /// Local and remote branches, skipping tags.
    pub async fn get_branches(&self, sort: BranchSortOrder) -> Result<Vec<Ref>, GitError> {
        Ok(self
            .get_refs(sort)
            .await?
            .into_iter()
            .filter(|r| r.ref_type != RefType::Tag)
            .collect())
    }

    /// Local branches whose upstream is `upstream` (`origin/main`).
    pub async fn find_tracking_branches(&self, upstream: &str) -> Result<Vec<Branch>, GitError> {
        let out = self
            .exec(["for-each-ref", "--format", "%(refname:short)%00%(upstream:short)", "refs/heads"])
            .await?;
        Ok(out
            .stdout
            .lines()
            .filter_map(|line| {
                let (name, up) = line.split_once('\0')?;
                (up == upstream).then(|| Branch::named(name))
            })
            .collect())
    }

    pub async fn get_remotes(&self) -> Result<Vec<Remote>, GitError> {
        let out = self.exec(["remote", "--verbose"]).await?;
        Ok(parse::parse_remotes(&out.stdout))
    }

    /// Submodules declared in `.gitmodules`; none when the file is absent.
    pub async fn get_submodules(&self) -> Result<Vec<Submodule>, GitError> {
        let path = self.root.join(".gitmodules");
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(parse::parse_gitmodules(&raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(io_err(path, e).into()),
        }
    }

    /// The commit being replayed when a rebase is in progress.
    pub async fn get_rebase_commit(&self) -> Result<Option<Commit>, GitError> {
        let in_progress = tokio::fs::try_exists(self.dot_git.join("rebase-apply"))
            .await
            .unwrap_or(false)
            || tokio::fs::try_exists(self.dot_git.join("rebase-merge"))
                .await
                .unwrap_or(false);
        if !in_progress {
            return Ok(None);
        }
        let head = self.dot_git.join("REBASE_HEAD");
        let hash = match tokio::fs::read_to_string(&head).await {
            Ok(raw) => raw.trim().to_owned(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(head, e).into()),
        };
        if hash.is_empty() {
            return Ok(None);
        }
        self.get_commit(&hash).await.map(Some)
    }

    pub async fn get_commit(&self, rev: &str) -> Result<Commit, GitError> {
        let out = self
            .exec(strings([
                "show".to_string(),
                "-s".to_string(),
                format!("--format={COMMIT_FORMAT}"),
                "-z".to_string(),
                rev.to_string(),
            ]))
            .await?;
        parse::parse_commits(&out.stdout)
            .into_iter()
            .next()
            .ok_or_else(|| GitError::new(format!("bad commit format for {rev}")))
    }

    pub async fn get_commit_template(&self) -> Result<String, GitError> {
        let out = match self.exec(["config", "--get", "commit.template"]).await {
            Ok(out) => out,
            // `config --get` exits 1 when the key is unset.
            Err(e) if e.exit_code == Some(1) => return Ok(String::new()),
            Err(e) => return Err(e),
        };
        let raw = out.stdout.trim();
        if raw.is_empty() {
            return Ok(String::new());
        }
        let path = expand_home(raw);
        let path = if path.is_relative() {
            self.root.join(path)
        } else {
            path
        };
        let template = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| GitError::from(io_err(&path, e)))?;
        Ok(parse::strip_commit_template(&template))
    }

    pub async fn get_config(&self, key: &str) -> Result<Option<String>, GitError> {
        match self.exec(["config", "--get", key]).await {
            Ok(out) => Ok(Some(out.stdout.trim().to_owned())),
            Err(e) if e.exit_code == Some(1) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn set_config(&self, key: &str, value: &str) -> Result<(), GitError> {
        self.exec(["config", "--local", key, value]).await?;
        Ok(())
    }

    /// Object id, mode and size of `path` at `treeish`; an empty `treeish`
    /// means the index.
    pub async fn get_object_details(
        &self,
        treeish: &str,
        path: &Path,
    ) -> Result<ObjectDetails, GitError> {
        let rel = self.relative(path);
        if treeish.is_empty() {
            let out = self.exec(["ls-files", "--stage", "--", rel.as_str()]).await?;
            let mut details = parse::parse_ls_files(&out.stdout)
                .ok_or_else(|| GitError::new("Path not known by git").with_kind(ErrorKind::UnknownPath))?;
            let size = self.exec(["cat-file", "-s", details.object.as_str()]).await?;
            let raw = size.stdout.trim();
            details.size = raw
                .parse()
                .map_err(|_| GitError::new(format!("unexpected object size {raw:?}")))?;
            return Ok(details);
        }
        let out = self.exec(["ls-tree", "-l", treeish, "--", rel.as_str()]).await?;
        parse::parse_ls_tree(&out.stdout)
            .ok_or_else(|| GitError::new("Path not known by git").with_kind(ErrorKind::UnknownPath))
    }

    pub async fn get_stashes(&self) -> Result<Vec<Stash>, GitError> {
        let out = self.exec(["stash", "list"]).await?;
        Ok(parse::parse_stashes(&out.stdout))
    }

    /// Paths from `paths` that are ignored.
    pub async fn check_ignore(&self, paths: &[PathBuf]) -> Result<HashSet<PathBuf>, GitError> {
        let input = self.relative_all(paths).join("\0");
        let opts = self.opts().stdin(input);
        match self
            .exec_with(strings(["check-ignore", "-z", "--stdin"]), opts)
            .await
        {
            Ok(out) => Ok(out
                .stdout
                .split('\0')
                .filter(|p| !p.is_empty())
                .map(|p| self.root.join(p))
                .collect()),
            // Exit code 1: nothing is ignored.
            Err(e) if e.exit_code == Some(1) && e.stderr.trim().is_empty() => Ok(HashSet::new()),
            Err(e) => Err(e),
        }
    }

    // -----------------------------------------------------------------------
    // 2b. History and content
    // -----------------------------------------------------------------------

    pub async fn log(&self, options: &LogOptions) -> Result<Vec<Commit>, GitError> {
        let mut args = strings(["log".to_string(), format!("--format={COMMIT_FORMAT}"), "-z".to_string()]);
        if let Some(n) = options.max_entries {
            args.push(format!("-n{n}"));
        }
        if options.reverse {
            args.push("--reverse".into());
        }
        if let Some(range) = &options.range {
            args.push(range.clone());
        }
        if let Some(path) = &options.path {
            args.push("--".into());
            args.push(self.relative(path));
        }
        match self.exec(args).await {
            Ok(out) => Ok(parse::parse_commits(&out.stdout)),
            // An unborn branch has no history yet.
            Err(e) if e.stderr.contains("does not have any commits yet") => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// History of one file, following renames.
    pub async fn log_file(&self, path: &Path, max_entries: Option<u32>) -> Result<Vec<Commit>, GitError> {
        let mut args = strings(["log".to_string(), format!("--format={COMMIT_FORMAT}"), "-z".to_string(), "--follow".to_string()]);
        if let Some(n) = max_entries {
            args.push(format!("-n{n}"));
        }
        args.push("--".into());
        args.push(self.relative(path));
        let out = self.exec(args).await?;
        Ok(parse::parse_commits(&out.stdout))
    }

    pub async fn blame(&self, path: &Path) -> Result<String, GitError> {
        let rel = self.relative(path);
        let out = self.exec(["blame", "--", rel.as_str()]).await?;
        Ok(out.stdout)
    }

    pub async fn diff(&self, target: &DiffTarget) -> Result<String, GitError> {
        let (mut args, path) = match target {
            DiffTarget::WorkingTree { path } => (strings(["diff"]), path),
            DiffTarget::Index { path } => (strings(["diff", "--cached"]), path),
            DiffTarget::WithRef { rev, path } => (strings(["diff", rev.as_str()]), path),
            DiffTarget::Between { from, to, path } => {
                (strings(["diff".to_string(), format!("{from}...{to}")]), path)
            }
        };
        if let Some(path) = path {
            args.push("--".into());
            args.push(path.clone());
        }
        Ok(self.exec(args).await?.stdout)
    }

    /// `show <ref>:<path>` contents.
    pub async fn show(&self, rev: &str, path: &Path) -> Result<String, GitError> {
        let spec = format!("{rev}:{}", self.relative(path));
        Ok(self.exec(["show", spec.as_str()]).await?.stdout)
    }

    pub async fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>, GitError> {
        match self.exec(["merge-base", a, b]).await {
            Ok(out) => Ok(Some(out.stdout.trim().to_owned()).filter(|s| !s.is_empty())),
            Err(e) if e.exit_code == Some(1) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn hash_object(&self, data: &str) -> Result<String, GitError> {
        let out = self
            .exec_with(strings(["hash-object", "-w", "--stdin"]), self.opts().stdin(data))
            .await?;
        Ok(out.stdout.trim().to_owned())
    }

    // -----------------------------------------------------------------------
    // 2c. Index and working tree
    // -----------------------------------------------------------------------

    pub async fn add(&self, paths: &[PathBuf]) -> Result<(), GitError> {
        if paths.is_empty() {
            self.exec(["add", "-A"]).await?;
            return Ok(());
        }
        self.git
            .exec_chunked(&strings(["add", "-A", "--"]), &self.relative_all(paths), &self.opts())
            .await?;
        Ok(())
    }

    pub async fn rm(&self, paths: &[PathBuf]) -> Result<(), GitError> {
        if paths.is_empty() {
            return Ok(());
        }
        self.git
            .exec_chunked(&strings(["rm", "--"]), &self.relative_all(paths), &self.opts())
            .await?;
        Ok(())
    }

    /// Writes `data` as the staged content of `path` without touching the file.
    pub async fn stage(&self, path: &Path, data: &str) -> Result<(), GitError> {
        let rel = self.relative(path);
        let mode = match self.get_object_details("", path).await {
            Ok(details) => details.mode,
            Err(_) => "100644".to_string(),
        };
        let hash = self
            .exec_with(
                strings(["hash-object".to_string(), "--stdin".to_string(), "-w".to_string(), format!("--path={rel}")]),
                self.opts().stdin(data),
            )
            .await?;
        let cacheinfo = format!("{mode},{},{rel}", hash.stdout.trim());
        self.exec(["update-index", "--add", "--cacheinfo", cacheinfo.as_str()])
            .await?;
        Ok(())
    }

    pub async fn apply(&self, patch: &Path, reverse: bool) -> Result<(), GitError> {
        let mut args = strings(["apply"]);
        if reverse {
            args.push("-R".into());
        }
        args.push(patch.to_string_lossy().into_owned());
        self.exec(args).await?;
        Ok(())
    }

    pub async fn checkout(
        &self,
        treeish: &str,
        paths: &[PathBuf],
        options: &CheckoutOptions,
    ) -> Result<(), GitError> {
        let mut prefix = strings(["checkout", "-q"]);
        if options.track {
            prefix.push("--track".into());
        }
        if options.detached {
            prefix.push("--detach".into());
        }
        if !treeish.is_empty() {
            prefix.push(treeish.to_owned());
        }
        if paths.is_empty() {
            self.exec(prefix).await?;
        } else {
            prefix.push("--".into());
            self.git
                .exec_chunked(&prefix, &self.relative_all(paths), &self.opts())
                .await?;
        }
        Ok(())
    }

    /// Removes untracked files, up to five chunks at a time.
    pub async fn clean(&self, paths: &[PathBuf]) -> Result<(), GitError> {
        if paths.is_empty() {
            return Ok(());
        }
        self.git
            .exec_chunked_concurrent(
                &strings(["clean", "-f", "-q", "--"]),
                &self.relative_all(paths),
                &self.opts(),
                CLEAN_CONCURRENCY,
            )
            .await?;
        Ok(())
    }

    /// `reset -q <treeish> -- <paths>`: unstages without touching the tree.
    pub async fn revert_files(&self, treeish: &str, paths: &[PathBuf]) -> Result<(), GitError> {
        let mut prefix = strings(["reset", "-q", treeish]);
        if paths.is_empty() {
            self.exec(prefix).await?;
            return Ok(());
        }
        prefix.push("--".into());
        self.git
            .exec_chunked(&prefix, &self.relative_all(paths), &self.opts())
            .await?;
        Ok(())
    }

    pub async fn reset(&self, treeish: &str, hard: bool) -> Result<(), GitError> {
        let mut args = strings(["reset"]);
        if hard {
            args.push("--hard".into());
        }
        args.push(treeish.to_owned());
        self.exec(args).await?;
        Ok(())
    }

    pub async fn move_path(&self, from: &Path, to: &Path) -> Result<(), GitError> {
        let (from, to) = (self.relative(from), self.relative(to));
        self.exec(["mv", from.as_str(), to.as_str()]).await?;
        Ok(())
    }

    /// Appends the paths to the root `.gitignore`.
    pub async fn ignore(&self, paths: &[PathBuf]) -> Result<(), GitError> {
        let gitignore = self.root.join(".gitignore");
        let mut body = match tokio::fs::read_to_string(&gitignore).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(io_err(&gitignore, e).into()),
        };
        if !body.is_empty() && !body.ends_with('\n') {
            body.push('\n');
        }
        for path in paths {
            body.push_str(&self.relative(path).replace(' ', "\\ "));
            body.push('\n');
        }
        tokio::fs::write(&gitignore, body)
            .await
            .map_err(|e| GitError::from(io_err(&gitignore, e)))
    }

    pub async fn commit(&self, message: &str, options: &CommitOptions) -> Result<(), GitError> {
        let mut args = Vec::new();
        if options.require_user_config {
            args.extend(strings(["-c", "user.useConfigOnly=true"]));
        }
        args.extend(strings(["commit", "--quiet", "--allow-empty-message"]));
        if options.all {
            args.push("--all".into());
        }
        if options.amend {
            args.push("--amend".into());
        }
        if options.signoff {
            args.push("--signoff".into());
        }
        if options.empty {
            args.push("--allow-empty".into());
        }
        if options.no_verify {
            args.push("--no-verify".into());
        }
        args.extend(strings(["--file", "-"]));

        match self.exec_with(args, self.opts().stdin(message)).await {
            Ok(_) => Ok(()),
            Err(err) => Err(self.refine_commit_error(err).await),
        }
    }

    /// A commit rejected for a missing identity is checked against the
    /// identity configuration to name the absent key.
    async fn refine_commit_error(&self, mut err: GitError) -> GitError {
        if !asks_for_identity(&err.stderr) {
            return err;
        }
        if !self.has_config_value("user.name").await {
            err.kind = Some(ErrorKind::NoUserNameConfigured);
        } else if !self.has_config_value("user.email").await {
            err.kind = Some(ErrorKind::NoUserEmailConfigured);
        }
        err
    }

    async fn has_config_value(&self, key: &str) -> bool {
        matches!(
            self.exec(["config", "--get-all", key]).await,
            Ok(out) if !out.stdout.trim().is_empty()
        )
    }

    // -----------------------------------------------------------------------
    // 2d. Branches, tags, stashes
    // -----------------------------------------------------------------------

    pub async fn branch(&self, name: &str, checkout: bool, from: Option<&str>) -> Result<(), GitError> {
        let mut args = if checkout {
            strings(["checkout", "-q", "-b", name])
        } else {
            strings(["branch", name])
        };
        if let Some(from) = from {
            args.push(from.to_owned());
        }
        self.exec(args).await?;
        Ok(())
    }

    pub async fn delete_branch(&self, name: &str, force: bool) -> Result<(), GitError> {
        self.exec(["branch", if force { "-D" } else { "-d" }, name]).await?;
        Ok(())
    }

    pub async fn rename_branch(&self, name: &str) -> Result<(), GitError> {
        self.exec(["branch", "-m", name]).await?;
        Ok(())
    }

    pub async fn set_branch_upstream(&self, name: &str, upstream: &str) -> Result<(), GitError> {
        self.exec(["branch", "--set-upstream-to", upstream, name]).await?;
        Ok(())
    }

    pub async fn delete_ref(&self, refname: &str) -> Result<(), GitError> {
        self.exec(["update-ref", "-d", refname]).await?;
        Ok(())
    }

    pub async fn tag(&self, name: &str, message: Option<&str>) -> Result<(), GitError> {
        let args = match message {
            Some(message) => strings(["tag", "-a", name, "-m", message]),
            None => strings(["tag", name]),
        };
        self.exec(args).await?;
        Ok(())
    }

    pub async fn delete_tag(&self, name: &str) -> Result<(), GitError> {
        self.exec(["tag", "-d", name]).await?;
        Ok(())
    }

    pub async fn merge(&self, rev: &str) -> Result<(), GitError> {
        self.exec(["merge", rev]).await?;
        Ok(())
    }

    pub async fn cherry_pick(&self, commit: &str) -> Result<(), GitError> {
        self.exec(["cherry-pick", commit]).await?;
        Ok(())
    }

    pub async fn rebase(&self, onto: &str) -> Result<(), GitError> {
        self.exec(["rebase", onto]).await?;
        Ok(())
    }

    pub async fn rebase_abort(&self) -> Result<(), GitError> {
        self.exec(["rebase", "--abort"]).await?;
        Ok(())
    }

    pub async fn rebase_continue(&self) -> Result<(), GitError> {
        self.exec_with(
            strings(["rebase", "--continue"]),
            self.opts().env("GIT_EDITOR", "true"),
        )
        .await?;
        Ok(())
    }

    pub async fn stash(&self, message: Option<&str>, include_untracked: bool) -> Result<(), GitError> {
        let mut args = strings(["stash", "push"]);
        if include_untracked {
            args.push("-u".into());
        }
        if let Some(message) = message {
            args.extend(strings(["-m", message]));
        }
        self.exec(args).await?;
        Ok(())
    }

    async fn restore_stash(&self, verb: &str, index: Option<u32>) -> Result<(), GitError> {
        let mut args = strings(["stash", verb]);
        if let Some(i) = index {
            args.push(format!("stash@{{{i}}}"));
        }
        self.exec(args).await?;
        Ok(())
    }

    pub async fn pop_stash(&self, index: Option<u32>) -> Result<(), GitError> {
        self.restore_stash("pop", index).await
    }

    pub async fn apply_stash(&self, index: Option<u32>) -> Result<(), GitError> {
        self.restore_stash("apply", index).await
    }

    /// Drops one stash, or every stash when `index` is `None`.
    pub async fn drop_stash(&self, index: Option<u32>) -> Result<(), GitError> {
        let args = match index {
            Some(i) => strings(["stash".to_string(), "drop".to_string(), format!("stash@{{{i}}}")]),
            None => strings(["stash", "clear"]),
        };
        self.exec(args).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // 2e. Remotes
    // -----------------------------------------------------------------------

    pub async fn fetch(&self, options: &FetchOptions) -> Result<(), GitError> {
        let mut args = strings(["fetch"]);
        if options.all {
            args.push("--all".into());
        } else if let Some(remote) = &options.remote {
            args.push(remote.clone());
            if let Some(refspec) = &options.refspec {
                args.push(refspec.clone());
            }
        }
        if options.prune {
            args.push("--prune".into());
        }
        if let Some(depth) = options.depth {
            args.push(format!("--depth={depth}"));
        }
        let mut opts = self.opts().cancel(options.cancel.clone());
        if options.silent {
            opts = opts.env("GITSESSION_FETCH_SILENT", "true");
        }
        self.exec_with(args, opts).await?;
        Ok(())
    }

    pub async fn pull(&self, options: &PullOptions) -> Result<(), GitError> {
        let mut args = strings(["pull"]);
        if options.tags {
            args.push("--tags".into());
        }
        if options.rebase {
            args.push("-r".into());
        }
        if let (Some(remote), Some(branch)) = (&options.remote, &options.branch) {
            args.push(remote.clone());
            args.push(branch.clone());
        }
        self.exec_with(args, self.opts().cancel(options.cancel.clone()))
            .await?;
        Ok(())
    }

    pub async fn push(&self, options: &PushOptions) -> Result<(), GitError> {
        let mut args = strings(["push"]);
        if options.force {
            args.push("--force-with-lease".into());
        }
        if options.set_upstream {
            args.push("-u".into());
        }
        match options.tags {
            PushTags::Follow => args.push("--follow-tags".into()),
            PushTags::All => args.push("--tags".into()),
            PushTags::None => {}
        }
        if let Some(remote) = &options.remote {
            args.push(remote.clone());
        }
        if let Some(name) = &options.name {
            args.push(name.clone());
        }
        self.exec_with(args, self.opts().cancel(options.cancel.clone()))
            .await?;
        Ok(())
    }

    pub async fn remote(&self, action: RemoteAction, name: &str, arg: Option<&str>) -> Result<(), GitError> {
        let mut args = match action {
            RemoteAction::Add => strings(["remote", "add", name]),
            RemoteAction::Remove => strings(["remote", "remove", name]),
            RemoteAction::Rename => strings(["remote", "rename", name]),
        };
        if let Some(arg) = arg {
            args.push(arg.to_owned());
        }
        self.exec(args).await?;
        Ok(())
    }

    pub async fn submodule_update(&self, paths: &[PathBuf]) -> Result<(), GitError> {
        if paths.is_empty() {
            self.exec(["submodule", "update"]).await?;
            return Ok(());
        }
        self.git
            .exec_chunked(
                &strings(["submodule", "update", "--"]),
                &self.relative_all(paths),
                &self.opts(),
            )
            .await?;
        Ok(())
    }
}

fn expand_home(raw: &str) -> PathBuf {
    match raw.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(raw)),
        None => PathBuf::from(raw),
    }
}

/// Stderr lines git prints when it cannot work out the committer identity.
const IDENTITY_PROMPTS: &[&str] = &[
    "Please tell me who you are",
    "no email was given and auto-detection is disabled",
    "no name was given and auto-detection is disabled",
    "empty ident name",
    "unable to auto-detect email address",
];

fn asks_for_identity(stderr: &str) -> bool {
    IDENTITY_PROMPTS.iter().any(|prompt| stderr.contains(prompt))
}
