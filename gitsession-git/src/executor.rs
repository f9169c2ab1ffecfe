//! Process executor.
//!
//! Two capture modes:
//! - [`Git::exec`] buffers stdout and stderr and resolves once the child exits.
//! - [`Git::stream`] hands back a [`StreamedChild`] whose stdout is read
//!   record by record; it can be killed early.
//!
//! Both modes honor an optional [`CancellationToken`]: when it fires the child
//! is killed (`kill_on_drop`) and the call resolves with a `Cancelled` error.
//! Every failure is classified here, once.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use gitsession_core::{classify, is_benign, ClassifyContext, ErrorKind, SessionConfig};

use crate::chunk::{argv_len, split_in_chunks};
use crate::error::{ExecError, GitError};

/// Characters of stdout echoed into the debug log per invocation.
const LOG_STDOUT_CHARS: usize = 150;

/// How long a killed streamed child's stderr may stay open before it is abandoned.
const KILLED_STDERR_GRACE: Duration = Duration::from_millis(500);

/// Verbs that talk to a remote and get the HTTP user agent.
const NETWORK_VERBS: &[&str] = &["fetch", "pull", "push", "clone", "ls-remote"];

static INVOCATION_ID: AtomicU64 = AtomicU64::new(0);

// ---------------------------------------------------------------------------
// 1. Types
// ---------------------------------------------------------------------------

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    pub cwd: Option<PathBuf>,
    /// Written to the child's stdin, which is then closed.
    pub stdin: Option<String>,
    pub env: Vec<(String, String)>,
    pub cancel: Option<CancellationToken>,
}

impl ExecOptions {
    pub fn in_dir(cwd: impl Into<PathBuf>) -> Self {
        ExecOptions {
            cwd: Some(cwd.into()),
            ..Default::default()
        }
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn cancel(mut self, token: Option<CancellationToken>) -> Self {
        self.cancel = token;
        self
    }
}

/// Result of a completed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Handle to the tool binary plus the environment every invocation gets.
#[derive(Debug, Clone)]
pub struct Git {
    path: PathBuf,
    version: String,
    user_agent: String,
    env: Vec<(String, String)>,
    max_cli_length: usize,
}

// ---------------------------------------------------------------------------
// 2. Construction
// ---------------------------------------------------------------------------

impl Git {
    pub fn new(path: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Git {
            path: path.into(),
            version: version.into(),
            user_agent: format!("gitsession/{}", env!("CARGO_PKG_VERSION")),
            env: Vec::new(),
            max_cli_length: 30_000,
        }
    }

    /// Resolves the binary (`config.git_path`, else `PATH`) and reads its version.
    pub async fn find(config: &SessionConfig) -> Result<Git, GitError> {
        let path = match &config.git_path {
            Some(path) => path.clone(),
            None => which::which("git").map_err(|e| {
                GitError::new(format!("git not found on PATH: {e}"))
                    .with_kind(ErrorKind::GitNotFound)
            })?,
        };
        let probe = Git::new(&path, "");
        let out = probe.exec(["--version"], &ExecOptions::default()).await?;
        let version = parse_version(&out.stdout);
        tracing::info!(path = %path.display(), %version, "found git");

        Ok(Git::new(path, version)
            .with_user_agent(config.user_agent.clone())
            .with_max_cli_length(config.max_cli_length))
    }

    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    pub fn with_max_cli_length(mut self, max: usize) -> Self {
        self.max_cli_length = max;
        self
    }

    /// Extra environment applied to every invocation.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn max_cli_length(&self) -> usize {
        self.max_cli_length
    }
}

fn parse_version(raw: &str) -> String {
    raw.trim()
        .strip_prefix("git version ")
        .unwrap_or(raw.trim())
        .to_owned()
}

// ---------------------------------------------------------------------------
// 3. Buffered mode
// ---------------------------------------------------------------------------

impl Git {
    fn command(&self, argv: &[String], opts: &ExecOptions) -> Command {
        let verb = ClassifyContext::from_argv(argv).verb;
        let mut cmd = Command::new(&self.path);
        cmd.args(argv)
            .env("GIT_PAGER", "cat")
            .env("LANG", "en_US.UTF-8")
            .env("LC_ALL", "en_US.UTF-8")
            .env("GITSESSION_COMMAND", verb)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if opts.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);
        // Own process group, so a kill also reaches hooks and helpers git forked.
        #[cfg(unix)]
        cmd.process_group(0);
        if NETWORK_VERBS.contains(&verb) {
            cmd.env("GIT_HTTP_USER_AGENT", &self.user_agent);
        }
        if verb == "status" {
            cmd.env("GIT_OPTIONAL_LOCKS", "0");
        }
        for (k, v) in self.env.iter().chain(&opts.env) {
            cmd.env(k, v);
        }
        if let Some(cwd) = &opts.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }

    fn spawn(&self, argv: &[String], opts: &ExecOptions) -> Result<(Child, u64), GitError> {
        if opts.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(GitError::cancelled().with_argv(argv));
        }
        let id = INVOCATION_ID.fetch_add(1, Ordering::Relaxed);
        let mut child = self.command(argv, opts).spawn().map_err(|source| {
            spawn_error(&self.path, opts.cwd.as_deref(), source).with_argv(argv)
        })?;
        tracing::debug!(id, pid = child.id(), argv = %argv.join(" "), "> git");

        if let (Some(input), Some(mut stdin)) = (opts.stdin.clone(), child.stdin.take()) {
            // Written from a task so a full stdout pipe cannot deadlock the write.
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    tracing::debug!(id, error = %e, "stdin write failed");
                }
            });
        }
        Ok((child, id))
    }

    /// Runs `git <args>` and buffers its output.
    pub async fn exec<I, S>(&self, args: I, opts: &ExecOptions) -> Result<ExecOutput, GitError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv: Vec<String> = args.into_iter().map(Into::into).collect();
        let started = Instant::now();
        let (child, id) = self.spawn(&argv, opts)?;

        let output = tokio::select! {
            out = child.wait_with_output() => out
                .map_err(|e| GitError::from(ExecError::Spawn { program: self.path.clone(), source: e })
                    .with_argv(&argv))?,
            _ = cancelled(opts.cancel.as_ref()) => {
                tracing::debug!(id, "cancelled; child killed");
                return Err(GitError::cancelled().with_argv(&argv));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        complete(id, &argv, started, output.status.code(), stdout, stderr)
    }

    /// Room left for path arguments once `prefix` is on the command line.
    fn path_budget(&self, prefix: &[String]) -> usize {
        self.max_cli_length.saturating_sub(argv_len(prefix))
    }

    /// Runs `prefix + chunk` once per chunk of `paths`, in order, stopping at
    /// the first failure.
    pub async fn exec_chunked(
        &self,
        prefix: &[String],
        paths: &[String],
        opts: &ExecOptions,
    ) -> Result<Vec<ExecOutput>, GitError> {
        let mut outputs = Vec::new();
        for chunk in split_in_chunks(paths, self.path_budget(prefix)) {
            let argv = prefix.iter().cloned().chain(chunk);
            outputs.push(self.exec(argv, opts).await?);
        }
        Ok(outputs)
    }

    /// Like [`Git::exec_chunked`] but with up to `limit` chunks in flight.
    pub async fn exec_chunked_concurrent(
        &self,
        prefix: &[String],
        paths: &[String],
        opts: &ExecOptions,
        limit: usize,
    ) -> Result<Vec<ExecOutput>, GitError> {
        let chunks = split_in_chunks(paths, self.path_budget(prefix));
        stream::iter(chunks)
            .map(|chunk| {
                let argv: Vec<String> = prefix.iter().cloned().chain(chunk).collect();
                async move { self.exec(argv, opts).await }
            })
            .buffer_unordered(limit.max(1))
            .try_collect()
            .await
    }
}

async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

fn spawn_error(program: &Path, cwd: Option<&Path>, source: std::io::Error) -> GitError {
    // A missing working directory also surfaces as NotFound.
    let cwd_missing = cwd.is_some_and(|dir| !dir.exists());
    let err = GitError::from(ExecError::Spawn {
        program: program.to_path_buf(),
        source,
    });
    if cwd_missing {
        err.with_kind(ErrorKind::NotAGitRepository)
    } else {
        err
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Turns a finished child into `Ok` or a classified `GitError`, logging both.
fn complete(
    id: u64,
    argv: &[String],
    started: Instant,
    code: Option<i32>,
    stdout: String,
    stderr: String,
) -> Result<ExecOutput, GitError> {
    let elapsed_ms = started.elapsed().as_millis() as u64;
    let ctx = ClassifyContext::from_argv(argv);
    let exit_code = code.unwrap_or(-1);

    tracing::debug!(
        id,
        exit_code,
        elapsed_ms,
        stdout = truncate(&stdout, LOG_STDOUT_CHARS),
        "< git"
    );
    if !stderr.trim().is_empty() {
        tracing::debug!(id, stderr = %stderr.trim_end(), "git stderr");
    }

    if code == Some(0) || is_benign(&ctx, &stdout, &stderr) {
        return Ok(ExecOutput {
            exit_code,
            stdout,
            stderr,
        });
    }

    let kind = classify(code, &stdout, &stderr, &ctx);
    tracing::warn!(
        id,
        exit_code,
        kind = kind.map(ErrorKind::as_str).unwrap_or("-"),
        argv = %argv.join(" "),
        "git command failed"
    );
    let mut err = GitError::new("Failed to execute git").with_argv(argv);
    err.kind = kind;
    err.exit_code = code;
    err.stdout = stdout;
    err.stderr = stderr;
    Err(err)
}

// ---------------------------------------------------------------------------
// 4. Streamed mode
// ---------------------------------------------------------------------------

/// A running child whose stdout is consumed incrementally.
pub struct StreamedChild {
    id: u64,
    argv: Vec<String>,
    started: Instant,
    child: Child,
    stdout: BufReader<ChildStdout>,
    stderr: JoinHandle<String>,
    cancel: Option<CancellationToken>,
    killed: bool,
}

impl Git {
    /// Spawns `git <args>` for record-by-record reading.
    pub async fn stream<I, S>(&self, args: I, opts: &ExecOptions) -> Result<StreamedChild, GitError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv: Vec<String> = args.into_iter().map(Into::into).collect();
        let started = Instant::now();
        let (mut child, id) = self.spawn(&argv, opts)?;

        let (Some(stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(GitError::new("child pipes unavailable").with_argv(&argv));
        };
        let stderr = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            String::from_utf8_lossy(&buf).into_owned()
        });

        Ok(StreamedChild {
            id,
            argv,
            started,
            child,
            stdout: BufReader::new(stdout),
            stderr,
            cancel: opts.cancel.clone(),
            killed: false,
        })
    }
}

impl StreamedChild {
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Next `delimiter`-terminated record, without the delimiter. `None` at EOF.
    pub async fn next_record(&mut self, delimiter: u8) -> Result<Option<String>, GitError> {
        let mut buf = Vec::new();
        let read = tokio::select! {
            read = self.stdout.read_until(delimiter, &mut buf) => Some(read),
            _ = cancelled(self.cancel.as_ref()) => None,
        };
        let Some(read) = read else {
            self.kill();
            return Err(GitError::cancelled().with_argv(&self.argv));
        };
        let n = read.map_err(|e| {
            GitError::from(ExecError::Io {
                path: PathBuf::from("<stdout>"),
                source: e,
            })
            .with_argv(&self.argv)
        })?;
        if n == 0 {
            return Ok(None);
        }
        if buf.last() == Some(&delimiter) {
            buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    /// Next newline-terminated line, without `\n` / `\r\n`.
    pub async fn next_line(&mut self) -> Result<Option<String>, GitError> {
        Ok(self
            .next_record(b'\n')
            .await?
            .map(|line| line.trim_end_matches('\r').to_owned()))
    }

    /// Kills the child. [`StreamedChild::finish`] then succeeds with whatever
    /// was left unread.
    pub fn kill(&mut self) {
        if !self.killed {
            tracing::debug!(id = self.id, "killing streamed child");
            #[cfg(unix)]
            kill_process_group(self.id, self.child.id());
            if let Err(e) = self.child.start_kill() {
                tracing::debug!(id = self.id, error = %e, "kill failed");
            }
            self.killed = true;
        }
    }

    /// Drains the remaining stdout, waits for exit, and classifies the result.
    pub async fn finish(mut self) -> Result<ExecOutput, GitError> {
        let mut rest = Vec::new();
        if !self.killed {
            let drained = tokio::select! {
                r = self.stdout.read_to_end(&mut rest) => Some(r),
                _ = cancelled(self.cancel.as_ref()) => None,
            };
            let Some(drained) = drained else {
                self.kill();
                return Err(GitError::cancelled().with_argv(&self.argv));
            };
            if let Err(e) = drained {
                tracing::debug!(id = self.id, error = %e, "stdout drain failed");
            }
        }
        let status = self.child.wait().await.map_err(|e| {
            GitError::from(ExecError::Io {
                path: PathBuf::from("<child>"),
                source: e,
            })
            .with_argv(&self.argv)
        })?;
        let stderr = if self.killed {
            match tokio::time::timeout(KILLED_STDERR_GRACE, &mut self.stderr).await {
                Ok(joined) => joined.unwrap_or_default(),
                Err(_) => {
                    tracing::debug!(id = self.id, "stderr still open after kill; abandoned");
                    self.stderr.abort();
                    String::new()
                }
            }
        } else {
            (&mut self.stderr).await.unwrap_or_default()
        };
        let stdout = String::from_utf8_lossy(&rest).into_owned();

        if self.killed {
            tracing::debug!(id = self.id, "streamed child finished after kill");
            return Ok(ExecOutput {
                exit_code: status.code().unwrap_or(-1),
                stdout,
                stderr,
            });
        }
        complete(
            self.id,
            &self.argv,
            self.started,
            status.code(),
            stdout,
            stderr,
        )
    }
}

#[cfg(unix)]
fn kill_process_group(id: u64, pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid.and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        tracing::debug!(id, error = %e, "process group kill failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_prefix_is_stripped() {
        assert_eq!(parse_version("git version 2.43.0\n"), "2.43.0");
        assert_eq!(parse_version("weird"), "weird");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 150), "hi");
    }

    #[test]
    fn benign_failure_is_success() {
        let argv = vec!["reset".to_string(), "HEAD".to_string()];
        let out = complete(
            0,
            &argv,
            Instant::now(),
            Some(1),
            "a.txt: needs merge\n".into(),
            String::new(),
        )
        .unwrap();
        assert_eq!(out.exit_code, 1);
    }

    #[test]
    fn failure_is_classified_once() {
        let argv = vec!["status".to_string()];
        let err = complete(
            0,
            &argv,
            Instant::now(),
            Some(128),
            String::new(),
            "fatal: not a git repository".into(),
        )
        .unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::NotAGitRepository));
        assert_eq!(err.verb.as_deref(), Some("status"));
        assert_eq!(err.exit_code, Some(128));
    }
}
