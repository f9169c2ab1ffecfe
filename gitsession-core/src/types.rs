//! Repository metadata cached by a session: HEAD, refs, remotes, submodules,
//! commits and stashes.
//!
//! All types are serializable so a front-end can dump a snapshot as JSON.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Refs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefType {
    Head,
    RemoteHead,
    Tag,
}

/// One entry of `for-each-ref`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ref {
    pub ref_type: RefType,
    /// Short name (`main`, `v1.0`, or `origin/main` for remote heads).
    pub name: Option<String>,
    pub commit: Option<String>,
    /// Remote name, for [`RefType::RemoteHead`] only.
    pub remote: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamRef {
    pub remote: String,
    pub name: String,
}

impl fmt::Display for UpstreamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.remote, self.name)
    }
}

/// A branch, or a detached HEAD when `name` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: Option<String>,
    pub commit: Option<String>,
    pub upstream: Option<UpstreamRef>,
    pub ahead: Option<u32>,
    pub behind: Option<u32>,
}

impl Branch {
    pub fn detached(commit: impl Into<String>) -> Self {
        Branch {
            name: None,
            commit: Some(commit.into()),
            upstream: None,
            ahead: None,
            behind: None,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Branch {
            name: Some(name.into()),
            commit: None,
            upstream: None,
            ahead: None,
            behind: None,
        }
    }
}

/// Label for HEAD: the branch name, else a tag pointing at the HEAD commit,
/// else the first eight characters of the commit.
pub fn head_short_name(head: &Branch, refs: &[Ref]) -> Option<String> {
    if let Some(name) = &head.name {
        return Some(name.clone());
    }
    let commit = head.commit.as_deref()?;
    let tag = refs
        .iter()
        .find(|r| r.ref_type == RefType::Tag && r.commit.as_deref() == Some(commit))
        .and_then(|r| r.name.clone());
    Some(tag.unwrap_or_else(|| commit.chars().take(8).collect()))
}

// ---------------------------------------------------------------------------
// Remotes and submodules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remote {
    pub name: String,
    pub fetch_url: Option<String>,
    pub push_url: Option<String>,
    pub is_read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submodule {
    pub name: String,
    /// Path relative to the working-copy root.
    pub path: String,
    pub url: String,
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub hash: String,
    pub message: String,
    pub parents: Vec<String>,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    pub author_date: Option<DateTime<Utc>>,
    pub commit_date: Option<DateTime<Utc>>,
}

impl Commit {
    /// First line of the message.
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stash {
    pub index: u32,
    pub description: String,
}

/// Result of `ls-tree -l` / `ls-files --stage` for one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDetails {
    pub mode: String,
    pub object: String,
    pub size: u64,
}

/// Options for `log`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogOptions {
    pub max_entries: Option<u32>,
    pub path: Option<PathBuf>,
    /// Revision range such as `main..dev`.
    pub range: Option<String>,
    pub reverse: bool,
}
