//! Text parsers for the tool's porcelain output.
//!
//! Every function here is pure and total: unrecognized lines are skipped.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{Branch, Commit, ObjectDetails, Ref, RefType, Remote, Stash, Submodule, UpstreamRef};

/// `--format` passed to `log`/`show` so [`parse_commits`] can read it back.
/// Records are NUL-terminated by `-z`.
pub const COMMIT_FORMAT: &str = "%H%n%aN%n%aE%n%at%n%ct%n%P%n%B";

/// `--format` for [`parse_refs`].
pub const REF_FORMAT: &str = "%(refname) %(objectname) %(*objectname)";

/// `--format` for [`parse_branch_details`].
pub const BRANCH_FORMAT: &str =
    "%(refname)%00%(upstream:short)%00%(objectname)%00%(upstream:track)";

static HEAD_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^refs/heads/([^ ]+) ([0-9a-f]{40})").expect("valid head ref regex"));
static REMOTE_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^refs/remotes/([^/]+)/([^ ]+) ([0-9a-f]{40})").expect("valid remote ref regex")
});
static TAG_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^refs/tags/([^ ]+) ([0-9a-f]{40}) ?([0-9a-f]{40})?$").expect("valid tag ref regex")
});
static TRACK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(?:ahead ([0-9]+))?[,\s]*(?:behind ([0-9]+))?]|\[gone]")
        .expect("valid upstream track regex")
});
static STASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^stash@\{(\d+)\}:(.+)$").expect("valid stash regex"));
static REMOTE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^\s]+)\s+([^\s]+)\s+\((fetch|push)\)$").expect("valid remote line regex")
});
static LS_TREE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)\s+(\w+)\s+([0-9a-f]{40})\s+(\d+|-)\t").expect("valid ls-tree regex")
});
static LS_FILES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)\s+([0-9a-f]{40})\s+(\d+)\t").expect("valid ls-files regex")
});
static SUBMODULE_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*\[submodule "([^"]+)"\]\s*$"#).expect("valid submodule regex"));
static PROPERTY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\w+)\s*=\s*(.*)$").expect("valid property regex"));

// ---------------------------------------------------------------------------
// 1. Refs and branches
// ---------------------------------------------------------------------------

/// Parses `for-each-ref --format REF_FORMAT`. Remote `HEAD` symrefs are skipped;
/// annotated tags resolve to the peeled commit.
pub fn parse_refs(stdout: &str) -> Vec<Ref> {
    let mut refs = Vec::new();
    for line in stdout.lines().map(str::trim_end) {
        if let Some(m) = HEAD_REF.captures(line) {
            refs.push(Ref {
                ref_type: RefType::Head,
                name: Some(m[1].to_owned()),
                commit: Some(m[2].to_owned()),
                remote: None,
            });
        } else if let Some(m) = REMOTE_REF.captures(line) {
            if &m[2] == "HEAD" {
                continue;
            }
            refs.push(Ref {
                ref_type: RefType::RemoteHead,
                name: Some(format!("{}/{}", &m[1], &m[2])),
                commit: Some(m[3].to_owned()),
                remote: Some(m[1].to_owned()),
            });
        } else if let Some(m) = TAG_REF.captures(line) {
            let commit = m.get(3).map_or(&m[2], |peeled| peeled.as_str());
            refs.push(Ref {
                ref_type: RefType::Tag,
                name: Some(m[1].to_owned()),
                commit: Some(commit.to_owned()),
                remote: None,
            });
        }
    }
    refs
}

/// Parses one `for-each-ref --format BRANCH_FORMAT` line into a branch with
/// upstream and ahead/behind counts.
pub fn parse_branch_details(line: &str) -> Option<Branch> {
    let mut parts = line.trim_end_matches('\n').split('\0');
    let refname = parts.next()?;
    let upstream = parts.next().unwrap_or("");
    let commit = parts.next().unwrap_or("");
    let track = parts.next().unwrap_or("");

    let name = refname.strip_prefix("refs/heads/").unwrap_or(refname);
    if name.is_empty() {
        return None;
    }
    let mut branch = Branch::named(name);
    if !commit.is_empty() {
        branch.commit = Some(commit.to_owned());
    }
    if let Some((remote, upstream_name)) = upstream.split_once('/') {
        branch.upstream = Some(UpstreamRef {
            remote: remote.to_owned(),
            name: upstream_name.to_owned(),
        });
        // A `[gone]` upstream leaves both counts unset.
        if let Some(m) = TRACK.captures(track) {
            if m.get(0).map(|w| w.as_str()) != Some("[gone]") {
                branch.ahead = Some(m.get(1).and_then(|a| a.as_str().parse().ok()).unwrap_or(0));
                branch.behind = Some(m.get(2).and_then(|b| b.as_str().parse().ok()).unwrap_or(0));
            }
        } else {
            branch.ahead = Some(0);
            branch.behind = Some(0);
        }
    }
    Some(branch)
}

// ---------------------------------------------------------------------------
// 2. Remotes and submodules
// ---------------------------------------------------------------------------

/// Parses `remote --verbose`.
pub fn parse_remotes(stdout: &str) -> Vec<Remote> {
    let mut by_name: BTreeMap<String, (Option<String>, Option<String>)> = BTreeMap::new();
    for line in stdout.lines() {
        let Some(m) = REMOTE_LINE.captures(line.trim()) else {
            continue;
        };
        let entry = by_name.entry(m[1].to_owned()).or_default();
        match &m[3] {
            "fetch" => entry.0 = Some(m[2].to_owned()),
            _ => entry.1 = Some(m[2].to_owned()),
        }
    }
    by_name
        .into_iter()
        .map(|(name, (fetch_url, push_url))| {
            let is_read_only = push_url.as_deref().map_or(true, |url| url == "no_push");
            Remote {
                name,
                fetch_url,
                push_url,
                is_read_only,
            }
        })
        .collect()
}

/// Parses a `.gitmodules` file. Sections missing `path` or `url` are dropped.
pub fn parse_gitmodules(raw: &str) -> Vec<Submodule> {
    let mut out = Vec::new();
    let mut current: Option<(String, Option<String>, Option<String>)> = None;

    let flush = |current: &mut Option<(String, Option<String>, Option<String>)>,
                 out: &mut Vec<Submodule>| {
        if let Some((name, Some(path), Some(url))) = current.take() {
            out.push(Submodule { name, path, url });
        }
    };

    for line in raw.lines() {
        if let Some(m) = SUBMODULE_HEADER.captures(line) {
            flush(&mut current, &mut out);
            current = Some((m[1].to_owned(), None, None));
            continue;
        }
        let (Some(section), Some(m)) = (current.as_mut(), PROPERTY.captures(line)) else {
            continue;
        };
        let value = m[2].trim().to_owned();
        match &m[1] {
            "path" => section.1 = Some(value),
            "url" => section.2 = Some(value),
            _ => {}
        }
    }
    flush(&mut current, &mut out);
    out
}

// ---------------------------------------------------------------------------
// 3. History
// ---------------------------------------------------------------------------

fn timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let secs: i64 = raw.trim().parse().ok()?;
    Utc.timestamp_opt(secs, 0).single()
}

/// Parses NUL-terminated records produced with [`COMMIT_FORMAT`] and `-z`.
pub fn parse_commits(stdout: &str) -> Vec<Commit> {
    stdout
        .split('\0')
        .filter_map(|record| {
            let record = record.trim_start_matches('\n');
            if record.is_empty() {
                return None;
            }
            let mut fields = record.splitn(7, '\n');
            let hash = fields.next()?.trim();
            if hash.len() != 40 || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            let author_name = fields.next().map(str::to_owned);
            let author_email = fields.next().map(str::to_owned);
            let author_date = fields.next().and_then(timestamp);
            let commit_date = fields.next().and_then(timestamp);
            let parents = fields
                .next()
                .map(|p| p.split_whitespace().map(str::to_owned).collect())
                .unwrap_or_default();
            let message = fields.next().unwrap_or("").trim_end().to_owned();
            Some(Commit {
                hash: hash.to_owned(),
                message,
                parents,
                author_name: author_name.filter(|s| !s.is_empty()),
                author_email: author_email.filter(|s| !s.is_empty()),
                author_date,
                commit_date,
            })
        })
        .collect()
}

/// Parses `stash list`.
pub fn parse_stashes(stdout: &str) -> Vec<Stash> {
    stdout
        .lines()
        .filter_map(|line| {
            let m = STASH.captures(line)?;
            Some(Stash {
                index: m[1].parse().ok()?,
                description: m[2].trim().to_owned(),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// 4. Objects and templates
// ---------------------------------------------------------------------------

/// Parses the first line of `ls-tree -l <treeish> -- <path>`.
pub fn parse_ls_tree(stdout: &str) -> Option<ObjectDetails> {
    let m = LS_TREE.captures(stdout.lines().next()?)?;
    Some(ObjectDetails {
        mode: m[1].to_owned(),
        object: m[3].to_owned(),
        size: m[4].parse().unwrap_or(0),
    })
}

/// Parses the first line of `ls-files --stage -- <path>`. The size is filled
/// in separately (`cat-file -s`).
pub fn parse_ls_files(stdout: &str) -> Option<ObjectDetails> {
    let m = LS_FILES.captures(stdout.lines().next()?)?;
    Some(ObjectDetails {
        mode: m[1].to_owned(),
        object: m[2].to_owned(),
        size: 0,
    })
}

/// Drops `#` comment lines from a commit template and trims the result.
pub fn strip_commit_template(raw: &str) -> String {
    raw.lines()
        .filter(|l| !l.starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "1111111111111111111111111111111111111111";
    const B: &str = "2222222222222222222222222222222222222222";

    #[test]
    fn refs_cover_heads_remotes_and_peeled_tags() {
        let out = format!(
            "refs/heads/main {A} \nrefs/remotes/origin/HEAD {A} \nrefs/remotes/origin/main {A} \nrefs/tags/v1 {B} {A}\nrefs/tags/light {B} \n"
        );
        let refs = parse_refs(&out);
        assert_eq!(refs.len(), 4);
        assert_eq!(refs[0].ref_type, RefType::Head);
        assert_eq!(refs[1].name.as_deref(), Some("origin/main"));
        assert_eq!(refs[1].remote.as_deref(), Some("origin"));
        assert_eq!(refs[2].commit.as_deref(), Some(A));
        assert_eq!(refs[3].commit.as_deref(), Some(B));
    }

    #[test]
    fn branch_details_read_ahead_and_behind() {
        let line = format!("refs/heads/dev\0origin/dev\0{A}\0[ahead 2, behind 3]");
        let branch = parse_branch_details(&line).expect("branch");
        assert_eq!(branch.name.as_deref(), Some("dev"));
        assert_eq!(branch.upstream.as_ref().map(|u| u.to_string()).as_deref(), Some("origin/dev"));
        assert_eq!((branch.ahead, branch.behind), (Some(2), Some(3)));
    }

    #[test]
    fn branch_details_with_gone_upstream() {
        let line = format!("refs/heads/dev\0origin/dev\0{A}\0[gone]");
        let branch = parse_branch_details(&line).expect("branch");
        assert_eq!((branch.ahead, branch.behind), (None, None));
    }

    #[test]
    fn branch_without_upstream_has_no_counts() {
        let line = format!("refs/heads/solo\0\0{A}\0");
        let branch = parse_branch_details(&line).expect("branch");
        assert!(branch.upstream.is_none());
        assert_eq!(branch.ahead, None);
    }

    #[test]
    fn remotes_group_fetch_and_push() {
        let out = "origin\thttps://h/r.git (fetch)\norigin\thttps://h/r.git (push)\nup\thttps://h/u.git (fetch)\nup\tno_push (push)\n";
        let remotes = parse_remotes(out);
        assert_eq!(remotes.len(), 2);
        assert!(!remotes[0].is_read_only);
        assert!(remotes[1].is_read_only);
    }

    #[test]
    fn gitmodules_sections() {
        let raw = "[submodule \"lib\"]\n\tpath = vendor/lib\n\turl = https://h/lib.git\n[submodule \"broken\"]\n\tpath = x\n";
        let subs = parse_gitmodules(raw);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].path, "vendor/lib");
    }

    #[test]
    fn commits_parse_all_fields() {
        let out = format!(
            "{A}\nAda\nada@example.com\n1700000000\n1700000100\n{B}\nsubject\n\nbody\n\0{B}\nBob\nbob@example.com\n1600000000\n1600000000\n\nroot\0"
        );
        let commits = parse_commits(&out);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].parents, vec![B.to_string()]);
        assert_eq!(commits[0].message, "subject\n\nbody");
        assert_eq!(commits[0].author_date.map(|d| d.timestamp()), Some(1_700_000_000));
        assert!(commits[1].parents.is_empty());
    }

    #[test]
    fn stash_list() {
        let stashes = parse_stashes("stash@{0}: WIP on main: abc\nstash@{1}: On dev: x\n");
        assert_eq!(stashes.len(), 2);
        assert_eq!(stashes[1].index, 1);
        assert_eq!(stashes[1].description, "On dev: x");
    }

    #[test]
    fn object_details() {
        let tree = parse_ls_tree(&format!("100644 blob {A}      42\tsrc/a.rs\n")).expect("tree");
        assert_eq!(tree.size, 42);
        let staged = parse_ls_files(&format!("100644 {B} 0\tsrc/a.rs\n")).expect("files");
        assert_eq!(staged.object, B);
    }

    #[test]
    fn template_comments_are_stripped() {
        assert_eq!(strip_commit_template("# hint\nfeat: \n# more\n"), "feat:");
    }
}
