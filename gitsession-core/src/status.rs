//! File-change model: statuses, resources, the four groups, and the
//! incremental `status -z` parser that feeds them.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::CountBadge;

// ---------------------------------------------------------------------------
// 1. Enums
// ---------------------------------------------------------------------------

/// Closed set of per-file states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    IndexModified,
    IndexAdded,
    IndexDeleted,
    IndexRenamed,
    IndexCopied,

    Modified,
    Deleted,
    Untracked,
    Ignored,
    IntentToAdd,

    AddedByUs,
    AddedByThem,
    DeletedByUs,
    DeletedByThem,
    BothAdded,
    BothDeleted,
    BothModified,
}

impl FileStatus {
    /// One-letter label as a terminal front-end would print it.
    pub fn letter(self) -> char {
        match self {
            FileStatus::IndexModified | FileStatus::Modified => 'M',
            FileStatus::IndexAdded | FileStatus::IntentToAdd => 'A',
            FileStatus::IndexDeleted | FileStatus::Deleted => 'D',
            FileStatus::IndexRenamed => 'R',
            FileStatus::IndexCopied => 'C',
            FileStatus::Untracked => 'U',
            FileStatus::Ignored => 'I',
            FileStatus::AddedByUs
            | FileStatus::AddedByThem
            | FileStatus::DeletedByUs
            | FileStatus::DeletedByThem
            | FileStatus::BothAdded
            | FileStatus::BothDeleted
            | FileStatus::BothModified => '!',
        }
    }

    pub fn is_conflict(self) -> bool {
        self.letter() == '!'
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileStatus::IndexModified => "index modified",
            FileStatus::IndexAdded => "index added",
            FileStatus::IndexDeleted => "index deleted",
            FileStatus::IndexRenamed => "index renamed",
            FileStatus::IndexCopied => "index copied",
            FileStatus::Modified => "modified",
            FileStatus::Deleted => "deleted",
            FileStatus::Untracked => "untracked",
            FileStatus::Ignored => "ignored",
            FileStatus::IntentToAdd => "intent to add",
            FileStatus::AddedByUs => "added by us",
            FileStatus::AddedByThem => "added by them",
            FileStatus::DeletedByUs => "deleted by us",
            FileStatus::DeletedByThem => "deleted by them",
            FileStatus::BothAdded => "both added",
            FileStatus::BothDeleted => "both deleted",
            FileStatus::BothModified => "both modified",
        };
        f.write_str(s)
    }
}

/// The four mutually exclusive groups a path can land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceGroupKind {
    Merge,
    Staged,
    Tracked,
    Untracked,
}

// ---------------------------------------------------------------------------
// 2. Resources and groups
// ---------------------------------------------------------------------------

/// One file-level change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Absolute path inside the working copy.
    pub path: PathBuf,
    /// Rename or copy source, when the tool reported one.
    pub original_path: Option<PathBuf>,
    pub status: FileStatus,
    pub group: ResourceGroupKind,
    /// Unstaged component of a path that is also staged (`MM`, `AD`, …).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktree_status: Option<FileStatus>,
}

/// All four groups for one status cycle. Always replaced as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroups {
    pub merge: Vec<Resource>,
    pub staged: Vec<Resource>,
    pub tracked: Vec<Resource>,
    pub untracked: Vec<Resource>,
}

impl ResourceGroups {
    pub fn group(&self, kind: ResourceGroupKind) -> &[Resource] {
        match kind {
            ResourceGroupKind::Merge => &self.merge,
            ResourceGroupKind::Staged => &self.staged,
            ResourceGroupKind::Tracked => &self.tracked,
            ResourceGroupKind::Untracked => &self.untracked,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.merge
            .iter()
            .chain(&self.staged)
            .chain(&self.tracked)
            .chain(&self.untracked)
    }

    pub fn len(&self) -> usize {
        self.merge.len() + self.staged.len() + self.tracked.len() + self.untracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finds the resource for `path`, whichever group holds it.
    pub fn find(&self, path: &Path) -> Option<&Resource> {
        self.iter().find(|r| r.path == path)
    }

    /// Derived badge count.
    pub fn count(&self, badge: CountBadge) -> usize {
        match badge {
            CountBadge::Off => 0,
            CountBadge::Tracked => self.merge.len() + self.staged.len() + self.tracked.len(),
            CountBadge::All => self.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// 3. Incremental parser for `status -z`
// ---------------------------------------------------------------------------

/// One raw `XY path` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub x: char,
    pub y: char,
    pub path: String,
    /// Second path segment of a rename or copy record.
    pub original_path: Option<String>,
}

/// Parses NUL-separated `status -z` output fed in arbitrary pieces.
///
/// Records split across two `feed` calls are reassembled. Entries whose path
/// ends with `/` (nested repositories) are dropped.
#[derive(Debug, Default)]
pub struct StatusParser {
    partial: String,
    pending: Option<StatusEntry>,
    entries: Vec<StatusEntry>,
}

impl StatusParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds raw output. Only complete (NUL-terminated) records are consumed.
    pub fn feed(&mut self, data: &str) {
        self.partial.push_str(data);
        while let Some(end) = self.partial.find('\0') {
            let record: String = self.partial.drain(..=end).collect();
            self.push_record(&record[..record.len() - 1]);
        }
    }

    /// Feeds a single record with its terminating NUL already removed.
    pub fn push_record(&mut self, record: &str) {
        if let Some(mut entry) = self.pending.take() {
            entry.original_path = Some(record.to_owned());
            self.accept(entry);
            return;
        }
        let mut chars = record.chars();
        let (Some(x), Some(y), Some(' ')) = (chars.next(), chars.next(), chars.next()) else {
            return;
        };
        let entry = StatusEntry {
            x,
            y,
            path: chars.as_str().to_owned(),
            original_path: None,
        };
        if x == 'R' || x == 'C' || y == 'R' {
            self.pending = Some(entry);
        } else {
            self.accept(entry);
        }
    }

    fn accept(&mut self, entry: StatusEntry) {
        if entry.path.ends_with('/') {
            return;
        }
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[StatusEntry] {
        &self.entries
    }

    /// Consumes the parser. A dangling rename without its source is kept
    /// without one.
    pub fn finish(mut self) -> Vec<StatusEntry> {
        if let Some(entry) = self.pending.take() {
            self.accept(entry);
        }
        self.entries
    }
}

// ---------------------------------------------------------------------------
// 4. Partition
// ---------------------------------------------------------------------------

/// Inputs that shape the partition beyond the raw entries.
#[derive(Debug, Clone, Default)]
pub struct PartitionOptions {
    /// Relative submodule paths to drop from Merge/Staged/Tracked.
    pub excluded_paths: HashSet<String>,
}

fn merge_status(x: char, y: char) -> Option<FileStatus> {
    Some(match (x, y) {
        ('D', 'D') => FileStatus::BothDeleted,
        ('A', 'U') => FileStatus::AddedByUs,
        ('U', 'D') => FileStatus::DeletedByThem,
        ('U', 'A') => FileStatus::AddedByThem,
        ('D', 'U') => FileStatus::DeletedByUs,
        ('A', 'A') => FileStatus::BothAdded,
        ('U', 'U') => FileStatus::BothModified,
        _ => return None,
    })
}

fn index_status(x: char) -> Option<FileStatus> {
    Some(match x {
        'M' => FileStatus::IndexModified,
        'A' => FileStatus::IndexAdded,
        'D' => FileStatus::IndexDeleted,
        'R' => FileStatus::IndexRenamed,
        'C' => FileStatus::IndexCopied,
        _ => return None,
    })
}

fn worktree_status(y: char) -> Option<FileStatus> {
    Some(match y {
        'M' => FileStatus::Modified,
        'D' => FileStatus::Deleted,
        'A' => FileStatus::IntentToAdd,
        _ => return None,
    })
}

/// Places every reported path in exactly one group.
///
/// Priority: conflict codes, then `!!`/`??`, then a staged index column, then
/// an unstaged worktree column. Paths from `untracked` that were already
/// placed are skipped.
pub fn partition(
    root: &Path,
    entries: &[StatusEntry],
    untracked: &[String],
    opts: &PartitionOptions,
) -> ResourceGroups {
    let mut groups = ResourceGroups::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for entry in entries {
        if !seen.insert(entry.path.as_str()) {
            continue;
        }
        let path = root.join(&entry.path);
        let original_path = entry.original_path.as_ref().map(|p| root.join(p));
        let excluded = opts.excluded_paths.contains(&entry.path);

        let resource = |status, group, worktree_status| Resource {
            path: path.clone(),
            original_path: original_path.clone(),
            status,
            group,
            worktree_status,
        };

        if let Some(status) = merge_status(entry.x, entry.y) {
            if !excluded {
                groups.merge.push(resource(status, ResourceGroupKind::Merge, None));
            }
            continue;
        }
        match (entry.x, entry.y) {
            ('!', '!') => {
                groups.untracked.push(resource(
                    FileStatus::Ignored,
                    ResourceGroupKind::Untracked,
                    None,
                ));
                continue;
            }
            ('?', '?') => {
                groups.untracked.push(resource(
                    FileStatus::Untracked,
                    ResourceGroupKind::Untracked,
                    None,
                ));
                continue;
            }
            _ => {}
        }
        if excluded {
            continue;
        }
        if let Some(status) = index_status(entry.x) {
            let wt = worktree_status(entry.y);
            groups
                .staged
                .push(resource(status, ResourceGroupKind::Staged, wt));
        } else if let Some(status) = worktree_status(entry.y) {
            groups
                .tracked
                .push(resource(status, ResourceGroupKind::Tracked, None));
        }
    }

    for rel in untracked {
        let rel = rel.as_str();
        if rel.is_empty() || rel.ends_with('/') || !seen.insert(rel) {
            continue;
        }
        groups.untracked.push(Resource {
            path: root.join(rel),
            original_path: None,
            status: FileStatus::Untracked,
            group: ResourceGroupKind::Untracked,
            worktree_status: None,
        });
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Vec<StatusEntry> {
        let mut parser = StatusParser::new();
        parser.feed(raw);
        parser.finish()
    }

    #[test]
    fn parser_reassembles_records_split_across_chunks() {
        let mut parser = StatusParser::new();
        parser.feed(" M a.t");
        parser.feed("xt\0A  b.txt\0");
        let entries = parser.finish();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, "a.txt");
        assert_eq!((entries[0].x, entries[0].y), (' ', 'M'));
        assert_eq!(entries[1].path, "b.txt");
    }

    #[test]
    fn rename_records_consume_the_source_segment() {
        let entries = parse("R  new.txt\0old.txt\0 M other.txt\0");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, "new.txt");
        assert_eq!(entries[0].original_path.as_deref(), Some("old.txt"));
        assert_eq!(entries[1].path, "other.txt");
    }

    #[test]
    fn nested_repository_entries_are_dropped() {
        let entries = parse("?? nested/\0 M a.txt\0");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "a.txt");
    }

    #[test]
    fn conflicts_go_to_merge_only() {
        let root = Path::new("/r");
        let entries = parse("UU c.txt\0AA d.txt\0");
        let groups = partition(root, &entries, &[], &PartitionOptions::default());
        assert_eq!(groups.merge.len(), 2);
        assert_eq!(groups.merge[0].status, FileStatus::BothModified);
        assert_eq!(groups.merge[1].status, FileStatus::BothAdded);
        assert!(groups.staged.is_empty() && groups.tracked.is_empty());
    }

    #[test]
    fn staged_and_modified_path_lands_in_staged_with_worktree_status() {
        let root = Path::new("/r");
        let entries = parse("MM a.txt\0 D b.txt\0A  c.txt\0");
        let groups = partition(root, &entries, &[], &PartitionOptions::default());
        assert_eq!(groups.staged.len(), 2);
        assert_eq!(groups.staged[0].path, root.join("a.txt"));
        assert_eq!(groups.staged[0].status, FileStatus::IndexModified);
        assert_eq!(groups.staged[0].worktree_status, Some(FileStatus::Modified));
        assert_eq!(groups.tracked.len(), 1);
        assert_eq!(groups.tracked[0].status, FileStatus::Deleted);
    }

    #[test]
    fn intent_to_add_is_tracked() {
        let entries = parse(" A n.txt\0");
        let groups = partition(Path::new("/r"), &entries, &[], &PartitionOptions::default());
        assert_eq!(groups.tracked[0].status, FileStatus::IntentToAdd);
    }

    #[test]
    fn every_path_appears_exactly_once() {
        let root = Path::new("/r");
        let entries = parse("UU a\0MM b\0 M c\0!! d\0");
        let untracked = vec!["c".to_string(), "e".to_string(), "a".to_string()];
        let groups = partition(root, &entries, &untracked, &PartitionOptions::default());
        let mut paths: Vec<_> = groups.iter().map(|r| r.path.clone()).collect();
        let total = paths.len();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), total);
        assert_eq!(total, 5);
        assert_eq!(groups.find(&root.join("d")).map(|r| r.status), Some(FileStatus::Ignored));
        assert_eq!(
            groups.find(&root.join("e")).map(|r| r.group),
            Some(ResourceGroupKind::Untracked)
        );
    }

    #[test]
    fn excluded_submodule_paths_are_dropped_from_tracked() {
        let root = Path::new("/r");
        let entries = parse(" M vendor/lib\0 M a.txt\0");
        let opts = PartitionOptions {
            excluded_paths: ["vendor/lib".to_string()].into_iter().collect(),
        };
        let groups = partition(root, &entries, &[], &opts);
        assert_eq!(groups.tracked.len(), 1);
        assert_eq!(groups.tracked[0].path, root.join("a.txt"));
    }

    #[test]
    fn count_badge_modes() {
        let root = Path::new("/r");
        let entries = parse(" M a\0A  b\0");
        let groups = partition(root, &entries, &["u".to_string()], &PartitionOptions::default());
        assert_eq!(groups.count(CountBadge::All), 3);
        assert_eq!(groups.count(CountBadge::Tracked), 2);
        assert_eq!(groups.count(CountBadge::Off), 0);
    }
}
