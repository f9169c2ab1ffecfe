//! Status parsing + partition: one path, one group.

use std::path::Path;

use gitsession_core::status::{partition, PartitionOptions};
use gitsession_core::{FileStatus, ResourceGroupKind, StatusParser};
use rstest::rstest;

fn groups_for(raw: &str, untracked: &[&str]) -> gitsession_core::ResourceGroups {
    let mut parser = StatusParser::new();
    // Feed one byte at a time to exercise record reassembly.
    for ch in raw.chars() {
        parser.feed(&ch.to_string());
    }
    let untracked: Vec<String> = untracked.iter().map(|s| s.to_string()).collect();
    partition(
        Path::new("/repo"),
        &parser.finish(),
        &untracked,
        &PartitionOptions::default(),
    )
}

#[rstest]
#[case("DD f\0", ResourceGroupKind::Merge, FileStatus::BothDeleted)]
#[case("AU f\0", ResourceGroupKind::Merge, FileStatus::AddedByUs)]
#[case("UD f\0", ResourceGroupKind::Merge, FileStatus::DeletedByThem)]
#[case("UA f\0", ResourceGroupKind::Merge, FileStatus::AddedByThem)]
#[case("DU f\0", ResourceGroupKind::Merge, FileStatus::DeletedByUs)]
#[case("AA f\0", ResourceGroupKind::Merge, FileStatus::BothAdded)]
#[case("UU f\0", ResourceGroupKind::Merge, FileStatus::BothModified)]
#[case("M  f\0", ResourceGroupKind::Staged, FileStatus::IndexModified)]
#[case("A  f\0", ResourceGroupKind::Staged, FileStatus::IndexAdded)]
#[case("D  f\0", ResourceGroupKind::Staged, FileStatus::IndexDeleted)]
#[case("R  f\0g\0", ResourceGroupKind::Staged, FileStatus::IndexRenamed)]
#[case("C  f\0g\0", ResourceGroupKind::Staged, FileStatus::IndexCopied)]
#[case(" M f\0", ResourceGroupKind::Tracked, FileStatus::Modified)]
#[case(" D f\0", ResourceGroupKind::Tracked, FileStatus::Deleted)]
#[case(" A f\0", ResourceGroupKind::Tracked, FileStatus::IntentToAdd)]
#[case("!! f\0", ResourceGroupKind::Untracked, FileStatus::Ignored)]
fn status_codes_map_to_one_group(
    #[case] raw: &str,
    #[case] group: ResourceGroupKind,
    #[case] status: FileStatus,
) {
    let groups = groups_for(raw, &[]);
    assert_eq!(groups.len(), 1);
    let resource = &groups.group(group)[0];
    assert_eq!(resource.status, status);
    assert_eq!(resource.group, group);
    assert_eq!(resource.path, Path::new("/repo/f"));
}

#[test]
fn rename_keeps_its_source() {
    let groups = groups_for("R  new.rs\0old.rs\0", &[]);
    assert_eq!(
        groups.staged[0].original_path.as_deref(),
        Some(Path::new("/repo/old.rs"))
    );
}

#[test]
fn staged_file_then_untracked_listing_does_not_duplicate() {
    let groups = groups_for("A  a.txt\0", &["a.txt", "b.txt"]);
    assert_eq!(groups.staged.len(), 1);
    assert_eq!(groups.untracked.len(), 1);
    assert_eq!(groups.untracked[0].path, Path::new("/repo/b.txt"));
}
