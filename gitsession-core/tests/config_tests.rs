//! Config load error-message and override integration tests.

use assert_fs::prelude::*;
use gitsession_core::config::{self, AutoFetch, BranchSortOrder};
use gitsession_core::ConfigError;
use predicates::prelude::predicate;

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn corrupt_yaml_returns_parse_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("config.yaml");
    file.write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = config::load_at(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yaml"), "got: {err}");
}

#[test]
fn wrong_type_yaml_returns_parse_error() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("config.yaml");
    file.write_str("- this is a list, not a mapping\n").expect("write");

    let err = config::load_at(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. Overrides
// ---------------------------------------------------------------------------

#[test]
fn every_documented_key_is_accepted() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("config.yaml");
    file.write_str(
        r#"
auto_refresh: false
ignore_submodules: true
branch_sort_order: alphabetically
count_badge: off
status_limit: 10
discovery_debounce_ms: 100
status_debounce_ms: 1100
settle_delay_ms: 2000
retry:
  max_retries: 2
  base_delay_ms: 5
max_cli_length: 64
autofetch: all
autofetch_period_secs: 60
require_user_config: false
prune_on_fetch: true
show_progress: false
git_path: /opt/git/bin/git
user_agent: test-agent
scan_repositories: [sub]
ignored_repositories: [/tmp/skip]
"#,
    )
    .expect("write");
    file.assert(predicate::path::exists());

    let cfg = config::load_at(file.path()).expect("load");
    assert!(!cfg.auto_refresh);
    assert!(cfg.ignore_submodules);
    assert_eq!(cfg.branch_sort_order, BranchSortOrder::Alphabetically);
    assert_eq!(cfg.status_limit, 10);
    assert_eq!(cfg.status_debounce().as_millis(), 1100);
    assert_eq!(cfg.retry.max_retries, 2);
    assert_eq!(cfg.max_cli_length, 64);
    assert_eq!(cfg.autofetch, AutoFetch::All);
    assert_eq!(cfg.autofetch_period().as_secs(), 60);
    assert_eq!(cfg.user_agent, "test-agent");
    assert_eq!(cfg.scan_repositories.len(), 1);
}

#[test]
fn empty_file_yields_defaults() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("config.yaml");
    file.touch().expect("touch");
    let cfg = config::load_at(file.path()).expect("load");
    assert!(cfg.auto_refresh);
    assert!(cfg.user_agent.starts_with("gitsession/"));
}
