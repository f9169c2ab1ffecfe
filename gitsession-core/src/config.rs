//! Session configuration.
//!
//! # API pattern
//!
//! - `load_at(path)` — explicit file; used in tests with `TempDir`
//! - `load()` — resolves `<config_dir>/gitsession/config.yaml` via `dirs`,
//!   delegates to `load_at`
//!
//! A missing file is not an error: every field has a default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchSortOrder {
    Alphabetically,
    #[default]
    Committerdate,
}

/// Which groups contribute to the badge count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountBadge {
    #[default]
    All,
    Tracked,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoFetch {
    #[default]
    Off,
    /// Fetch the default remote only, silently.
    Default,
    /// Fetch every remote.
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retries: 10,
            base_delay_ms: 50,
        }
    }
}

impl RetryConfig {
    /// Backoff before retry number `attempt` (1-based): `attempt² × base`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = u64::from(attempt).saturating_mul(u64::from(attempt));
        Duration::from_millis(factor.saturating_mul(self.base_delay_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub auto_refresh: bool,
    pub ignore_submodules: bool,
    pub branch_sort_order: BranchSortOrder,
    pub count_badge: CountBadge,
    pub status_limit: usize,
    pub discovery_debounce_ms: u64,
    pub status_debounce_ms: u64,
    pub settle_delay_ms: u64,
    pub retry: RetryConfig,
    pub max_cli_length: usize,
    pub autofetch: AutoFetch,
    pub autofetch_period_secs: u64,
    pub require_user_config: bool,
    pub prune_on_fetch: bool,
    pub show_progress: bool,
    pub git_path: Option<PathBuf>,
    pub user_agent: String,
    pub scan_repositories: Vec<PathBuf>,
    pub ignored_repositories: Vec<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            auto_refresh: true,
            ignore_submodules: false,
            branch_sort_order: BranchSortOrder::default(),
            count_badge: CountBadge::default(),
            status_limit: 5000,
            discovery_debounce_ms: 500,
            status_debounce_ms: 1000,
            settle_delay_ms: 5000,
            retry: RetryConfig::default(),
            max_cli_length: 30_000,
            autofetch: AutoFetch::default(),
            autofetch_period_secs: 180,
            require_user_config: true,
            prune_on_fetch: false,
            show_progress: true,
            git_path: None,
            user_agent: format!("gitsession/{}", env!("CARGO_PKG_VERSION")),
            scan_repositories: Vec::new(),
            ignored_repositories: Vec::new(),
        }
    }
}

impl SessionConfig {
    pub fn discovery_debounce(&self) -> Duration {
        Duration::from_millis(self.discovery_debounce_ms)
    }

    pub fn status_debounce(&self) -> Duration {
        Duration::from_millis(self.status_debounce_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn autofetch_period(&self) -> Duration {
        Duration::from_secs(self.autofetch_period_secs)
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// `<config_dir>/gitsession/config.yaml` — pure, no I/O.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = dirs::config_dir().ok_or(ConfigError::ConfigDirNotFound)?;
    Ok(dir.join("gitsession").join("config.yaml"))
}

/// Loads configuration from `path`. Missing file → defaults.
pub fn load_at(path: &Path) -> Result<SessionConfig, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(SessionConfig::default()),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if raw.trim().is_empty() {
        return Ok(SessionConfig::default());
    }
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// `load_at` convenience wrapper using the user config directory.
pub fn load() -> Result<SessionConfig, ConfigError> {
    load_at(&config_path()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = load_at(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(cfg, SessionConfig::default());
        assert_eq!(cfg.max_cli_length, 30_000);
        assert_eq!(cfg.retry.max_retries, 10);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "auto_refresh: false\ncount_badge: tracked\nretry:\n  max_retries: 3\n",
        )
        .unwrap();
        let cfg = load_at(&path).unwrap();
        assert!(!cfg.auto_refresh);
        assert_eq!(cfg.count_badge, CountBadge::Tracked);
        assert_eq!(cfg.retry.max_retries, 3);
        assert_eq!(cfg.retry.base_delay_ms, 50);
        assert_eq!(cfg.status_limit, 5000);
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "auto_refresh: [unclosed\n").unwrap();
        let err = load_at(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "got {err:?}");
    }

    #[test]
    fn retry_delay_is_quadratic() {
        let retry = RetryConfig::default();
        assert_eq!(retry.delay(1), Duration::from_millis(50));
        assert_eq!(retry.delay(3), Duration::from_millis(450));
    }
}
