//! Configuration types.
//!
//! Every tunable is an `Option` so that user and project files can be merged
//! field by field. Accessors resolve the effective value with its default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_BRANCH_DEBOUNCE_MS: u64 = 200;
pub const DEFAULT_FILES_DEBOUNCE_MS: u64 = 250;
pub const DEFAULT_RESTART_BACKOFF_MS: u64 = 200;
pub const DEFAULT_FOCUSED_POLL_SECS: u64 = 30;
pub const DEFAULT_UNFOCUSED_POLL_SECS: u64 = 300;
pub const DEFAULT_SELF_REFRESH_SECS: u64 = 60;
pub const DEFAULT_GH_PATH: &str = "gh";
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

/// Top-level configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorktideConfig {
    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub refresh: RefreshConfig,

    #[serde(default)]
    pub forge: ForgeConfig,
}

/// `[watch]` section: debounce and restart timings for file-system watches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Quiet period before a head-ref change is reported. Default: 200
    pub branch_debounce_ms: Option<u64>,

    /// Quiet period before working-tree changes are reported. Default: 250
    pub files_debounce_ms: Option<u64>,

    /// Delay between attempts to re-establish a lost head-ref watch. Default: 200
    pub restart_backoff_ms: Option<u64>,
}

impl WatchConfig {
    pub fn branch_debounce(&self) -> Duration {
        Duration::from_millis(
            self.branch_debounce_ms
                .unwrap_or(DEFAULT_BRANCH_DEBOUNCE_MS),
        )
    }

    pub fn files_debounce(&self) -> Duration {
        Duration::from_millis(self.files_debounce_ms.unwrap_or(DEFAULT_FILES_DEBOUNCE_MS))
    }

    pub fn restart_backoff(&self) -> Duration {
        Duration::from_millis(
            self.restart_backoff_ms
                .unwrap_or(DEFAULT_RESTART_BACKOFF_MS),
        )
    }
}

/// `[refresh]` section: polling cadence and the displayed-worktree timer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Poll period for the selected worktree. Default: 30
    pub focused_poll_secs: Option<u64>,

    /// Poll period for every other worktree. Default: 300
    pub unfocused_poll_secs: Option<u64>,

    /// Period of the displayed worktree's self-refresh timer. Default: 60
    pub self_refresh_secs: Option<u64>,

    /// Set to `false` to rely on the poll cadence alone. Default: true
    pub self_refresh_enabled: Option<bool>,
}

impl RefreshConfig {
    pub fn focused_poll(&self) -> Duration {
        Duration::from_secs(self.focused_poll_secs.unwrap_or(DEFAULT_FOCUSED_POLL_SECS))
    }

    pub fn unfocused_poll(&self) -> Duration {
        Duration::from_secs(
            self.unfocused_poll_secs
                .unwrap_or(DEFAULT_UNFOCUSED_POLL_SECS),
        )
    }

    /// Effective self-refresh period, `None` when disabled.
    pub fn self_refresh(&self) -> Option<Duration> {
        if !self.self_refresh_enabled.unwrap_or(true) {
            return None;
        }
        Some(Duration::from_secs(
            self.self_refresh_secs.unwrap_or(DEFAULT_SELF_REFRESH_SECS),
        ))
    }
}

/// `[forge]` section: how the `gh` CLI is invoked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgeConfig {
    /// Program name or path of the GitHub CLI. Default: "gh"
    pub gh_path: Option<String>,

    /// Upper bound for a single `gh` invocation. Default: 30
    pub command_timeout_secs: Option<u64>,
}

impl ForgeConfig {
    pub fn gh_path(&self) -> &str {
        self.gh_path.as_deref().unwrap_or(DEFAULT_GH_PATH)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(
            self.command_timeout_secs
                .unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS),
        )
    }
}
