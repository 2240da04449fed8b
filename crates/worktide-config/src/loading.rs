//! Configuration loading and merging logic.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in the following order (later sources override earlier ones):
//! 1. **Hardcoded defaults** - Built-in fallback values
//! 2. **User config** - `~/.worktide/config.toml`
//! 3. **Project config** - `<repository>/.worktide/config.toml`

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::ConfigError;
use crate::types::{ForgeConfig, RefreshConfig, WatchConfig, WorktideConfig};
use crate::validation::validate_config;

const CONFIG_DIR: &str = ".worktide";
const CONFIG_FILE: &str = "config.toml";

/// Load configuration from the hierarchy of config files.
///
/// `project_root` is the repository whose `.worktide/config.toml` should be
/// layered on top of the user config.
///
/// # Errors
///
/// Returns an error if a present file cannot be read or parsed, or if the
/// merged result fails validation. Missing files are not errors.
pub fn load_hierarchy(project_root: Option<&Path>) -> Result<WorktideConfig, ConfigError> {
    let mut config = WorktideConfig::default();

    if let Some(path) = user_config_path() {
        config = merge_optional(config, &path)?;
    }

    if let Some(root) = project_root {
        config = merge_optional(config, &project_config_path(root))?;
    }

    validate_config(&config)?;
    Ok(config)
}

fn merge_optional(base: WorktideConfig, path: &Path) -> Result<WorktideConfig, ConfigError> {
    match load_config_file(path) {
        Ok(layer) => {
            debug!(event = "config.layer_loaded", path = %path.display());
            Ok(merge_configs(base, layer))
        }
        Err(e) if e.is_not_found() => Ok(base),
        Err(e) => Err(e),
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Path of the project-level config file for a repository root.
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_DIR).join(CONFIG_FILE)
}

/// Load a configuration file from the given path.
pub fn load_config_file(path: &Path) -> Result<WorktideConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::ConfigParseError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Merge two configurations, with `override_config` taking precedence.
///
/// Only fields present in the override replace base values.
pub fn merge_configs(base: WorktideConfig, override_config: WorktideConfig) -> WorktideConfig {
    WorktideConfig {
        watch: WatchConfig {
            branch_debounce_ms: override_config
                .watch
                .branch_debounce_ms
                .or(base.watch.branch_debounce_ms),
            files_debounce_ms: override_config
                .watch
                .files_debounce_ms
                .or(base.watch.files_debounce_ms),
            restart_backoff_ms: override_config
                .watch
                .restart_backoff_ms
                .or(base.watch.restart_backoff_ms),
        },
        refresh: RefreshConfig {
            focused_poll_secs: override_config
                .refresh
                .focused_poll_secs
                .or(base.refresh.focused_poll_secs),
            unfocused_poll_secs: override_config
                .refresh
                .unfocused_poll_secs
                .or(base.refresh.unfocused_poll_secs),
            self_refresh_secs: override_config
                .refresh
                .self_refresh_secs
                .or(base.refresh.self_refresh_secs),
            self_refresh_enabled: override_config
                .refresh
                .self_refresh_enabled
                .or(base.refresh.self_refresh_enabled),
        },
        forge: ForgeConfig {
            gh_path: override_config.forge.gh_path.or(base.forge.gh_path),
            command_timeout_secs: override_config
                .forge
                .command_timeout_secs
                .or(base.forge.command_timeout_secs),
        },
    }
}
