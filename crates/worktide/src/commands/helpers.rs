use std::path::{Path, PathBuf};

use clap::ArgMatches;
use tracing::{error, warn};
use worktide_config::WorktideConfig;
use worktide_git::{WorktreeEntry, list_worktrees};

use crate::color;

/// The `path` argument, or the current directory.
pub fn resolve_path(matches: &ArgMatches) -> PathBuf {
    matches
        .get_one::<String>("path")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Every worktree of the repository containing `path`, main checkout first.
pub fn discover_worktrees(path: &Path) -> Result<Vec<WorktreeEntry>, Box<dyn std::error::Error>> {
    match list_worktrees(path) {
        Ok(entries) => Ok(entries),
        Err(e) => {
            eprintln!("{}", color::error(&format!("Could not read worktrees: {}", e)));
            error!(
                event = "cli.worktrees.discover_failed",
                path = %path.display(),
                error = %e
            );
            Err(e.into())
        }
    }
}

/// Load configuration with warning on errors.
///
/// Falls back to defaults if loading fails, but tells the user on stderr
/// and logs `cli.config.load_failed`.
pub fn load_config_with_warning(repository_root: Option<&Path>) -> WorktideConfig {
    match WorktideConfig::load_hierarchy(repository_root) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "{}",
                color::warning(&format!(
                    "Warning: Could not load config: {}. Using defaults.\n\
                     Tip: Check ~/.worktide/config.toml and ./.worktide/config.toml for syntax errors.",
                    e
                ))
            );
            warn!(
                event = "cli.config.load_failed",
                error = %e,
                "Config load failed, using defaults"
            );
            WorktideConfig::default()
        }
    }
}

pub fn build_runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
}

/// Pick the worktree to focus.
///
/// An explicit name wins. Otherwise the worktree whose directory contains
/// `path` (deepest match), falling back to the main checkout.
pub fn select_entry<'a>(
    entries: &'a [WorktreeEntry],
    path: &Path,
    name: Option<&str>,
) -> Option<&'a WorktreeEntry> {
    if let Some(name) = name {
        return entries.iter().find(|e| e.name == name);
    }
    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    entries
        .iter()
        .filter(|e| path.starts_with(&e.path))
        .max_by_key(|e| e.path.components().count())
        .or_else(|| entries.iter().find(|e| e.is_main))
}
