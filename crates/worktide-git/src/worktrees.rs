use std::path::{Path, PathBuf};

use git2::Repository;
use tracing::{debug, warn};

use crate::errors::GitError;
use crate::types::WorktreeEntry;

/// List the main working copy and every linked worktree of the repository
/// containing `repo_path`.
///
/// Linked worktrees whose admin entry cannot be opened or whose directory
/// is gone are skipped with a warning.
pub fn list_worktrees(repo_path: &Path) -> Result<Vec<WorktreeEntry>, GitError> {
    let repo = Repository::discover(repo_path).map_err(|_| GitError::NotInRepository {
        path: repo_path.display().to_string(),
    })?;

    let main_repo = if repo.is_worktree() {
        open_owning_repository(&repo)?
    } else {
        repo
    };

    let Some(main_workdir) = main_repo.workdir().map(normalize) else {
        return Err(GitError::OperationFailed {
            message: format!(
                "Repository at {} has no working directory",
                main_repo.path().display()
            ),
        });
    };

    let mut entries = vec![WorktreeEntry {
        name: dir_name(&main_workdir),
        path: main_workdir.clone(),
        repository_root: main_workdir.clone(),
        is_main: true,
    }];

    let names = main_repo.worktrees()?;
    for name in names.iter().flatten() {
        let worktree = match main_repo.find_worktree(name) {
            Ok(wt) => wt,
            Err(e) => {
                warn!(
                    event = "git.worktrees.open_failed",
                    name = name,
                    error = %e
                );
                continue;
            }
        };
        let path = normalize(worktree.path());
        if !path.exists() {
            debug!(
                event = "git.worktrees.missing_directory",
                name = name,
                path = %path.display()
            );
            continue;
        }
        entries.push(WorktreeEntry {
            name: name.to_string(),
            path,
            repository_root: main_workdir.clone(),
            is_main: false,
        });
    }

    debug!(
        event = "git.worktrees.list_completed",
        repository = %main_workdir.display(),
        count = entries.len()
    );
    Ok(entries)
}

/// Open the repository a linked worktree belongs to.
///
/// The worktree's admin directory holds a `commondir` file naming the shared
/// git directory, relative to the admin directory unless absolute.
fn open_owning_repository(worktree: &Repository) -> Result<Repository, GitError> {
    let admin_dir = worktree.path();
    let pointer = admin_dir.join("commondir");
    let contents = std::fs::read_to_string(&pointer).map_err(|e| GitError::OperationFailed {
        message: format!("Cannot read {}: {}", pointer.display(), e),
    })?;
    let common = PathBuf::from(contents.trim());
    let common = if common.is_absolute() {
        common
    } else {
        admin_dir.join(common)
    };
    debug!(
        event = "git.worktrees.common_dir_resolved",
        admin_dir = %admin_dir.display(),
        common_dir = %common.display()
    );
    Ok(Repository::open(normalize(&common))?)
}

fn normalize(path: &Path) -> PathBuf {
    let trimmed = path.components().collect::<PathBuf>();
    std::fs::canonicalize(&trimmed).unwrap_or(trimmed)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
