use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A working copy of a repository: the main checkout or a linked worktree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorktreeEntry {
    /// Worktree admin name, or the directory name for the main checkout.
    pub name: String,
    pub path: PathBuf,
    pub repository_root: PathBuf,
    pub is_main: bool,
}

/// Local branch facts for a worktree, read without touching the network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BranchStatus {
    /// Checked-out branch, `None` when HEAD is detached.
    pub branch_name: Option<String>,
    pub is_detached: bool,
    pub upstream_branch: Option<String>,
    pub ahead_of_upstream: Option<usize>,
    pub behind_upstream: Option<usize>,
    /// Default branch as recorded by `refs/remotes/origin/HEAD`.
    pub default_branch: Option<String>,
    pub ahead_of_default: Option<usize>,
    pub behind_default: Option<usize>,
    /// Whether merging the default branch into HEAD would conflict.
    pub merge_conflict_possible: Option<bool>,
    /// Whether `refs/remotes/origin/<branch>` exists. `None` when detached.
    pub remote_branch_exists: Option<bool>,
    pub staged_changes: usize,
    pub unstaged_changes: usize,
    pub untracked_changes: usize,
    pub stash_count: usize,
    pub last_commit_subject: Option<String>,
    pub last_commit_at: Option<DateTime<Utc>>,
}

impl BranchStatus {
    pub fn has_uncommitted_changes(&self) -> bool {
        self.staged_changes + self.unstaged_changes + self.untracked_changes > 0
    }

    /// True when the branch is behind its default branch.
    pub fn out_of_date_with_default(&self) -> Option<bool> {
        self.behind_default.map(|behind| behind > 0)
    }
}
