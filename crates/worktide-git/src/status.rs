//! Local branch facts for a single worktree.

use std::path::Path;

use chrono::{DateTime, Utc};
use git2::{BranchType, ErrorCode, Oid, Repository, Status, StatusOptions};
use tracing::{debug, warn};

use crate::errors::GitError;
use crate::parse::parse_default_branch_from_symbolic_ref;
use crate::types::BranchStatus;

const ORIGIN_HEAD: &str = "refs/remotes/origin/HEAD";
const FALLBACK_DEFAULT_BRANCHES: [&str; 2] = ["main", "master"];

/// Read branch, divergence, working tree and stash facts for a worktree.
///
/// Only opening the repository is fatal. Every other query degrades to an
/// absent field so that a partially broken checkout still yields a status.
pub fn branch_status(worktree_path: &Path) -> Result<BranchStatus, GitError> {
    let mut repo = Repository::open(worktree_path).map_err(|e| {
        debug!(
            event = "git.status.open_failed",
            path = %worktree_path.display(),
            error = %e
        );
        GitError::NotInRepository {
            path: worktree_path.display().to_string(),
        }
    })?;

    let mut status = BranchStatus::default();
    read_head(&repo, &mut status);
    read_upstream(&repo, &mut status);
    read_default_branch(&repo, &mut status);
    read_working_tree(&repo, &mut status);
    status.stash_count = count_stashes(&mut repo);

    debug!(
        event = "git.status.read_completed",
        path = %worktree_path.display(),
        branch = status.branch_name.as_deref().unwrap_or("<detached>"),
        staged = status.staged_changes,
        unstaged = status.unstaged_changes,
        untracked = status.untracked_changes
    );

    Ok(status)
}

fn read_head(repo: &Repository, status: &mut BranchStatus) {
    let head = match repo.head() {
        Ok(h) => h,
        Err(e) if e.code() == ErrorCode::UnbornBranch => {
            // No commits yet; HEAD still names the branch it will create.
            status.branch_name = repo
                .find_reference("HEAD")
                .ok()
                .and_then(|r| r.symbolic_target().map(str::to_string))
                .map(|target| {
                    target
                        .strip_prefix("refs/heads/")
                        .unwrap_or(&target)
                        .to_string()
                });
            return;
        }
        Err(e) => {
            warn!(event = "git.status.head_read_failed", error = %e);
            return;
        }
    };

    if head.is_branch() {
        status.branch_name = head.shorthand().map(str::to_string);
    } else {
        status.is_detached = true;
    }

    if let Ok(commit) = head.peel_to_commit() {
        status.last_commit_subject = commit.summary().map(str::to_string);
        status.last_commit_at = DateTime::<Utc>::from_timestamp(commit.time().seconds(), 0);
    }
}

fn read_upstream(repo: &Repository, status: &mut BranchStatus) {
    let Some(branch_name) = status.branch_name.as_deref() else {
        return;
    };
    status.remote_branch_exists = Some(
        repo.find_reference(&format!("refs/remotes/origin/{branch_name}"))
            .is_ok(),
    );
    let Ok(local) = repo.find_branch(branch_name, BranchType::Local) else {
        return;
    };
    let upstream = match local.upstream() {
        Ok(u) => u,
        Err(_) => {
            debug!(
                event = "git.status.no_upstream",
                branch = branch_name,
                "Branch has no upstream - never pushed"
            );
            return;
        }
    };

    status.upstream_branch = upstream.name().ok().flatten().map(str::to_string);

    if let (Some(local_oid), Some(upstream_oid)) = (local.get().target(), upstream.get().target())
        && let Some((ahead, behind)) = ahead_behind(repo, local_oid, upstream_oid)
    {
        status.ahead_of_upstream = Some(ahead);
        status.behind_upstream = Some(behind);
    }
}

fn read_default_branch(repo: &Repository, status: &mut BranchStatus) {
    let default_branch = repo
        .find_reference(ORIGIN_HEAD)
        .ok()
        .and_then(|r| r.symbolic_target().map(str::to_string))
        .and_then(|target| parse_default_branch_from_symbolic_ref(&target))
        .or_else(|| {
            FALLBACK_DEFAULT_BRANCHES
                .iter()
                .find(|name| {
                    repo.find_reference(&format!("refs/remotes/origin/{name}"))
                        .is_ok()
                })
                .map(|name| name.to_string())
        });

    let Some(default_branch) = default_branch else {
        debug!(event = "git.status.default_branch_unknown");
        return;
    };

    let default_oid = repo
        .find_reference(&format!("refs/remotes/origin/{default_branch}"))
        .ok()
        .and_then(|r| r.target());
    let head_oid = repo.head().ok().and_then(|h| h.target());

    if let (Some(head_oid), Some(default_oid)) = (head_oid, default_oid)
        && let Some((ahead, behind)) = ahead_behind(repo, head_oid, default_oid)
    {
        status.ahead_of_default = Some(ahead);
        status.behind_default = Some(behind);
    }
    if let (Some(head_oid), Some(default_oid)) = (head_oid, default_oid) {
        status.merge_conflict_possible = merge_would_conflict(repo, head_oid, default_oid);
    }
    status.default_branch = Some(default_branch);
}

fn merge_would_conflict(repo: &Repository, head: Oid, other: Oid) -> Option<bool> {
    if head == other {
        return Some(false);
    }
    let result = repo.find_commit(head).and_then(|ours| {
        let theirs = repo.find_commit(other)?;
        repo.merge_commits(&ours, &theirs, None)
    });
    match result {
        Ok(index) => Some(index.has_conflicts()),
        Err(e) => {
            debug!(
                event = "git.status.merge_check_failed",
                head = %head,
                other = %other,
                error = %e
            );
            None
        }
    }
}

fn read_working_tree(repo: &Repository, status: &mut BranchStatus) {
    if repo.is_bare() {
        return;
    }

    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false);

    let statuses = match repo.statuses(Some(&mut opts)) {
        Ok(s) => s,
        Err(e) => {
            warn!(event = "git.status.statuses_failed", error = %e);
            return;
        }
    };

    let staged = Status::INDEX_NEW
        | Status::INDEX_MODIFIED
        | Status::INDEX_DELETED
        | Status::INDEX_RENAMED
        | Status::INDEX_TYPECHANGE;
    let unstaged = Status::WT_MODIFIED
        | Status::WT_DELETED
        | Status::WT_RENAMED
        | Status::WT_TYPECHANGE
        | Status::CONFLICTED;

    for entry in statuses.iter() {
        let flags = entry.status();
        if flags.intersects(staged) {
            status.staged_changes += 1;
        }
        if flags.intersects(unstaged) {
            status.unstaged_changes += 1;
        }
        if flags.contains(Status::WT_NEW) {
            status.untracked_changes += 1;
        }
    }
}

fn count_stashes(repo: &mut Repository) -> usize {
    let mut count = 0;
    if let Err(e) = repo.stash_foreach(|_, _, _| {
        count += 1;
        true
    }) {
        debug!(event = "git.status.stash_read_failed", error = %e);
    }
    count
}

fn ahead_behind(repo: &Repository, local: Oid, other: Oid) -> Option<(usize, usize)> {
    match repo.graph_ahead_behind(local, other) {
        Ok(counts) => Some(counts),
        Err(e) => {
            warn!(
                event = "git.status.ahead_behind_failed",
                local = %local,
                other = %other,
                error = %e
            );
            None
        }
    }
}
