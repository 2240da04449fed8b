//! Small parsers for git's on-disk and textual formats.

/// Extract the target of a `.git` file pointer (`gitdir: <path>`).
///
/// Linked worktrees carry a `.git` *file* instead of a directory; its single
/// line points at the worktree's admin directory inside the main repository.
pub fn parse_gitdir_pointer(content: &str) -> Option<&str> {
    content
        .lines()
        .find_map(|line| line.trim().strip_prefix("gitdir:"))
        .map(str::trim)
        .filter(|target| !target.is_empty())
}

/// Extract the branch name from a symbolic ref such as `refs/remotes/origin/main`.
pub fn parse_default_branch_from_symbolic_ref(output: &str) -> Option<String> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return None;
    }
    let branch = trimmed
        .strip_prefix("refs/remotes/")
        .and_then(|rest| rest.split_once('/'))
        .map(|(_, branch)| branch)
        .unwrap_or_else(|| trimmed.rsplit('/').next().unwrap_or(trimmed));
    if branch.is_empty() {
        None
    } else {
        Some(branch.to_string())
    }
}
