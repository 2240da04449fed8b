use worktide_core::{BranchStatus, PullRequestInfo, Snapshot};

use crate::color;

fn branch_label(branch: &BranchStatus) -> String {
    match (&branch.branch_name, branch.is_detached) {
        (Some(name), _) => color::branch(name),
        (None, true) => color::muted("(detached)"),
        (None, false) => color::muted("(no branch)"),
    }
}

fn upstream_label(branch: &BranchStatus) -> Option<String> {
    let upstream = branch.upstream_branch.as_ref()?;
    Some(format!(
        "{} ahead, {} behind {}",
        branch.ahead_of_upstream.unwrap_or(0),
        branch.behind_upstream.unwrap_or(0),
        upstream
    ))
}

fn changes_label(branch: &BranchStatus) -> String {
    if !branch.has_uncommitted_changes() && branch.stash_count == 0 {
        return "clean".to_string();
    }
    let mut label = format!(
        "{} staged, {} modified, {} untracked",
        branch.staged_changes, branch.unstaged_changes, branch.untracked_changes
    );
    if branch.stash_count > 0 {
        label.push_str(&format!(", {} stashed", branch.stash_count));
    }
    label
}

fn pull_request_label(pr: &PullRequestInfo) -> String {
    let mut tags = vec![pr.state.to_string()];
    if pr.is_draft {
        tags.push("draft".to_string());
    }
    if let Some(decision) = pr.review_decision {
        tags.push(decision.to_string());
    }
    format!("#{} {} [{}]", pr.number, pr.title, tags.join(", "))
}

/// One-line summary used by `watch`.
pub fn summary_line(snapshot: &Snapshot) -> String {
    let mut parts = vec![branch_label(&snapshot.branch), changes_label(&snapshot.branch)];
    if let Some(pr) = &snapshot.pull_request {
        parts.push(format!("PR #{}", pr.number));
    }
    if let Some(ci) = snapshot.ci_status() {
        parts.push(format!("CI {}", color::ci(ci)));
    }
    parts.join("  ")
}

/// Multi-line block used by `status`.
pub fn detail_lines(snapshot: &Snapshot) -> Vec<String> {
    let branch = &snapshot.branch;
    let mut lines = vec![format!("  Branch:   {}", branch_label(branch))];
    if let Some(upstream) = upstream_label(branch) {
        lines.push(format!("  Upstream: {}", upstream));
    }
    lines.push(format!("  Changes:  {}", changes_label(branch)));

    if let Some(default_branch) = &snapshot.default_branch {
        let mut line = format!("  Default:  {}", default_branch);
        if let (Some(ahead), Some(behind)) = (branch.ahead_of_default, branch.behind_default) {
            line.push_str(&format!(" ({} ahead, {} behind)", ahead, behind));
        }
        if branch.merge_conflict_possible == Some(true) {
            line.push_str(&format!("  {}", color::warning("merge conflicts likely")));
        }
        lines.push(line);
    }
    if branch.upstream_branch.is_none() && branch.remote_branch_exists == Some(false) {
        lines.push(format!("  Remote:   {}", color::muted("not pushed")));
    }

    match (&snapshot.pull_request, &snapshot.pull_request_error) {
        (Some(pr), _) => lines.push(format!("  PR:       {}", pull_request_label(pr))),
        (None, Some(error)) => lines.push(format!("  PR:       {}", color::muted(error))),
        (None, None) => {}
    }

    match (&snapshot.workflow_run, &snapshot.ci_error) {
        (Some(run), _) => {
            let name = run.name.as_deref().unwrap_or("workflow");
            lines.push(format!("  CI:       {} ({})", color::ci(run.ci_status()), name));
        }
        (None, Some(error)) => lines.push(format!("  CI:       {}", color::muted(error))),
        (None, None) => {}
    }

    if let Some(error) = &snapshot.provider_error {
        lines.push(format!("  Provider: {}", color::muted(error)));
    }
    if let Some(subject) = &branch.last_commit_subject {
        lines.push(format!("  Last:     {}", subject));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use worktide_core::{PullRequestState, ReviewDecision};

    fn snapshot() -> Snapshot {
        Snapshot {
            repository_name: "repo".to_string(),
            repository_path: PathBuf::from("/repo"),
            worktree_path: PathBuf::from("/repo"),
            default_branch: Some("main".to_string()),
            branch: BranchStatus {
                branch_name: Some("feature-x".to_string()),
                staged_changes: 1,
                stash_count: 2,
                ahead_of_default: Some(3),
                behind_default: Some(0),
                ..Default::default()
            },
            pull_request: None,
            workflow_run: None,
            provider_error: None,
            pull_request_error: None,
            ci_error: None,
        }
    }

    #[test]
    fn test_changes_label() {
        assert_eq!(changes_label(&BranchStatus::default()), "clean");
        assert_eq!(
            changes_label(&snapshot().branch),
            "1 staged, 0 modified, 0 untracked, 2 stashed"
        );
    }

    #[test]
    fn test_pull_request_label() {
        let pr = PullRequestInfo {
            number: 42,
            title: "Add watcher".to_string(),
            state: PullRequestState::Open,
            is_draft: true,
            review_decision: Some(ReviewDecision::Approved),
            updated_at: None,
        };
        assert_eq!(
            pull_request_label(&pr),
            "#42 Add watcher [open, draft, approved]"
        );
    }

    #[test]
    fn test_detail_lines_include_errors() {
        let mut snapshot = snapshot();
        snapshot.pull_request_error = Some("pull request query failed: offline".to_string());
        let lines = detail_lines(&snapshot).join("\n");
        assert!(lines.contains("feature-x"));
        assert!(lines.contains("main (3 ahead, 0 behind)"));
        assert!(lines.contains("offline"));
        assert!(!lines.contains("CI:"));
    }

    #[test]
    fn test_summary_line_detached() {
        let mut snapshot = snapshot();
        snapshot.branch.branch_name = None;
        snapshot.branch.is_detached = true;
        assert!(summary_line(&snapshot).contains("(detached)"));
    }

    #[test]
    fn test_detail_lines_flag_conflicts_and_unpushed_branch() {
        let mut snapshot = snapshot();
        snapshot.branch.merge_conflict_possible = Some(true);
        snapshot.branch.remote_branch_exists = Some(false);
        let lines = detail_lines(&snapshot).join("\n");
        assert!(lines.contains("merge conflicts likely"));
        assert!(lines.contains("not pushed"));

        snapshot.branch.merge_conflict_possible = Some(false);
        snapshot.branch.remote_branch_exists = Some(true);
        let lines = detail_lines(&snapshot).join("\n");
        assert!(!lines.contains("merge conflicts likely"));
        assert!(!lines.contains("Remote:"));
    }
}
