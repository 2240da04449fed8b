//! The status record produced by a refresh.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use worktide_git::BranchStatus;

/// Pull request state as reported by the forge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestState {
    Open,
    Closed,
    Merged,
}

impl fmt::Display for PullRequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Merged => write!(f, "merged"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    ChangesRequested,
    ReviewRequired,
}

impl fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approved => write!(f, "approved"),
            Self::ChangesRequested => write!(f, "changes_requested"),
            Self::ReviewRequired => write!(f, "review_required"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestInfo {
    pub number: u64,
    pub title: String,
    pub state: PullRequestState,
    pub is_draft: bool,
    pub review_decision: Option<ReviewDecision>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// The most recent CI workflow run for a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRunInfo {
    pub name: Option<String>,
    /// Raw run status (`queued`, `in_progress`, `completed`, ...).
    pub status: Option<String>,
    /// Raw conclusion, only present once the run completed.
    pub conclusion: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl WorkflowRunInfo {
    /// Last activity of the run, falling back to its creation time.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }

    pub fn ci_status(&self) -> CiStatus {
        match self.conclusion.as_deref() {
            Some("success") | Some("neutral") | Some("skipped") => CiStatus::Passing,
            Some("failure") | Some("timed_out") | Some("startup_failure")
            | Some("action_required") | Some("cancelled") => CiStatus::Failing,
            Some(c) if !c.is_empty() => CiStatus::Unknown,
            _ => match self.status.as_deref() {
                Some("queued") | Some("in_progress") | Some("waiting") | Some("requested")
                | Some("pending") => CiStatus::Pending,
                _ => CiStatus::Unknown,
            },
        }
    }
}

/// CI summary derived from a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CiStatus {
    Passing,
    Failing,
    Pending,
    Unknown,
}

impl fmt::Display for CiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passing => write!(f, "passing"),
            Self::Failing => write!(f, "failing"),
            Self::Pending => write!(f, "pending"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Immutable status of one worktree at the time of a successful refresh.
///
/// A newer refresh replaces the whole value; fields are never patched.
/// The `*_error` fields record partial failures and are informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub repository_name: String,
    pub repository_path: PathBuf,
    pub worktree_path: PathBuf,
    pub default_branch: Option<String>,
    pub branch: BranchStatus,
    pub pull_request: Option<PullRequestInfo>,
    pub workflow_run: Option<WorkflowRunInfo>,
    /// Set when the status provider is unreachable or the repository is not hosted.
    pub provider_error: Option<String>,
    pub pull_request_error: Option<String>,
    pub ci_error: Option<String>,
}

impl Snapshot {
    pub fn ci_status(&self) -> Option<CiStatus> {
        self.workflow_run.as_ref().map(WorkflowRunInfo::ci_status)
    }

    pub fn has_errors(&self) -> bool {
        self.provider_error.is_some() || self.pull_request_error.is_some() || self.ci_error.is_some()
    }
}

/// Refresh lifecycle of a worktree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum RefreshState {
    #[default]
    Idle,
    Loading,
    Failed(String),
}

impl RefreshState {
    pub fn is_loading(&self) -> bool {
        matches!(self, RefreshState::Loading)
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            RefreshState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for RefreshState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Failed(message) => write!(f, "failed: {message}"),
        }
    }
}
