use crate::types::WorktreeId;

/// Refresh triggers emitted by the [`WatchOrchestrator`](super::WatchOrchestrator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// The checked-out reference changed (debounced).
    BranchChanged(WorktreeId),
    /// Files in the working tree changed (debounced).
    FilesChanged(WorktreeId),
    /// The worktree's poll cadence came due.
    PollDue(WorktreeId),
}

impl WatchEvent {
    pub fn worktree_id(&self) -> &WorktreeId {
        match self {
            WatchEvent::BranchChanged(id) | WatchEvent::FilesChanged(id) | WatchEvent::PollDue(id) => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            WatchEvent::BranchChanged(_) => "branch_changed",
            WatchEvent::FilesChanged(_) => "files_changed",
            WatchEvent::PollDue(_) => "poll_due",
        }
    }
}
