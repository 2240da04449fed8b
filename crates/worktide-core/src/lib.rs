//! Live status synchronization for git worktrees.
//!
//! The [`WatchOrchestrator`] turns file-system activity and a focus-aware
//! poll cadence into per-worktree refresh triggers. The
//! [`RefreshCoordinator`] runs at most one snapshot fetch per worktree
//! through a [`StatusProvider`] and caches the results. [`StatusService`]
//! owns both and drives them from a single task.

pub mod errors;
pub mod logging;
pub mod provider;
pub mod refresh;
pub mod service;
pub mod snapshot;
pub mod types;
pub mod watch;

mod task;

#[cfg(test)]
mod test_support;

pub use errors::{ProviderError, RefreshError, WatchError, WorktideError};
pub use logging::init_logging;
pub use provider::{StatusProvider, load_snapshot};
pub use refresh::{CachedStatus, RefreshCoordinator, RefreshTiming, StatusReader, StatusView};
pub use service::StatusService;
pub use snapshot::{
    CiStatus, PullRequestInfo, PullRequestState, RefreshState, ReviewDecision, Snapshot,
    WorkflowRunInfo,
};
pub use types::{Worktree, WorktreeId};
pub use watch::{
    FileChange, NotifyWatchSource, WatchEvent, WatchOrchestrator, WatchSource, WatchSummary,
    WatchTiming,
};
pub use worktide_git::BranchStatus;
