//! Single-flight refresh execution and the per-worktree snapshot cache.

mod coordinator;
mod view;

pub use coordinator::{RefreshCoordinator, RefreshSignal, RefreshTiming};
pub use view::{CachedStatus, StatusReader, StatusView};
