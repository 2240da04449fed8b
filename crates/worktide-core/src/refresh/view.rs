//! Read-only access to the refresh cache.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::snapshot::{RefreshState, Snapshot};
use crate::types::{Worktree, WorktreeId};

/// Cached status of one worktree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedStatus {
    pub worktree: Worktree,
    pub state: RefreshState,
    pub snapshot: Option<Arc<Snapshot>>,
    pub last_refresh: Option<DateTime<Utc>>,
}

impl CachedStatus {
    pub(crate) fn new(worktree: Worktree) -> Self {
        Self {
            worktree,
            state: RefreshState::Idle,
            snapshot: None,
            last_refresh: None,
        }
    }
}

/// Immutable copy of the whole cache, published after every change.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusView {
    pub displayed: Option<WorktreeId>,
    pub worktrees: HashMap<WorktreeId, CachedStatus>,
}

impl StatusView {
    pub fn cached_snapshot(&self, id: &WorktreeId) -> Option<Arc<Snapshot>> {
        self.worktrees.get(id).and_then(|s| s.snapshot.clone())
    }

    /// Refresh state of `id`. Unknown worktrees report `Idle`.
    pub fn status(&self, id: &WorktreeId) -> RefreshState {
        self.worktrees
            .get(id)
            .map(|s| s.state.clone())
            .unwrap_or_default()
    }

    pub fn last_refresh(&self, id: &WorktreeId) -> Option<DateTime<Utc>> {
        self.worktrees.get(id).and_then(|s| s.last_refresh)
    }

    /// The displayed worktree's entry, if one is displayed.
    pub fn displayed_status(&self) -> Option<&CachedStatus> {
        self.displayed.as_ref().and_then(|id| self.worktrees.get(id))
    }
}

/// Cloneable handle for reading the cache from anywhere.
#[derive(Debug, Clone)]
pub struct StatusReader {
    rx: watch::Receiver<Arc<StatusView>>,
}

impl StatusReader {
    pub(crate) fn new(rx: watch::Receiver<Arc<StatusView>>) -> Self {
        Self { rx }
    }

    /// The most recently published view.
    pub fn view(&self) -> Arc<StatusView> {
        Arc::clone(&self.rx.borrow())
    }

    pub fn cached_snapshot(&self, id: &WorktreeId) -> Option<Arc<Snapshot>> {
        self.rx.borrow().cached_snapshot(id)
    }

    pub fn status(&self, id: &WorktreeId) -> RefreshState {
        self.rx.borrow().status(id)
    }

    pub fn last_refresh(&self, id: &WorktreeId) -> Option<DateTime<Utc>> {
        self.rx.borrow().last_refresh(id)
    }

    pub fn displayed(&self) -> Option<WorktreeId> {
        self.rx.borrow().displayed.clone()
    }

    /// Wait for the next published view.
    ///
    /// Returns `None` once the coordinator is gone.
    pub async fn changed(&mut self) -> Option<Arc<StatusView>> {
        self.rx.changed().await.ok()?;
        Some(Arc::clone(&self.rx.borrow_and_update()))
    }
}
