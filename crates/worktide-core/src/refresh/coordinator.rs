use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use worktide_config::WorktideConfig;

use super::view::{CachedStatus, StatusReader, StatusView};
use crate::errors::RefreshError;
use crate::provider::{StatusProvider, load_snapshot};
use crate::snapshot::{RefreshState, Snapshot};
use crate::task::{TaskSlot, send_every};
use crate::types::{Worktree, WorktreeId};
use crate::watch::WatchEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTiming {
    /// Period of the displayed worktree's self-refresh, `None` to disable it.
    pub self_refresh: Option<Duration>,
}

impl Default for RefreshTiming {
    fn default() -> Self {
        Self::from_config(&WorktideConfig::default())
    }
}

impl RefreshTiming {
    pub fn from_config(config: &WorktideConfig) -> Self {
        Self {
            self_refresh: config.refresh.self_refresh(),
        }
    }
}

/// Completion or timer notification delivered back to the coordinator's owner.
#[derive(Debug)]
pub struct RefreshSignal(Signal);

#[derive(Debug)]
enum Signal {
    Finished {
        id: WorktreeId,
        generation: u64,
        result: Result<Snapshot, RefreshError>,
    },
    SelfRefreshDue {
        generation: u64,
    },
}

struct Entry {
    status: CachedStatus,
    in_flight: TaskSlot,
}

/// Runs at most one snapshot fetch per worktree and caches the results.
///
/// Starting a fetch aborts the previous one for the same worktree, and a
/// completion is applied only if its fetch is still the current one. A
/// failed fetch keeps the last good snapshot.
pub struct RefreshCoordinator {
    provider: Arc<dyn StatusProvider>,
    timing: RefreshTiming,
    entries: HashMap<WorktreeId, Entry>,
    displayed: Option<WorktreeId>,
    self_refresh: TaskSlot,
    signal_tx: UnboundedSender<RefreshSignal>,
    signals: UnboundedReceiver<RefreshSignal>,
    view: watch::Sender<Arc<StatusView>>,
    next_generation: u64,
}

impl RefreshCoordinator {
    pub fn new(provider: Arc<dyn StatusProvider>, timing: RefreshTiming) -> Self {
        let (signal_tx, signals) = mpsc::unbounded_channel();
        let (view, _) = watch::channel(Arc::new(StatusView::default()));
        Self {
            provider,
            timing,
            entries: HashMap::new(),
            displayed: None,
            self_refresh: TaskSlot::new(),
            signal_tx,
            signals,
            view,
            next_generation: 0,
        }
    }

    pub fn reader(&self) -> StatusReader {
        StatusReader::new(self.view.subscribe())
    }

    /// Replace the set of known worktrees.
    ///
    /// Dropping a worktree discards its cache and aborts its fetch. If it was
    /// displayed, nothing is displayed afterwards.
    pub fn set_worktrees(&mut self, worktrees: &[Worktree]) {
        let desired: HashSet<&WorktreeId> = worktrees.iter().map(|w| &w.id).collect();
        self.entries.retain(|id, _| {
            let keep = desired.contains(id);
            if !keep {
                debug!(event = "core.refresh.cache_dropped", worktree = %id);
            }
            keep
        });
        for worktree in worktrees {
            self.upsert(worktree.clone());
        }

        if self
            .displayed
            .as_ref()
            .is_some_and(|id| !self.entries.contains_key(id))
        {
            self.displayed = None;
            self.self_refresh.cancel();
        }
        self.publish();
    }

    /// Change the displayed worktree.
    ///
    /// A worktree becomes displayed, its cached data stays visible, a refresh
    /// starts and the self-refresh timer restarts. A fetch still running for
    /// the previously displayed worktree is left alone. `None` clears the
    /// display and stops the timer.
    pub fn worktree_changed(&mut self, worktree: Option<Worktree>) {
        match worktree {
            Some(worktree) => {
                let id = worktree.id.clone();
                self.upsert(worktree);
                info!(event = "core.refresh.displayed_changed", worktree = %id);
                self.displayed = Some(id.clone());
                self.restart_self_refresh();
                self.refresh_worktree(&id);
            }
            None => {
                info!(event = "core.refresh.displayed_cleared");
                self.displayed = None;
                self.self_refresh.cancel();
                self.publish();
            }
        }
    }

    /// Refresh the displayed worktree, superseding any fetch in flight for it.
    pub fn refresh(&mut self) {
        if let Some(id) = self.displayed.clone() {
            self.refresh_worktree(&id);
        }
    }

    pub fn app_became_active(&mut self) {
        if self.displayed.is_some() {
            debug!(event = "core.refresh.app_became_active");
            self.refresh();
        }
    }

    /// Route a watch event to a refresh of the worktree it names.
    pub fn handle_watch_event(&mut self, event: &WatchEvent) {
        debug!(
            event = "core.refresh.watch_event_received",
            kind = event.kind(),
            worktree = %event.worktree_id()
        );
        self.refresh_worktree(event.worktree_id());
    }

    /// Start a fetch for `id`, aborting the one already in flight.
    pub fn refresh_worktree(&mut self, id: &WorktreeId) {
        let generation = self.generation();
        let Some(entry) = self.entries.get_mut(id) else {
            debug!(event = "core.refresh.unknown_worktree", worktree = %id);
            return;
        };

        if entry.in_flight.is_armed() {
            debug!(event = "core.refresh.fetch_superseded", worktree = %id);
        }
        entry.status.state = RefreshState::Loading;

        let provider = Arc::clone(&self.provider);
        let worktree = entry.status.worktree.clone();
        let tx = self.signal_tx.clone();
        let task_id = id.clone();
        entry.in_flight.arm(generation, async move {
            let result = load_snapshot(provider.as_ref(), &worktree).await;
            let _ = tx.send(RefreshSignal(Signal::Finished {
                id: task_id,
                generation,
                result,
            }));
        });

        debug!(
            event = "core.refresh.fetch_started",
            worktree = %id,
            generation = generation
        );
        self.publish();
    }

    pub async fn next_signal(&mut self) -> Option<RefreshSignal> {
        self.signals.recv().await
    }

    pub fn handle_signal(&mut self, signal: RefreshSignal) {
        match signal.0 {
            Signal::Finished {
                id,
                generation,
                result,
            } => self.on_finished(&id, generation, result),
            Signal::SelfRefreshDue { generation } => {
                if self.self_refresh.is_current(generation) {
                    debug!(event = "core.refresh.self_refresh_due");
                    self.refresh();
                }
            }
        }
    }

    /// Abort every fetch, stop the timer and forget all cached data.
    pub fn stop(&mut self) {
        self.entries.clear();
        self.displayed = None;
        self.self_refresh.cancel();
        self.publish();
        info!(event = "core.refresh.stopped");
    }

    pub fn cached_snapshot(&self, id: &WorktreeId) -> Option<Arc<Snapshot>> {
        self.entries.get(id).and_then(|e| e.status.snapshot.clone())
    }

    pub fn status(&self, id: &WorktreeId) -> RefreshState {
        self.entries
            .get(id)
            .map(|e| e.status.state.clone())
            .unwrap_or_default()
    }

    pub fn last_refresh(&self, id: &WorktreeId) -> Option<DateTime<Utc>> {
        self.entries.get(id).and_then(|e| e.status.last_refresh)
    }

    pub fn displayed(&self) -> Option<&WorktreeId> {
        self.displayed.as_ref()
    }

    pub fn is_in_flight(&self, id: &WorktreeId) -> bool {
        self.entries.get(id).is_some_and(|e| e.in_flight.is_armed())
    }

    fn on_finished(
        &mut self,
        id: &WorktreeId,
        generation: u64,
        result: Result<Snapshot, RefreshError>,
    ) {
        let Some(entry) = self.entries.get_mut(id) else {
            debug!(event = "core.refresh.result_discarded", worktree = %id, reason = "removed");
            return;
        };
        if !entry.in_flight.complete(generation) {
            debug!(event = "core.refresh.result_discarded", worktree = %id, reason = "superseded");
            return;
        }

        match result {
            Ok(snapshot) => {
                info!(
                    event = "core.refresh.fetch_completed",
                    worktree = %id,
                    partial = snapshot.has_errors()
                );
                entry.status.snapshot = Some(Arc::new(snapshot));
                entry.status.last_refresh = Some(Utc::now());
                entry.status.state = RefreshState::Idle;
            }
            Err(e) => {
                warn!(event = "core.refresh.fetch_failed", worktree = %id, error = %e);
                entry.status.state = RefreshState::Failed(e.to_string());
            }
        }
        self.publish();
    }

    fn upsert(&mut self, worktree: Worktree) {
        match self.entries.get_mut(&worktree.id) {
            Some(entry) => entry.status.worktree = worktree,
            None => {
                self.entries.insert(
                    worktree.id.clone(),
                    Entry {
                        status: CachedStatus::new(worktree),
                        in_flight: TaskSlot::new(),
                    },
                );
            }
        }
    }

    fn restart_self_refresh(&mut self) {
        let Some(period) = self.timing.self_refresh else {
            self.self_refresh.cancel();
            return;
        };
        let generation = self.generation();
        self.self_refresh.arm(
            generation,
            send_every(self.signal_tx.clone(), period, false, move || {
                RefreshSignal(Signal::SelfRefreshDue { generation })
            }),
        );
    }

    fn generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    fn publish(&self) {
        let view = StatusView {
            displayed: self.displayed.clone(),
            worktrees: self
                .entries
                .iter()
                .map(|(id, entry)| (id.clone(), entry.status.clone()))
                .collect(),
        };
        self.view.send_replace(Arc::new(view));
    }
}
