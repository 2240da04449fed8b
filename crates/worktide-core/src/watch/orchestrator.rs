//! Per-worktree watches, debounce timers, restart policy and poll cadence.
//!
//! All state lives in [`WatchOrchestrator`] and is only touched from
//! `&mut self` methods. Watch callbacks and timers never mutate anything:
//! they post a [`WatchSignal`] that the owner feeds back through
//! [`WatchOrchestrator::handle_signal`].

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};
use worktide_config::WorktideConfig;
use worktide_git::head_ref_path;

use super::events::WatchEvent;
use super::source::{FileChange, WatchGuard, WatchSource};
use crate::task::{TaskSlot, send_after, send_every};
use crate::types::{Worktree, WorktreeId};

/// Debounce, restart and poll timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchTiming {
    pub branch_debounce: Duration,
    pub files_debounce: Duration,
    pub restart_backoff: Duration,
    pub focused_poll: Duration,
    pub unfocused_poll: Duration,
}

impl Default for WatchTiming {
    fn default() -> Self {
        Self::from_config(&WorktideConfig::default())
    }
}

impl WatchTiming {
    pub fn from_config(config: &WorktideConfig) -> Self {
        Self {
            branch_debounce: config.watch.branch_debounce(),
            files_debounce: config.watch.files_debounce(),
            restart_backoff: config.watch.restart_backoff(),
            focused_poll: config.refresh.focused_poll(),
            unfocused_poll: config.refresh.unfocused_poll(),
        }
    }
}

/// Diagnostic view of one watched worktree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSummary {
    pub head_path: Option<PathBuf>,
    pub tree_watched: bool,
    /// Armed branch, files and restart timers.
    pub pending_timers: usize,
    pub poll_period: Option<Duration>,
}

/// Internal notification delivered back to the orchestrator's owner.
#[derive(Debug)]
pub struct WatchSignal(Signal);

#[derive(Debug)]
enum Signal {
    HeadChanged {
        id: WorktreeId,
        generation: u64,
        change: FileChange,
    },
    TreeChanged {
        id: WorktreeId,
        generation: u64,
    },
    DebounceElapsed {
        id: WorktreeId,
        kind: DebounceKind,
        generation: u64,
    },
    RestartDue {
        id: WorktreeId,
        generation: u64,
    },
    PollDue {
        id: WorktreeId,
        generation: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebounceKind {
    Branch,
    Files,
}

struct HeadWatch {
    path: PathBuf,
    generation: u64,
    _guard: WatchGuard,
}

struct TreeWatch {
    path: PathBuf,
    generation: u64,
    _guard: WatchGuard,
}

struct WatchedWorktreeState {
    worktree: Worktree,
    head: Option<HeadWatch>,
    tree: Option<TreeWatch>,
    branch_debounce: TaskSlot,
    files_debounce: TaskSlot,
    restart: TaskSlot,
    poll: TaskSlot,
    poll_period: Option<Duration>,
}

impl WatchedWorktreeState {
    fn new(worktree: Worktree) -> Self {
        Self {
            worktree,
            head: None,
            tree: None,
            branch_debounce: TaskSlot::new(),
            files_debounce: TaskSlot::new(),
            restart: TaskSlot::new(),
            poll: TaskSlot::new(),
            poll_period: None,
        }
    }

    fn id(&self) -> WorktreeId {
        self.worktree.id.clone()
    }
}

/// Opens watches and arms timers. Split from the worktree table so both can
/// be borrowed mutably at once.
struct Scheduler {
    source: Arc<dyn WatchSource>,
    timing: WatchTiming,
    signal_tx: UnboundedSender<WatchSignal>,
    next_generation: u64,
}

impl Scheduler {
    fn generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    fn schedule_debounce(&mut self, state: &mut WatchedWorktreeState, kind: DebounceKind) {
        let generation = self.generation();
        let id = state.id();
        let (slot, delay) = match kind {
            DebounceKind::Branch => (&mut state.branch_debounce, self.timing.branch_debounce),
            DebounceKind::Files => (&mut state.files_debounce, self.timing.files_debounce),
        };
        let signal = WatchSignal(Signal::DebounceElapsed {
            id,
            kind,
            generation,
        });
        slot.arm(generation, send_after(self.signal_tx.clone(), delay, signal));
    }

    fn schedule_restart(&mut self, state: &mut WatchedWorktreeState) {
        let generation = self.generation();
        let signal = WatchSignal(Signal::RestartDue {
            id: state.id(),
            generation,
        });
        state.restart.arm(
            generation,
            send_after(self.signal_tx.clone(), self.timing.restart_backoff, signal),
        );
    }

    /// Cancel the current cadence and start a new one that fires immediately.
    fn start_poll(&mut self, state: &mut WatchedWorktreeState, focused: bool) {
        let generation = self.generation();
        let period = if focused {
            self.timing.focused_poll
        } else {
            self.timing.unfocused_poll
        };
        let id = state.id();
        state.poll.arm(
            generation,
            send_every(self.signal_tx.clone(), period, true, move || {
                WatchSignal(Signal::PollDue {
                    id: id.clone(),
                    generation,
                })
            }),
        );
        state.poll_period = Some(period);
    }

    /// Make sure the head watch follows the current head file.
    ///
    /// Returns `true` when a watch is active afterwards. An unchanged path
    /// keeps the existing watch.
    fn open_head_watch(&mut self, state: &mut WatchedWorktreeState) -> bool {
        let Some(path) = head_ref_path(&state.worktree.working_directory) else {
            if state.head.take().is_some() {
                debug!(
                    event = "core.watch.head_path_lost",
                    worktree = %state.worktree.id
                );
            }
            return false;
        };

        if state.head.as_ref().is_some_and(|h| h.path == path) {
            return true;
        }

        let generation = self.generation();
        let tx = self.signal_tx.clone();
        let id = state.id();
        let sink = Box::new(move |change: FileChange| {
            let _ = tx.send(WatchSignal(Signal::HeadChanged {
                id: id.clone(),
                generation,
                change,
            }));
        });

        match self.source.watch_file(&path, sink) {
            Ok(guard) => {
                info!(
                    event = "core.watch.head_watch_started",
                    worktree = %state.worktree.id,
                    path = %path.display()
                );
                state.head = Some(HeadWatch {
                    path,
                    generation,
                    _guard: guard,
                });
                true
            }
            Err(e) => {
                debug!(
                    event = "core.watch.head_watch_failed",
                    worktree = %state.worktree.id,
                    error = %e
                );
                state.head = None;
                false
            }
        }
    }

    fn ensure_tree_watch(&mut self, state: &mut WatchedWorktreeState) {
        let root = state.worktree.working_directory.clone();
        if state.tree.as_ref().is_some_and(|t| t.path == root) {
            return;
        }
        state.tree = None;
        if !root.is_dir() {
            return;
        }

        let generation = self.generation();
        let tx = self.signal_tx.clone();
        let id = state.id();
        let sink = Box::new(move || {
            let _ = tx.send(WatchSignal(Signal::TreeChanged {
                id: id.clone(),
                generation,
            }));
        });

        match self.source.watch_tree(&root, sink) {
            Ok(guard) => {
                info!(
                    event = "core.watch.tree_watch_started",
                    worktree = %state.worktree.id,
                    path = %root.display()
                );
                state.tree = Some(TreeWatch {
                    path: root,
                    generation,
                    _guard: guard,
                });
            }
            Err(e) => {
                debug!(
                    event = "core.watch.tree_watch_failed",
                    worktree = %state.worktree.id,
                    error = %e
                );
            }
        }
    }
}

/// Owns the watched worktrees and emits debounced [`WatchEvent`]s.
pub struct WatchOrchestrator {
    scheduler: Scheduler,
    worktrees: HashMap<WorktreeId, WatchedWorktreeState>,
    selected: Option<WorktreeId>,
    signals: UnboundedReceiver<WatchSignal>,
    subscriber: Option<UnboundedSender<WatchEvent>>,
}

impl WatchOrchestrator {
    pub fn new(source: Arc<dyn WatchSource>, timing: WatchTiming) -> Self {
        let (signal_tx, signals) = mpsc::unbounded_channel();
        Self {
            scheduler: Scheduler {
                source,
                timing,
                signal_tx,
                next_generation: 0,
            },
            worktrees: HashMap::new(),
            selected: None,
            signals,
            subscriber: None,
        }
    }

    /// Open the event stream. A previous subscriber's stream is closed.
    pub fn subscribe(&mut self) -> UnboundedReceiver<WatchEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.subscriber.replace(tx).is_some() {
            debug!(event = "core.watch.subscriber_replaced");
        }
        rx
    }

    /// Replace the tracked set of worktrees.
    ///
    /// Removed worktrees lose every watch and timer. Remaining ones get
    /// their watches reconciled, and every poll cadence restarts.
    pub fn set_worktrees(&mut self, worktrees: Vec<Worktree>) {
        let desired: HashSet<WorktreeId> = worktrees.iter().map(|w| w.id.clone()).collect();
        self.worktrees.retain(|id, _| {
            let keep = desired.contains(id);
            if !keep {
                info!(event = "core.watch.worktree_removed", worktree = %id);
            }
            keep
        });

        for worktree in worktrees {
            let id = worktree.id.clone();
            let state = self
                .worktrees
                .entry(id.clone())
                .or_insert_with(|| {
                    info!(event = "core.watch.worktree_added", worktree = %id);
                    WatchedWorktreeState::new(worktree.clone())
                });
            state.worktree = worktree;

            if !self.scheduler.open_head_watch(state) && !state.restart.is_armed() {
                self.scheduler.schedule_restart(state);
            }
            self.scheduler.ensure_tree_watch(state);
        }

        self.restart_polls();
    }

    /// Change the focused worktree. Restarts every cadence if it changed.
    pub fn set_selected_worktree(&mut self, id: Option<WorktreeId>) {
        if self.selected == id {
            return;
        }
        info!(
            event = "core.watch.selection_changed",
            worktree = id.as_ref().map(|i| i.as_str()).unwrap_or("<none>")
        );
        self.selected = id;
        self.restart_polls();
    }

    /// Tear everything down and close the event stream.
    pub fn stop(&mut self) {
        let count = self.worktrees.len();
        self.worktrees.clear();
        self.selected = None;
        self.subscriber = None;
        info!(event = "core.watch.stopped", worktrees = count);
    }

    /// Wait for the next internal signal.
    pub async fn next_signal(&mut self) -> Option<WatchSignal> {
        self.signals.recv().await
    }

    pub fn handle_signal(&mut self, signal: WatchSignal) {
        match signal.0 {
            Signal::HeadChanged {
                id,
                generation,
                change,
            } => self.on_head_changed(&id, generation, change),
            Signal::TreeChanged { id, generation } => self.on_tree_changed(&id, generation),
            Signal::DebounceElapsed {
                id,
                kind,
                generation,
            } => {
                let fired = self.worktrees.get_mut(&id).is_some_and(|state| match kind {
                    DebounceKind::Branch => state.branch_debounce.complete(generation),
                    DebounceKind::Files => state.files_debounce.complete(generation),
                });
                if fired {
                    let event = match kind {
                        DebounceKind::Branch => WatchEvent::BranchChanged(id),
                        DebounceKind::Files => WatchEvent::FilesChanged(id),
                    };
                    self.emit(event);
                }
            }
            Signal::RestartDue { id, generation } => self.on_restart_due(&id, generation),
            Signal::PollDue { id, generation } => {
                let current = self
                    .worktrees
                    .get(&id)
                    .is_some_and(|state| state.poll.is_current(generation));
                if current {
                    self.emit(WatchEvent::PollDue(id));
                }
            }
        }
    }

    pub fn watch_summary(&self, id: &WorktreeId) -> Option<WatchSummary> {
        let state = self.worktrees.get(id)?;
        let pending_timers = [
            &state.branch_debounce,
            &state.files_debounce,
            &state.restart,
        ]
        .iter()
        .filter(|slot| slot.is_armed())
        .count();
        Some(WatchSummary {
            head_path: state.head.as_ref().map(|h| h.path.clone()),
            tree_watched: state.tree.is_some(),
            pending_timers,
            poll_period: state.poll.is_armed().then_some(state.poll_period).flatten(),
        })
    }

    pub fn selected(&self) -> Option<&WorktreeId> {
        self.selected.as_ref()
    }

    pub fn is_tracking(&self, id: &WorktreeId) -> bool {
        self.worktrees.contains_key(id)
    }

    fn on_head_changed(&mut self, id: &WorktreeId, generation: u64, change: FileChange) {
        let Some(state) = self.worktrees.get_mut(id) else {
            return;
        };
        if state.head.as_ref().map(|h| h.generation) != Some(generation) {
            return;
        }

        if change.invalidates_watch() {
            info!(
                event = "core.watch.head_watch_lost",
                worktree = %id,
                change = ?change
            );
            state.head = None;
            self.scheduler.schedule_restart(state);
        } else {
            debug!(event = "core.watch.head_changed", worktree = %id, change = ?change);
            self.scheduler.schedule_debounce(state, DebounceKind::Branch);
            self.scheduler.schedule_debounce(state, DebounceKind::Files);
        }
    }

    fn on_tree_changed(&mut self, id: &WorktreeId, generation: u64) {
        let Some(state) = self.worktrees.get_mut(id) else {
            return;
        };
        if state.tree.as_ref().map(|t| t.generation) != Some(generation) {
            return;
        }

        if !state.worktree.working_directory.is_dir() {
            // Picked up again by the next set_worktrees.
            debug!(event = "core.watch.tree_missing", worktree = %id);
            state.tree = None;
            return;
        }
        self.scheduler.schedule_debounce(state, DebounceKind::Files);
    }

    fn on_restart_due(&mut self, id: &WorktreeId, generation: u64) {
        let Some(state) = self.worktrees.get_mut(id) else {
            return;
        };
        if !state.restart.complete(generation) || state.head.is_some() {
            return;
        }

        if self.scheduler.open_head_watch(state) {
            info!(event = "core.watch.head_watch_restarted", worktree = %id);
            self.scheduler.schedule_debounce(state, DebounceKind::Branch);
            self.scheduler.schedule_debounce(state, DebounceKind::Files);
        } else {
            debug!(event = "core.watch.head_restart_retry", worktree = %id);
            self.scheduler.schedule_restart(state);
        }
    }

    fn restart_polls(&mut self) {
        for (id, state) in self.worktrees.iter_mut() {
            let focused = self.selected.as_ref() == Some(id);
            self.scheduler.start_poll(state, focused);
        }
    }

    fn emit(&mut self, event: WatchEvent) {
        debug!(
            event = "core.watch.event_emitted",
            kind = event.kind(),
            worktree = %event.worktree_id()
        );
        let closed = self
            .subscriber
            .as_ref()
            .is_some_and(|tx| tx.send(event).is_err());
        if closed {
            self.subscriber = None;
        }
    }
}
