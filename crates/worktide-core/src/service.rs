//! Single-task host for the orchestrator and the coordinator.
//!
//! One spawned task owns both components. Commands from the handle, watch
//! callbacks, timers and fetch completions all arrive on channels and are
//! applied one at a time, so neither component needs a lock.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use worktide_config::WorktideConfig;

use crate::provider::StatusProvider;
use crate::refresh::{RefreshCoordinator, RefreshTiming, StatusReader};
use crate::types::{Worktree, WorktreeId};
use crate::watch::{WatchEvent, WatchOrchestrator, WatchSource, WatchSummary, WatchTiming};

enum Command {
    SetWorktrees(Vec<Worktree>),
    SelectWorktree(Option<WorktreeId>),
    Refresh,
    AppBecameActive,
    WatchSummary {
        id: WorktreeId,
        reply: oneshot::Sender<Option<WatchSummary>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to a running status service.
///
/// Dropping the handle shuts the service down; [`StatusService::stop`]
/// does the same and waits for it.
pub struct StatusService {
    commands: UnboundedSender<Command>,
    reader: StatusReader,
    task: JoinHandle<()>,
}

impl StatusService {
    /// Spawn the service on the current tokio runtime.
    pub fn spawn(
        provider: Arc<dyn StatusProvider>,
        source: Arc<dyn WatchSource>,
        config: &WorktideConfig,
    ) -> Self {
        let mut orchestrator = WatchOrchestrator::new(source, WatchTiming::from_config(config));
        let watch_events = orchestrator.subscribe();
        let coordinator = RefreshCoordinator::new(provider, RefreshTiming::from_config(config));
        let reader = coordinator.reader();
        let (commands, command_rx) = mpsc::unbounded_channel();

        let actor = ServiceActor {
            orchestrator,
            coordinator,
            watch_events,
            commands: command_rx,
            worktrees: HashMap::new(),
        };
        let task = tokio::spawn(actor.run());

        Self {
            commands,
            reader,
            task,
        }
    }

    /// Replace the set of worktrees being tracked.
    pub fn set_worktrees(&self, worktrees: Vec<Worktree>) {
        self.send(Command::SetWorktrees(worktrees));
    }

    /// Focus and display a worktree, or clear the selection with `None`.
    pub fn select_worktree(&self, id: Option<WorktreeId>) {
        self.send(Command::SelectWorktree(id));
    }

    /// Refresh the displayed worktree now.
    pub fn refresh(&self) {
        self.send(Command::Refresh);
    }

    pub fn app_became_active(&self) {
        self.send(Command::AppBecameActive);
    }

    pub fn reader(&self) -> StatusReader {
        self.reader.clone()
    }

    pub async fn watch_summary(&self, id: WorktreeId) -> Option<WatchSummary> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::WatchSummary { id, reply });
        rx.await.ok().flatten()
    }

    /// Cancel every watch, timer and fetch, then wait for the task to exit.
    pub async fn stop(self) {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Stop { reply });
        let _ = rx.await;
        if let Err(e) = self.task.await {
            warn!(event = "core.service.join_failed", error = %e);
        }
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!(event = "core.service.command_dropped", "Service already stopped");
        }
    }
}

struct ServiceActor {
    orchestrator: WatchOrchestrator,
    coordinator: RefreshCoordinator,
    watch_events: UnboundedReceiver<WatchEvent>,
    commands: UnboundedReceiver<Command>,
    worktrees: HashMap<WorktreeId, Worktree>,
}

impl ServiceActor {
    async fn run(mut self) {
        info!(event = "core.service.started");
        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    if !self.handle_command(command) {
                        break;
                    }
                }
                Some(signal) = self.orchestrator.next_signal() => {
                    self.orchestrator.handle_signal(signal);
                }
                Some(event) = self.watch_events.recv() => {
                    self.coordinator.handle_watch_event(&event);
                }
                Some(signal) = self.coordinator.next_signal() => {
                    self.coordinator.handle_signal(signal);
                }
            }
        }
        self.shutdown();
    }

    /// Returns `false` when the loop should exit.
    fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::SetWorktrees(worktrees) => {
                info!(event = "core.service.worktrees_set", count = worktrees.len());
                self.worktrees = worktrees
                    .iter()
                    .map(|w| (w.id.clone(), w.clone()))
                    .collect();
                self.coordinator.set_worktrees(&worktrees);
                self.orchestrator.set_worktrees(worktrees);
            }
            Command::SelectWorktree(id) => {
                let worktree = id.as_ref().and_then(|id| self.worktrees.get(id).cloned());
                if let Some(id) = &id
                    && worktree.is_none()
                {
                    warn!(event = "core.service.unknown_selection", worktree = %id);
                }
                self.orchestrator.set_selected_worktree(id);
                self.coordinator.worktree_changed(worktree);
            }
            Command::Refresh => self.coordinator.refresh(),
            Command::AppBecameActive => self.coordinator.app_became_active(),
            Command::WatchSummary { id, reply } => {
                let _ = reply.send(self.orchestrator.watch_summary(&id));
            }
            Command::Stop { reply } => {
                self.shutdown();
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    fn shutdown(&mut self) {
        self.orchestrator.stop();
        self.coordinator.stop();
        self.worktrees.clear();
        info!(event = "core.service.stopped");
    }
}
