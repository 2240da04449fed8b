//! Cancellable file-system notification sources.

use std::path::Path;

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::errors::WatchError;

/// Change reported for a single watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChange {
    Written,
    Renamed,
    Deleted,
    AttributeChanged,
}

impl FileChange {
    /// The watched file is gone from its path; the watch must be re-established.
    pub fn invalidates_watch(self) -> bool {
        matches!(self, FileChange::Renamed | FileChange::Deleted)
    }
}

/// Receives file changes. Called from the notification backend's thread.
pub type FileSink = Box<dyn Fn(FileChange) + Send + Sync + 'static>;

/// Receives "something changed below this directory" notifications.
pub type TreeSink = Box<dyn Fn() + Send + Sync + 'static>;

/// Keeps a watch alive. Dropping it tears the watch down.
pub struct WatchGuard {
    _inner: Box<dyn Send>,
}

impl WatchGuard {
    pub fn new<T: Send + 'static>(inner: T) -> Self {
        Self {
            _inner: Box::new(inner),
        }
    }
}

impl std::fmt::Debug for WatchGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WatchGuard")
    }
}

/// Factory for file and directory-tree watches.
pub trait WatchSource: Send + Sync {
    fn watch_file(&self, path: &Path, sink: FileSink) -> Result<WatchGuard, WatchError>;

    fn watch_tree(&self, root: &Path, sink: TreeSink) -> Result<WatchGuard, WatchError>;
}

/// [`WatchSource`] backed by the platform's recommended `notify` watcher.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifyWatchSource;

impl NotifyWatchSource {
    pub fn new() -> Self {
        Self
    }
}

impl WatchSource for NotifyWatchSource {
    fn watch_file(&self, path: &Path, sink: FileSink) -> Result<WatchGuard, WatchError> {
        if !path.exists() {
            return Err(WatchError::PathMissing {
                path: path.display().to_string(),
            });
        }

        let watched = path.to_path_buf();
        let handler = move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Some(change) = classify_file_event(&event.kind) {
                    sink(change);
                }
            }
            Err(e) => {
                warn!(
                    event = "core.watch.file_event_error",
                    path = %watched.display(),
                    error = %e
                );
            }
        };

        let mut watcher = notify::recommended_watcher(handler).map_err(|e| unavailable(path, e))?;
        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| unavailable(path, e))?;

        debug!(event = "core.watch.file_watch_opened", path = %path.display());
        Ok(WatchGuard::new(watcher))
    }

    fn watch_tree(&self, root: &Path, sink: TreeSink) -> Result<WatchGuard, WatchError> {
        if !root.is_dir() {
            return Err(WatchError::PathMissing {
                path: root.display().to_string(),
            });
        }

        let git_dir = root.join(".git");
        let watched = root.to_path_buf();
        let handler = move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if is_relevant_tree_event(&git_dir, &event) {
                    sink();
                }
            }
            Err(e) => {
                warn!(
                    event = "core.watch.tree_event_error",
                    path = %watched.display(),
                    error = %e
                );
            }
        };

        let mut watcher: RecommendedWatcher =
            notify::recommended_watcher(handler).map_err(|e| unavailable(root, e))?;
        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| unavailable(root, e))?;

        debug!(event = "core.watch.tree_watch_opened", path = %root.display());
        Ok(WatchGuard::new(watcher))
    }
}

fn unavailable(path: &Path, error: notify::Error) -> WatchError {
    WatchError::Unavailable {
        path: path.display().to_string(),
        message: error.to_string(),
    }
}

/// Map a notify event kind to a single-file change.
///
/// Access events carry no change and are dropped.
pub fn classify_file_event(kind: &EventKind) -> Option<FileChange> {
    match kind {
        EventKind::Remove(_) => Some(FileChange::Deleted),
        EventKind::Modify(ModifyKind::Name(_)) => Some(FileChange::Renamed),
        EventKind::Modify(ModifyKind::Metadata(_)) => Some(FileChange::AttributeChanged),
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Any => Some(FileChange::Written),
        EventKind::Access(_) | EventKind::Other => None,
    }
}

/// Whether a tree event should count as a working-tree change.
///
/// Access events and events touching only paths inside `git_dir` are
/// ignored; git's own bookkeeping would otherwise retrigger refreshes.
pub fn is_relevant_tree_event(git_dir: &Path, event: &Event) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    if event.paths.is_empty() {
        return true;
    }
    !event.paths.iter().all(|p| p.starts_with(git_dir))
}
