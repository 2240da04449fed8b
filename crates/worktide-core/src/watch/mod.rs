//! File-system watches, debounce and the focus-aware poll cadence.

mod events;
mod orchestrator;
mod source;

pub use events::WatchEvent;
pub use orchestrator::{WatchOrchestrator, WatchSignal, WatchSummary, WatchTiming};
pub use source::{
    FileChange, FileSink, NotifyWatchSource, TreeSink, WatchGuard, WatchSource,
    classify_file_event, is_relevant_tree_event,
};
