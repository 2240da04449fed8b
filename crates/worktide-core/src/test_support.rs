//! In-memory watch source, scripted status provider and fixtures.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;
use worktide_git::BranchStatus;

use crate::errors::{ProviderError, WatchError};
use crate::provider::StatusProvider;
use crate::snapshot::{PullRequestInfo, WorkflowRunInfo};
use crate::types::Worktree;
use crate::watch::{FileChange, FileSink, TreeSink, WatchGuard, WatchSource};

/// Create `<root>/<name>/.git/HEAD` and return a worktree pointing at it.
pub(crate) fn worktree_fixture(root: &Path, name: &str) -> Worktree {
    let dir = root.join(name);
    fs::create_dir_all(dir.join(".git")).unwrap();
    fs::write(dir.join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();
    Worktree::new(name, dir.clone(), dir)
}

pub(crate) fn drain<T>(rx: &mut UnboundedReceiver<T>) -> Vec<T> {
    let mut items = Vec::new();
    while let Ok(item) = rx.try_recv() {
        items.push(item);
    }
    items
}

#[derive(Default)]
struct FakeWatches {
    next_id: u64,
    opened: usize,
    files: HashMap<u64, (PathBuf, Arc<FileSink>)>,
    trees: HashMap<u64, (PathBuf, Arc<TreeSink>)>,
}

/// Records registered watches and lets tests fire events into them.
#[derive(Default)]
pub(crate) struct FakeWatchSource {
    watches: Arc<Mutex<FakeWatches>>,
}

struct FakeRegistration {
    id: u64,
    watches: Arc<Mutex<FakeWatches>>,
}

impl Drop for FakeRegistration {
    fn drop(&mut self) {
        let mut watches = self.watches.lock().unwrap();
        watches.files.remove(&self.id);
        watches.trees.remove(&self.id);
    }
}

impl FakeWatchSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Deliver a change to every watch on `path`. Returns how many received it.
    pub(crate) fn emit_file(&self, path: &Path, change: FileChange) -> usize {
        let sinks: Vec<Arc<FileSink>> = {
            let watches = self.watches.lock().unwrap();
            watches
                .files
                .values()
                .filter(|(p, _)| p == path)
                .map(|(_, sink)| Arc::clone(sink))
                .collect()
        };
        for sink in &sinks {
            sink(change);
        }
        sinks.len()
    }

    pub(crate) fn emit_tree(&self, root: &Path) -> usize {
        let sinks: Vec<Arc<TreeSink>> = {
            let watches = self.watches.lock().unwrap();
            watches
                .trees
                .values()
                .filter(|(p, _)| p == root)
                .map(|(_, sink)| Arc::clone(sink))
                .collect()
        };
        for sink in &sinks {
            sink();
        }
        sinks.len()
    }

    pub(crate) fn file_watch_count(&self, path: &Path) -> usize {
        let watches = self.watches.lock().unwrap();
        watches.files.values().filter(|(p, _)| p == path).count()
    }

    pub(crate) fn tree_watch_count(&self, root: &Path) -> usize {
        let watches = self.watches.lock().unwrap();
        watches.trees.values().filter(|(p, _)| p == root).count()
    }

    pub(crate) fn active_watches(&self) -> usize {
        let watches = self.watches.lock().unwrap();
        watches.files.len() + watches.trees.len()
    }

    /// Total watches ever opened, including ones since torn down.
    pub(crate) fn opened_watches(&self) -> usize {
        self.watches.lock().unwrap().opened
    }

    fn register(&self, register: impl FnOnce(&mut FakeWatches, u64)) -> WatchGuard {
        let mut watches = self.watches.lock().unwrap();
        watches.next_id += 1;
        watches.opened += 1;
        let id = watches.next_id;
        register(&mut watches, id);
        WatchGuard::new(FakeRegistration {
            id,
            watches: Arc::clone(&self.watches),
        })
    }
}

impl WatchSource for FakeWatchSource {
    fn watch_file(&self, path: &Path, sink: FileSink) -> Result<WatchGuard, WatchError> {
        if !path.exists() {
            return Err(WatchError::PathMissing {
                path: path.display().to_string(),
            });
        }
        let path = path.to_path_buf();
        Ok(self.register(|w, id| {
            w.files.insert(id, (path, Arc::new(sink)));
        }))
    }

    fn watch_tree(&self, root: &Path, sink: TreeSink) -> Result<WatchGuard, WatchError> {
        if !root.is_dir() {
            return Err(WatchError::PathMissing {
                path: root.display().to_string(),
            });
        }
        let root = root.to_path_buf();
        Ok(self.register(|w, id| {
            w.trees.insert(id, (root, Arc::new(sink)));
        }))
    }
}

struct BranchResponse {
    delay: Duration,
    result: Result<BranchStatus, ProviderError>,
}

/// Status provider with scripted, optionally delayed responses.
///
/// `branch_status` answers from a queue and falls back to a clean `main`
/// branch once the queue is empty. The forge queries return fixed values.
pub(crate) struct FakeStatusProvider {
    available: AtomicBool,
    branch_responses: Mutex<VecDeque<BranchResponse>>,
    default_branch: Mutex<Result<String, ProviderError>>,
    pull_request: Mutex<Result<Option<PullRequestInfo>, ProviderError>>,
    workflow_run: Mutex<Result<Option<WorkflowRunInfo>, ProviderError>>,
    branch_calls: AtomicUsize,
    forge_calls: AtomicUsize,
}

impl FakeStatusProvider {
    pub(crate) fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            branch_responses: Mutex::new(VecDeque::new()),
            default_branch: Mutex::new(Ok("main".to_string())),
            pull_request: Mutex::new(Ok(None)),
            workflow_run: Mutex::new(Ok(None)),
            branch_calls: AtomicUsize::new(0),
            forge_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub(crate) fn push_branch(&self, status: BranchStatus) {
        self.push_branch_after(Duration::ZERO, Ok(status));
    }

    pub(crate) fn push_branch_error(&self, error: ProviderError) {
        self.push_branch_after(Duration::ZERO, Err(error));
    }

    /// Queue a response that resolves only after `delay`.
    pub(crate) fn push_branch_after(
        &self,
        delay: Duration,
        result: Result<BranchStatus, ProviderError>,
    ) {
        self.branch_responses
            .lock()
            .unwrap()
            .push_back(BranchResponse { delay, result });
    }

    pub(crate) fn set_default_branch(&self, result: Result<String, ProviderError>) {
        *self.default_branch.lock().unwrap() = result;
    }

    pub(crate) fn set_pull_request(&self, result: Result<Option<PullRequestInfo>, ProviderError>) {
        *self.pull_request.lock().unwrap() = result;
    }

    pub(crate) fn set_workflow_run(&self, result: Result<Option<WorkflowRunInfo>, ProviderError>) {
        *self.workflow_run.lock().unwrap() = result;
    }

    pub(crate) fn branch_calls(&self) -> usize {
        self.branch_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn forge_calls(&self) -> usize {
        self.forge_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusProvider for FakeStatusProvider {
    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn branch_status(&self, _worktree_path: &Path) -> Result<BranchStatus, ProviderError> {
        self.branch_calls.fetch_add(1, Ordering::SeqCst);
        let response = self.branch_responses.lock().unwrap().pop_front();
        match response {
            Some(BranchResponse { delay, result }) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                result
            }
            None => Ok(BranchStatus {
                branch_name: Some("main".to_string()),
                ..Default::default()
            }),
        }
    }

    async fn default_branch(&self, _repository_root: &Path) -> Result<String, ProviderError> {
        self.forge_calls.fetch_add(1, Ordering::SeqCst);
        self.default_branch.lock().unwrap().clone()
    }

    async fn latest_workflow_run(
        &self,
        _repository_root: &Path,
        _branch: &str,
    ) -> Result<Option<WorkflowRunInfo>, ProviderError> {
        self.forge_calls.fetch_add(1, Ordering::SeqCst);
        self.workflow_run.lock().unwrap().clone()
    }

    async fn pull_request(
        &self,
        _repository_root: &Path,
        _branch: &str,
    ) -> Result<Option<PullRequestInfo>, ProviderError> {
        self.forge_calls.fetch_add(1, Ordering::SeqCst);
        self.pull_request.lock().unwrap().clone()
    }
}
