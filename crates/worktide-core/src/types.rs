use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Stable identifier of a worktree, owned by whoever registers it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorktreeId(String);

impl WorktreeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorktreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorktreeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for WorktreeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A worktree as seen by the core: an opaque key plus its directories.
///
/// Creation and deletion of worktrees happen elsewhere; the core only
/// watches and queries what it is given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Worktree {
    pub id: WorktreeId,
    pub working_directory: PathBuf,
    pub repository_root: PathBuf,
}

impl Worktree {
    pub fn new(
        id: impl Into<WorktreeId>,
        working_directory: impl Into<PathBuf>,
        repository_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: id.into(),
            working_directory: working_directory.into(),
            repository_root: repository_root.into(),
        }
    }

    /// Last component of the repository root, or the full path if it has none.
    pub fn repository_name(&self) -> String {
        dir_name(&self.repository_root)
    }
}

impl From<worktide_git::WorktreeEntry> for Worktree {
    fn from(entry: worktide_git::WorktreeEntry) -> Self {
        Self {
            id: WorktreeId::new(entry.name),
            working_directory: entry.path,
            repository_root: entry.repository_root,
        }
    }
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
