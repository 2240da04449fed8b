//! The status provider contract and the snapshot loader built on it.

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, warn};
use worktide_git::BranchStatus;

use crate::errors::{ProviderError, RefreshError};
use crate::snapshot::{PullRequestInfo, Snapshot, WorkflowRunInfo};
use crate::types::Worktree;

/// Source of the data that makes up a [`Snapshot`].
///
/// Implementations do the actual I/O (git, forge CLI). The core decides
/// when to call them and what to do with failures.
#[async_trait]
pub trait StatusProvider: Send + Sync {
    /// Whether the forge side of the provider can be used at all.
    async fn is_available(&self) -> bool;

    /// Local branch facts for a worktree directory.
    ///
    /// Failure means the worktree cannot be resolved to a repository and
    /// no snapshot can be produced.
    async fn branch_status(&self, worktree_path: &Path) -> Result<BranchStatus, ProviderError>;

    async fn default_branch(&self, repository_root: &Path) -> Result<String, ProviderError>;

    async fn latest_workflow_run(
        &self,
        repository_root: &Path,
        branch: &str,
    ) -> Result<Option<WorkflowRunInfo>, ProviderError>;

    /// The pull request whose head is `branch`, if any.
    async fn pull_request(
        &self,
        repository_root: &Path,
        branch: &str,
    ) -> Result<Option<PullRequestInfo>, ProviderError>;
}

/// Produce a snapshot for `worktree`.
///
/// Only a failure to read local branch facts fails the whole load. Forge
/// failures are recorded in the snapshot's error fields.
pub async fn load_snapshot(
    provider: &dyn StatusProvider,
    worktree: &Worktree,
) -> Result<Snapshot, RefreshError> {
    let branch = provider
        .branch_status(&worktree.working_directory)
        .await
        .map_err(|e| RefreshError::RefreshFailed {
            worktree: worktree.id.clone(),
            message: e.to_string(),
        })?;

    let mut snapshot = Snapshot {
        repository_name: worktree.repository_name(),
        repository_path: worktree.repository_root.clone(),
        worktree_path: worktree.working_directory.clone(),
        default_branch: branch.default_branch.clone(),
        branch,
        pull_request: None,
        workflow_run: None,
        provider_error: None,
        pull_request_error: None,
        ci_error: None,
    };

    if !provider.is_available().await {
        debug!(
            event = "core.snapshot.provider_unavailable",
            worktree = %worktree.id
        );
        snapshot.provider_error = Some(
            ProviderError::Unreachable {
                message: "status provider is not available".to_string(),
            }
            .to_string(),
        );
        return Ok(snapshot);
    }

    let root = worktree.repository_root.as_path();

    // CI is only asked about a default branch the forge itself reported.
    let forge_default = match provider.default_branch(root).await {
        Ok(name) => {
            snapshot.default_branch = Some(name.clone());
            Some(name)
        }
        Err(e) => {
            warn!(
                event = "core.snapshot.default_branch_failed",
                worktree = %worktree.id,
                error = %e
            );
            snapshot.provider_error = Some(e.to_string());
            None
        }
    };

    if let Some(branch_name) = snapshot.branch.branch_name.clone() {
        match provider.pull_request(root, &branch_name).await {
            Ok(pr) => snapshot.pull_request = pr,
            Err(e) => {
                warn!(
                    event = "core.snapshot.pull_request_failed",
                    worktree = %worktree.id,
                    branch = %branch_name,
                    error = %e
                );
                snapshot.pull_request_error = Some(e.to_string());
            }
        }
    }

    if let Some(default_branch) = forge_default {
        match provider.latest_workflow_run(root, &default_branch).await {
            Ok(run) => snapshot.workflow_run = run,
            Err(e) => {
                warn!(
                    event = "core.snapshot.workflow_run_failed",
                    worktree = %worktree.id,
                    branch = %default_branch,
                    error = %e
                );
                snapshot.ci_error = Some(e.to_string());
            }
        }
    }

    Ok(snapshot)
}
