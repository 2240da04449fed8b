use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use worktide_config::WorktideConfig;
use worktide_core::{
    BranchStatus, ProviderError, PullRequestInfo, StatusProvider, WorkflowRunInfo,
};

use crate::github::GitHubCli;

/// Status provider backed by local git and the GitHub CLI.
pub struct LiveStatusProvider {
    gh: GitHubCli,
}

impl LiveStatusProvider {
    pub fn new(gh: GitHubCli) -> Self {
        Self { gh }
    }

    pub fn from_config(config: &WorktideConfig) -> Self {
        Self::new(GitHubCli::from_config(&config.forge))
    }
}

#[async_trait]
impl StatusProvider for LiveStatusProvider {
    async fn is_available(&self) -> bool {
        self.gh.is_available().await
    }

    async fn branch_status(&self, worktree_path: &Path) -> Result<BranchStatus, ProviderError> {
        let path: PathBuf = worktree_path.to_path_buf();
        let path_display = path.display().to_string();
        // git2 is blocking.
        let result = tokio::task::spawn_blocking(move || worktide_git::branch_status(&path)).await;
        match result {
            Ok(Ok(status)) => Ok(status),
            Ok(Err(e)) => {
                debug!(event = "forge.git.branch_status_failed", path = %path_display, error = %e);
                Err(ProviderError::RepositoryUnresolved {
                    path: path_display,
                    message: e.to_string(),
                })
            }
            Err(e) => Err(ProviderError::RepositoryUnresolved {
                path: path_display,
                message: format!("branch status task failed: {e}"),
            }),
        }
    }

    async fn default_branch(&self, repository_root: &Path) -> Result<String, ProviderError> {
        self.gh
            .default_branch(repository_root)
            .await
            .map_err(|e| e.into_provider_error("default branch"))
    }

    async fn latest_workflow_run(
        &self,
        repository_root: &Path,
        branch: &str,
    ) -> Result<Option<WorkflowRunInfo>, ProviderError> {
        self.gh
            .latest_workflow_run(repository_root, branch)
            .await
            .map_err(|e| e.into_provider_error("workflow run"))
    }

    async fn pull_request(
        &self,
        repository_root: &Path,
        branch: &str,
    ) -> Result<Option<PullRequestInfo>, ProviderError> {
        self.gh
            .pull_request(repository_root, branch)
            .await
            .map_err(|e| e.into_provider_error("pull request"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use worktide_core::{Worktree, load_snapshot};

    fn provider_without_gh() -> LiveStatusProvider {
        LiveStatusProvider::new(GitHubCli::new(
            "worktide-no-such-gh",
            Duration::from_secs(5),
        ))
    }

    fn init_repo(path: &Path) {
        let repo = git2::Repository::init(path).unwrap();
        std::fs::write(path.join("README.md"), "hello\n").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("README.md")).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = git2::Signature::now("Test", "test@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "Initial commit", &tree, &[])
            .unwrap();
    }

    #[tokio::test]
    async fn test_branch_status_outside_repository() {
        let dir = tempfile::tempdir().unwrap();
        let result = provider_without_gh().branch_status(dir.path()).await;
        assert!(matches!(
            result,
            Err(ProviderError::RepositoryUnresolved { .. })
        ));
    }

    #[tokio::test]
    async fn test_branch_status_reads_local_repository() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        std::fs::write(dir.path().join("new.txt"), "x").unwrap();

        let status = provider_without_gh()
            .branch_status(dir.path())
            .await
            .unwrap();
        assert!(status.branch_name.is_some());
        assert_eq!(status.untracked_changes, 1);
        assert_eq!(status.last_commit_subject.as_deref(), Some("Initial commit"));
    }

    #[tokio::test]
    async fn test_snapshot_without_gh_records_provider_error() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        let worktree = Worktree::new("main", dir.path(), dir.path());

        let snapshot = load_snapshot(&provider_without_gh(), &worktree)
            .await
            .unwrap();
        assert!(snapshot.provider_error.is_some());
        assert!(snapshot.pull_request.is_none());
        assert!(snapshot.workflow_run.is_none());
        assert!(snapshot.branch.branch_name.is_some());
    }
}
