//! Helpers for building throwaway repositories and worktrees in tests.

use std::path::Path;

use git2::{BranchType, Repository, Signature, WorktreeAddOptions};

use crate::errors::GitError;

fn test_signature(repo: &Repository) -> Result<Signature<'static>, GitError> {
    match repo.signature() {
        Ok(sig) => Ok(sig.to_owned()),
        Err(_) => Ok(Signature::now("Test", "test@test.com")?),
    }
}

/// Initialize a repository at `path` with a single empty commit.
pub fn init_repo_with_commit(path: &Path) -> Result<(), GitError> {
    let repo = Repository::init(path)?;
    let sig = test_signature(&repo)?;
    let tree_id = repo.index()?.write_tree()?;
    let tree = repo.find_tree(tree_id)?;
    repo.commit(Some("HEAD"), &sig, &sig, "Initial commit", &tree, &[])?;
    Ok(())
}

/// Write `name` into the working directory and commit it on HEAD.
pub fn commit_file(path: &Path, name: &str, contents: &str, message: &str) -> Result<(), GitError> {
    let repo = Repository::open(path)?;
    std::fs::write(path.join(name), contents).map_err(|e| GitError::OperationFailed {
        message: e.to_string(),
    })?;
    let mut index = repo.index()?;
    index.add_path(Path::new(name))?;
    index.write()?;
    let tree = repo.find_tree(index.write_tree()?)?;
    let parent = repo.head()?.peel_to_commit()?;
    let sig = test_signature(&repo)?;
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent])?;
    Ok(())
}

/// Create a local branch pointing at HEAD.
pub fn create_branch(path: &Path, name: &str) -> Result<(), GitError> {
    let repo = Repository::open(path)?;
    let commit = repo.head()?.peel_to_commit()?;
    repo.branch(name, &commit, false)?;
    Ok(())
}

/// Create a worktree checked out on an existing branch.
pub fn create_worktree_for_branch(
    repo_path: &Path,
    admin_name: &str,
    worktree_path: &Path,
    branch_name: &str,
) -> Result<(), GitError> {
    let repo = Repository::open(repo_path)?;
    let branch_ref = repo
        .find_branch(branch_name, BranchType::Local)?
        .into_reference();
    let mut opts = WorktreeAddOptions::new();
    opts.reference(Some(&branch_ref));
    repo.worktree(admin_name, worktree_path, Some(&opts))?;
    Ok(())
}
