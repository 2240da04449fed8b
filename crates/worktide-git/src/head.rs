//! Resolution of the file that records a worktree's checked-out reference.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::parse::parse_gitdir_pointer;

/// Resolve the `HEAD` file for a worktree directory.
///
/// - Main working copy: `<dir>/.git/HEAD`
/// - Linked worktree: `<gitdir>/HEAD`, where `<gitdir>` comes from the
///   `.git` file (relative targets are resolved against `dir`)
///
/// Returns `None` when the directory, its `.git` entry, or the `HEAD` file
/// does not exist. This is expected while a worktree is being recreated.
pub fn head_ref_path(worktree_dir: &Path) -> Option<PathBuf> {
    let dot_git = worktree_dir.join(".git");
    let metadata = match fs::metadata(&dot_git) {
        Ok(m) => m,
        Err(e) => {
            debug!(
                event = "git.head.dot_git_missing",
                path = %dot_git.display(),
                error = %e
            );
            return None;
        }
    };

    let git_dir = if metadata.is_dir() {
        dot_git
    } else {
        let content = fs::read_to_string(&dot_git).ok()?;
        let target = parse_gitdir_pointer(&content)?;
        let target = Path::new(target);
        if target.is_absolute() {
            target.to_path_buf()
        } else {
            worktree_dir.join(target)
        }
    };

    let head = git_dir.join("HEAD");
    if head.is_file() {
        Some(head)
    } else {
        debug!(event = "git.head.head_file_missing", path = %head.display());
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_working_copy_head() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();

        assert_eq!(
            head_ref_path(dir.path()),
            Some(dir.path().join(".git").join("HEAD"))
        );
    }

    #[test]
    fn test_linked_worktree_relative_pointer() {
        let dir = tempfile::tempdir().unwrap();
        let admin = dir.path().join("repo/.git/worktrees/feature");
        fs::create_dir_all(&admin).unwrap();
        fs::write(admin.join("HEAD"), "ref: refs/heads/feature\n").unwrap();

        let worktree = dir.path().join("feature");
        fs::create_dir_all(&worktree).unwrap();
        fs::write(
            worktree.join(".git"),
            "gitdir: ../repo/.git/worktrees/feature\n",
        )
        .unwrap();

        let head = head_ref_path(&worktree).unwrap();
        assert_eq!(head, worktree.join("../repo/.git/worktrees/feature/HEAD"));
        assert!(head.is_file());
    }

    #[test]
    fn test_linked_worktree_absolute_pointer() {
        let dir = tempfile::tempdir().unwrap();
        let admin = dir.path().join("admin");
        fs::create_dir_all(&admin).unwrap();
        fs::write(admin.join("HEAD"), "0123abcd\n").unwrap();

        let worktree = dir.path().join("wt");
        fs::create_dir_all(&worktree).unwrap();
        fs::write(worktree.join(".git"), format!("gitdir: {}\n", admin.display())).unwrap();

        assert_eq!(head_ref_path(&worktree), Some(admin.join("HEAD")));
    }

    #[test]
    fn test_missing_directory_or_head() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(head_ref_path(&dir.path().join("gone")), None);

        fs::create_dir_all(dir.path().join(".git")).unwrap();
        assert_eq!(head_ref_path(dir.path()), None);
    }

    #[test]
    fn test_real_repository() {
        let dir = tempfile::tempdir().unwrap();
        crate::test_support::init_repo_with_commit(dir.path()).unwrap();
        let head = head_ref_path(dir.path()).unwrap();
        assert!(head.ends_with(".git/HEAD"));
    }
}
