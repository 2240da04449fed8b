//! Local git queries for worktide.
//!
//! All git2 usage is contained in this crate; callers only deal with standard
//! Rust types and [`GitError`].

pub mod errors;
pub mod head;
pub mod parse;
pub mod status;
pub mod types;
pub mod worktrees;

#[cfg(test)]
mod test_support;

pub use errors::GitError;
pub use head::head_ref_path;
pub use status::branch_status;
pub use types::{BranchStatus, WorktreeEntry};
pub use worktrees::list_worktrees;
