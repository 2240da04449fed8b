#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("Not in a git repository: {path}")]
    NotInRepository { path: String },

    #[error("Worktree not found at path: {path}")]
    WorktreeNotFound { path: String },

    #[error("Git operation failed: {message}")]
    OperationFailed { message: String },

    #[error("Git2 library error: {source}")]
    Git2Error {
        #[from]
        source: git2::Error,
    },
}
