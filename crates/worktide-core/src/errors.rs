use std::error::Error;

use crate::types::WorktreeId;

/// Base trait for worktide errors.
pub trait WorktideError: Error + Send + Sync + 'static {
    /// Error code for programmatic handling
    fn error_code(&self) -> &'static str;

    /// Whether this error is caused by the user's environment rather than a bug
    fn is_user_error(&self) -> bool {
        false
    }
}

/// A file-system watch could not be established.
///
/// Never fatal: head watches are retried, tree watches wait for the next
/// reconciliation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WatchError {
    #[error("Watch path does not exist: {path}")]
    PathMissing { path: String },

    #[error("Cannot watch '{path}': {message}")]
    Unavailable { path: String, message: String },
}

/// Failures reported by a [`StatusProvider`](crate::StatusProvider).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The provider is not installed, not authenticated, or not responding.
    #[error("Status provider unreachable: {message}")]
    Unreachable { message: String },

    /// One query failed while the provider itself is usable.
    #[error("{query} query failed: {message}")]
    QueryFailed {
        query: &'static str,
        message: String,
    },

    /// The worktree cannot be mapped to a repository at all.
    #[error("Cannot resolve repository at '{path}': {message}")]
    RepositoryUnresolved { path: String, message: String },
}

/// A refresh produced no snapshot data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("Refresh of '{worktree}' failed: {message}")]
    RefreshFailed {
        worktree: WorktreeId,
        message: String,
    },
}

impl WorktideError for WatchError {
    fn error_code(&self) -> &'static str {
        match self {
            WatchError::PathMissing { .. } => "WATCH_PATH_MISSING",
            WatchError::Unavailable { .. } => "WATCH_UNAVAILABLE",
        }
    }
}

impl WorktideError for ProviderError {
    fn error_code(&self) -> &'static str {
        match self {
            ProviderError::Unreachable { .. } => "PROVIDER_UNREACHABLE",
            ProviderError::QueryFailed { .. } => "PROVIDER_QUERY_FAILED",
            ProviderError::RepositoryUnresolved { .. } => "REPOSITORY_UNRESOLVED",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(
            self,
            ProviderError::Unreachable { .. } | ProviderError::RepositoryUnresolved { .. }
        )
    }
}

impl WorktideError for RefreshError {
    fn error_code(&self) -> &'static str {
        match self {
            RefreshError::RefreshFailed { .. } => "REFRESH_FAILED",
        }
    }
}

impl WorktideError for worktide_git::GitError {
    fn error_code(&self) -> &'static str {
        match self {
            worktide_git::GitError::NotInRepository { .. } => "NOT_IN_REPOSITORY",
            worktide_git::GitError::WorktreeNotFound { .. } => "WORKTREE_NOT_FOUND",
            worktide_git::GitError::OperationFailed { .. } => "GIT_OPERATION_FAILED",
            worktide_git::GitError::Git2Error { .. } => "GIT2_ERROR",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(
            self,
            worktide_git::GitError::NotInRepository { .. }
                | worktide_git::GitError::WorktreeNotFound { .. }
        )
    }
}

impl WorktideError for worktide_config::ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            worktide_config::ConfigError::ConfigParseError { .. } => "CONFIG_PARSE_ERROR",
            worktide_config::ConfigError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION",
            worktide_config::ConfigError::IoError { .. } => "CONFIG_IO_ERROR",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(
            self,
            worktide_config::ConfigError::ConfigParseError { .. }
                | worktide_config::ConfigError::InvalidConfiguration { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_codes() {
        let unreachable = ProviderError::Unreachable {
            message: "gh not installed".to_string(),
        };
        assert_eq!(unreachable.error_code(), "PROVIDER_UNREACHABLE");
        assert!(unreachable.is_user_error());

        let query = ProviderError::QueryFailed {
            query: "workflow run",
            message: "HTTP 502".to_string(),
        };
        assert_eq!(query.error_code(), "PROVIDER_QUERY_FAILED");
        assert!(!query.is_user_error());
        assert_eq!(query.to_string(), "workflow run query failed: HTTP 502");
    }

    #[test]
    fn test_refresh_error_display() {
        let error = RefreshError::RefreshFailed {
            worktree: WorktreeId::new("feature"),
            message: "not a git repository".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Refresh of 'feature' failed: not a git repository"
        );
        assert_eq!(error.error_code(), "REFRESH_FAILED");
    }

    #[test]
    fn test_watch_error_codes() {
        let missing = WatchError::PathMissing {
            path: "/tmp/gone".to_string(),
        };
        assert_eq!(missing.error_code(), "WATCH_PATH_MISSING");
        assert!(!missing.is_user_error());
    }

    #[test]
    fn test_git_error_is_user_error() {
        let error = worktide_git::GitError::NotInRepository {
            path: "/tmp".to_string(),
        };
        assert_eq!(error.error_code(), "NOT_IN_REPOSITORY");
        assert!(error.is_user_error());
    }
}
