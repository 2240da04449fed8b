use worktide_core::{ProviderError, WorktideError};

#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    #[error("Forge CLI '{cli}' not found or not executable")]
    CliNotFound { cli: String },

    #[error("Forge CLI error: {message}")]
    CliError { message: String },

    #[error("Forge CLI '{command}' timed out after {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },

    #[error("Not a GitHub repository")]
    NotHosted,

    #[error("Failed to parse forge response: {message}")]
    ParseError { message: String },

    #[error("IO error during forge operation: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

impl ForgeError {
    /// Convert into the core error for the named query.
    ///
    /// A missing CLI makes the whole provider unreachable; everything else
    /// is a failure of that one query.
    pub fn into_provider_error(self, query: &'static str) -> ProviderError {
        let message = self.to_string();
        match self {
            ForgeError::CliNotFound { .. } => ProviderError::Unreachable { message },
            _ => ProviderError::QueryFailed { query, message },
        }
    }
}

impl WorktideError for ForgeError {
    fn error_code(&self) -> &'static str {
        match self {
            ForgeError::CliNotFound { .. } => "FORGE_CLI_NOT_FOUND",
            ForgeError::CliError { .. } => "FORGE_CLI_ERROR",
            ForgeError::Timeout { .. } => "FORGE_TIMEOUT",
            ForgeError::NotHosted => "FORGE_NOT_HOSTED",
            ForgeError::ParseError { .. } => "FORGE_PARSE_ERROR",
            ForgeError::IoError { .. } => "FORGE_IO_ERROR",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(
            self,
            ForgeError::CliNotFound { .. } | ForgeError::NotHosted
        )
    }
}
