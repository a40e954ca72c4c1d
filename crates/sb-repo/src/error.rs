//! Error types for sb-repo

use sb_process::ProcessError;
use thiserror::Error;

/// Script repository errors
#[derive(Error, Debug)]
pub enum RepoError {
    /// Repository or tool is not set up correctly (R001)
    #[error("[R001] Repository configuration error: {message}")]
    Configuration { message: String },

    /// Version control tool reported a failure (R002)
    #[error("[R002] Version control command failed: {0}")]
    ExternalTool(#[source] ProcessError),

    /// Revision does not exist in the repository (R003)
    #[error("[R003] Revision not found: {revision}")]
    RevisionNotFound { revision: String },

    /// Version control tool did not finish in time (R004)
    #[error("[R004] Version control command timed out: {0}")]
    Timeout(#[source] ProcessError),

    /// Working-copy file could not be read (R005)
    #[error("[R005] Failed to read '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl RepoError {
    /// Whether retrying the operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, RepoError::Timeout(_))
    }
}

impl From<ProcessError> for RepoError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::NotFound { ref executable } => RepoError::Configuration {
                message: format!(
                    "version control executable '{}' not found",
                    executable.display()
                ),
            },
            ProcessError::Timeout { .. } => RepoError::Timeout(err),
            other => RepoError::ExternalTool(other),
        }
    }
}

/// Result type alias for RepoError
pub type RepoResult<T> = Result<T, RepoError>;
