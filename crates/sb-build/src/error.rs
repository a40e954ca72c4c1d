//! Error types for sb-build

use sb_core::{BuildActionType, CoreError, ObjectName};
use sb_db::DbError;
use sb_repo::RepoError;
use std::time::Duration;
use thiserror::Error;

/// Build errors
#[derive(Error, Debug)]
pub enum BuildError {
    /// A plan item failed; later items were not run (B001)
    #[error("[B001] Item {position} ({action} {object}) failed: {source}")]
    ItemFailed {
        position: usize,
        object: ObjectName,
        action: BuildActionType,
        #[source]
        source: DbError,
    },

    /// A plan item exceeded its time limit (B002)
    #[error("[B002] Item {position} ({action} {object}) timed out after {timeout:?}")]
    Timeout {
        position: usize,
        object: ObjectName,
        action: BuildActionType,
        timeout: Duration,
    },

    /// The build was cancelled before completion (B003)
    #[error("[B003] Build cancelled after {completed} item(s)")]
    Cancelled { completed: usize },

    /// Reading the script repository failed (B004)
    #[error("[B004] {0}")]
    Repository(#[from] RepoError),

    /// Planning failed (B005)
    #[error("[B005] {0}")]
    Planning(#[from] CoreError),

    /// Opening, committing, or rolling back failed (B006)
    #[error("[B006] {0}")]
    Database(#[from] DbError),
}

impl BuildError {
    /// Whether retrying the build may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            BuildError::Timeout { .. } => true,
            BuildError::Repository(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// 1-based plan position of the failing item, if an item failed
    pub fn position(&self) -> Option<usize> {
        match self {
            BuildError::ItemFailed { position, .. } | BuildError::Timeout { position, .. } => {
                Some(*position)
            }
            _ => None,
        }
    }
}

/// Result type alias for BuildError
pub type BuildResult<T> = Result<T, BuildError>;
