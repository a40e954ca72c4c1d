//! Error types for sb-process

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// External process errors
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Executable could not be found (P001)
    #[error("[P001] Executable not found: {}", executable.display())]
    NotFound { executable: PathBuf },

    /// Process could not be started (P002)
    #[error("[P002] Failed to start {}: {source}", executable.display())]
    Spawn {
        executable: PathBuf,
        source: std::io::Error,
    },

    /// Process exited unsuccessfully (P003)
    #[error(
        "[P003] {} exited with {}: {}",
        executable.display(),
        exit_code.map_or_else(|| "a signal".to_string(), |c| format!("code {c}")),
        stderr.trim()
    )]
    Failed {
        executable: PathBuf,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// Process ran longer than allowed and was killed (P004)
    #[error("[P004] {} timed out after {timeout:?}", executable.display())]
    Timeout {
        executable: PathBuf,
        timeout: Duration,
    },

    /// IO error while talking to the process (P005)
    #[error("[P005] IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcessError {
    /// Whether running the same command again may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProcessError::Timeout { .. })
    }
}

/// Result type alias for ProcessError
pub type ProcessResult<T> = Result<T, ProcessError>;
