//! Running an external executable to completion.

use log::debug;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error::{ProcessError, ProcessResult};

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; `None` when the process was ended by a signal
    pub exit_code: Option<i32>,

    /// Raw standard output
    pub stdout: Vec<u8>,

    /// Standard error, lossily decoded
    pub stderr: String,
}

impl ProcessOutput {
    /// Whether the process exited with code 0
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Standard output, lossily decoded
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// An executable invoked with a fixed working directory and timeout.
#[derive(Debug, Clone)]
pub struct ExternalProcess {
    executable: PathBuf,
    working_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl ExternalProcess {
    /// Wrap an executable name or path
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            working_dir: None,
            timeout: None,
        }
    }

    /// Run in `dir` instead of the current directory
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Kill the process and fail if it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The wrapped executable
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Run with `args`; a non-zero exit is an error.
    pub async fn run<I, S>(&self, args: I) -> ProcessResult<ProcessOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self.run_allow_failure(args).await?;
        if output.success() {
            return Ok(output);
        }
        Err(ProcessError::Failed {
            executable: self.executable.clone(),
            exit_code: output.exit_code,
            stdout: output.stdout_text(),
            stderr: output.stderr,
        })
    }

    /// Run with `args`, returning the output whatever the exit code.
    ///
    /// Spawn failures and timeouts are still errors.
    pub async fn run_allow_failure<I, S>(&self, args: I) -> ProcessResult<ProcessOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args
            .into_iter()
            .map(|a| a.as_ref().to_os_string())
            .collect();
        debug!(
            "Running {} {}",
            self.executable.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let mut command = Command::new(&self.executable);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ProcessError::NotFound {
                executable: self.executable.clone(),
            },
            _ => ProcessError::Spawn {
                executable: self.executable.clone(),
                source: e,
            },
        })?;

        // Dropping the child on timeout kills it.
        let output = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, child.wait_with_output())
                .await
                .map_err(|_| ProcessError::Timeout {
                    executable: self.executable.clone(),
                    timeout,
                })??,
            None => child.wait_with_output().await?,
        };

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Check that the executable starts, returning its `--version` output.
    pub async fn preflight(&self) -> ProcessResult<String> {
        let output = self.run(["--version"]).await?;
        Ok(output.stdout_text().trim().to_string())
    }
}

#[cfg(test)]
#[path = "process_test.rs"]
mod tests;
