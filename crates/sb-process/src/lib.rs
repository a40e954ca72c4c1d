//! sb-process - External process wrapper for Schemabuild
//!
//! Runs an executable with arguments through `tokio::process`, captures both
//! output streams, and turns non-zero exits, missing executables, and
//! timeouts into distinct errors.

pub mod error;
pub mod process;

pub use error::{ProcessError, ProcessResult};
pub use process::{ExternalProcess, ProcessOutput};
