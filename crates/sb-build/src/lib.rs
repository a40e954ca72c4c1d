//! sb-build - Build execution for Schemabuild
//!
//! [`BuildExecutor`] applies a [`BuildPlan`](sb_core::BuildPlan) item by item
//! inside a caller-owned transaction. [`TargetDatabase`] pairs a database
//! with its recorded baseline and owns that transaction. [`run_build`] ties
//! diffing, planning, and execution into one request.

pub mod error;
pub mod executor;
pub mod pipeline;
pub mod target;

pub use error::{BuildError, BuildResult};
pub use executor::{BuildExecutor, BuildReport, ExecuteOptions};
pub use pipeline::{run_build, BuildMode, BuildRequest, BuildResponse};
pub use target::TargetDatabase;
