//! sb-core - Core library for Schemabuild
//!
//! This crate provides the revision, script, and object types shared across
//! all Schemabuild components, project configuration, baseline state, and the
//! dependency-aware build planner.

pub mod baseline;
pub mod checksum;
pub mod config;
pub mod error;
mod newtype_string;
pub mod object;
pub mod plan;
pub mod planner;
pub mod revision;
pub mod script;

pub use baseline::{DatabaseSetting, RevisionBaseline, StateFile};
pub use checksum::compute_checksum;
pub use config::{Config, DatabaseConfig, Dialect, ExecutionConfig, GitConfig};
pub use error::{CoreError, CoreResult};
pub use object::{BuildActionType, ObjectDescriptor, ObjectKind, ObjectName};
pub use plan::{BuildItem, BuildPlan, BuildReason};
pub use planner::{ExpansionPolicy, PlanInput, Planner};
pub use revision::{ChangesetId, RevisionId, TagName};
pub use script::{ChangeKind, ScriptChange, ScriptFile, ScriptParser, ScriptPath};
