//! sb-repo - Script repositories for Schemabuild
//!
//! A [`ScriptRepository`] answers two questions about versioned SQL scripts:
//! which scripts changed between two revisions, and what every script looks
//! like at one revision. [`GitScriptRepository`] shells out to git;
//! [`InMemoryScriptRepository`] serves snapshots held in memory.

pub mod error;
pub mod git;
pub mod memory;
pub mod traits;

pub use error::{RepoError, RepoResult};
pub use git::GitScriptRepository;
pub use memory::InMemoryScriptRepository;
pub use traits::ScriptRepository;
