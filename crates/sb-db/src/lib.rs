//! sb-db - Database abstraction layer for Schemabuild
//!
//! This crate provides the `Database` trait, a DuckDB implementation, an
//! explicit transaction scope, and the `ScriptExecutor` capability that
//! applies one build item's statement.

pub mod duckdb;
pub mod error;
pub mod executor;
pub mod traits;
pub mod transaction;

pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use executor::DatabaseScriptExecutor;
pub use traits::{Database, ScriptExecutor};
pub use transaction::Transaction;
