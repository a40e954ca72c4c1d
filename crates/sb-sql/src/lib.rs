//! sb-sql - SQL parsing layer for Schemabuild
//!
//! This crate turns script text into object descriptors using sqlparser-rs:
//! scripts are split into statements, each statement's header names the
//! object it declares, and an AST visitor collects what it depends on.

pub mod dialect;
pub mod error;
pub mod extractor;
pub mod header;
pub mod parser;
pub mod split;

pub use dialect::{DuckDbDialect, GenericDialect, SqlDialect};
pub use error::{SqlError, SqlResult};
pub use extractor::extract_dependencies;
pub use header::{StatementHeader, Verb};
pub use parser::SqlScriptParser;
pub use split::{split_statements, RawStatement};
