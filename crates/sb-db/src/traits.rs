//! Database and script executor trait definitions

use crate::error::DbResult;
use async_trait::async_trait;
use sb_core::{BuildActionType, ObjectDescriptor, ObjectKind, ObjectName};

/// Database abstraction trait for Schemabuild
///
/// Implementations must be Send + Sync for async operation.
#[async_trait]
pub trait Database: Send + Sync {
    /// Execute one or more SQL statements
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Check if a table or view exists
    async fn relation_exists(&self, name: &ObjectName) -> DbResult<bool>;

    /// Number of rows in a table
    async fn row_count(&self, table: &ObjectName) -> DbResult<usize>;

    /// Column names of a table, in declaration order
    async fn table_columns(&self, table: &ObjectName) -> DbResult<Vec<String>>;

    /// Create `target` as a plain copy of `source`'s rows, without constraints
    async fn copy_table(&self, source: &ObjectName, target: &ObjectName) -> DbResult<()>;

    /// Insert `columns` of every `source` row into `target`, returning the
    /// number of rows inserted
    async fn copy_rows(
        &self,
        source: &ObjectName,
        target: &ObjectName,
        columns: &[String],
    ) -> DbResult<usize>;

    /// Drop an object of the given kind if it exists
    async fn drop_object(&self, name: &ObjectName, kind: ObjectKind) -> DbResult<()>;

    /// Start a transaction
    async fn begin(&self) -> DbResult<()>;

    /// Commit the open transaction
    async fn commit(&self) -> DbResult<()>;

    /// Roll back the open transaction
    async fn rollback(&self) -> DbResult<()>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}

/// Applies one build item's statement to a database.
///
/// Implementations run inside a transaction owned by the caller and never
/// begin, commit, or roll back themselves.
#[async_trait]
pub trait ScriptExecutor: Send + Sync {
    /// Apply `sql` for `object` using the resolved `action`
    async fn execute(
        &self,
        sql: &str,
        object: &ObjectDescriptor,
        action: BuildActionType,
    ) -> DbResult<()>;

    /// Take `object` out ahead of its redefinition.
    ///
    /// Runs before any item of the plan executes, dependents first. The
    /// matching `execute` call with `Alter` creates the object again.
    async fn teardown(&self, object: &ObjectDescriptor) -> DbResult<()>;
}
