//! Script executor backed by a [`Database`]

use crate::error::{DbError, DbResult};
use crate::traits::{Database, ScriptExecutor};
use async_trait::async_trait;
use log::{debug, info, warn};
use sb_core::{BuildActionType, ObjectDescriptor, ObjectKind, ObjectName};

/// Prefix of the side table holding a redefined table's rows
const SAVED_ROWS_PREFIX: &str = "__sb_saved_";

/// Applies build items by running their statements on a database.
///
/// - `Create` and `Rename` run the statement as written.
/// - `Alter` runs `ALTER` statements as written. A `CREATE` statement is a
///   redefinition: the object is taken down (see
///   [`teardown`](ScriptExecutor::teardown)) and created again.
/// - `Drop` removes the object with `DROP <kind> IF EXISTS`.
/// - `NoOp` does nothing.
///
/// A redefined table keeps its rows. They are copied to a side table on
/// teardown and inserted back into the columns both definitions share. A
/// script that fills the table itself owns its contents, and the saved rows
/// are discarded with a warning.
pub struct DatabaseScriptExecutor<'a> {
    db: &'a dyn Database,
}

impl<'a> DatabaseScriptExecutor<'a> {
    /// Execute against `db`, usually a transaction's database
    pub fn new(db: &'a dyn Database) -> Self {
        Self { db }
    }

    async fn redefine(&self, sql: &str, object: &ObjectDescriptor) -> DbResult<()> {
        debug!("Redefining {} {}", object.kind, object.name);
        // no-op when the teardown pass already ran
        self.teardown(object).await?;
        self.db.execute_batch(sql).await?;
        if object.kind == ObjectKind::Table {
            self.restore_rows(&object.name).await?;
        }
        Ok(())
    }

    async fn restore_rows(&self, table: &ObjectName) -> DbResult<()> {
        let saved = saved_rows_table(table);
        if !self.db.relation_exists(&saved).await? {
            return Ok(());
        }

        if self.db.row_count(table).await? > 0 {
            warn!(
                "{} was filled by its script; rows from the previous definition are discarded",
                table
            );
        } else {
            let current = self.db.table_columns(table).await?;
            let previous = self.db.table_columns(&saved).await?;
            let shared: Vec<String> = current
                .into_iter()
                .filter(|c| previous.iter().any(|p| p.eq_ignore_ascii_case(c)))
                .collect();
            if shared.is_empty() {
                return Err(DbError::RowsNotPreserved {
                    table: table.to_string(),
                    rows: self.db.row_count(&saved).await?,
                    reason: "the new definition shares no column with the old one".to_string(),
                });
            }
            let restored = self.db.copy_rows(&saved, table, &shared).await?;
            info!("Restored {} row(s) into {}", restored, table);
        }

        self.db.drop_object(&saved, ObjectKind::Table).await
    }
}

/// Side table for `table`'s rows while it is redefined
fn saved_rows_table(table: &ObjectName) -> ObjectName {
    ObjectName::new(&table.schema, format!("{}{}", SAVED_ROWS_PREFIX, table.name))
}

#[async_trait]
impl ScriptExecutor for DatabaseScriptExecutor<'_> {
    async fn execute(
        &self,
        sql: &str,
        object: &ObjectDescriptor,
        action: BuildActionType,
    ) -> DbResult<()> {
        match action {
            BuildActionType::NoOp => Ok(()),
            BuildActionType::Drop => self.db.drop_object(&object.name, object.kind).await,
            BuildActionType::Create | BuildActionType::Rename => self.db.execute_batch(sql).await,
            BuildActionType::Alter if object.is_definition() => self.redefine(sql, object).await,
            BuildActionType::Alter => self.db.execute_batch(sql).await,
        }
    }

    async fn teardown(&self, object: &ObjectDescriptor) -> DbResult<()> {
        if object.kind == ObjectKind::Table && self.db.relation_exists(&object.name).await? {
            let rows = self.db.row_count(&object.name).await?;
            if rows > 0 {
                let saved = saved_rows_table(&object.name);
                debug!("Saving {} row(s) of {} in {}", rows, object.name, saved);
                self.db.drop_object(&saved, ObjectKind::Table).await?;
                self.db.copy_table(&object.name, &saved).await?;
            }
        }
        self.db.drop_object(&object.name, object.kind).await
    }
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;
