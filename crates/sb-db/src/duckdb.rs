//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::Database;
use async_trait::async_trait;
use duckdb::Connection;
use sb_core::{ObjectKind, ObjectName};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// DuckDB database backend
///
/// The connection is shared behind a mutex and every call runs on the
/// blocking thread pool.
#[derive(Clone)]
pub struct DuckDbBackend {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{}: {}", path.display(), e)))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> DbResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> DbResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| DbError::Internal(format!("database task failed: {}", e)))?
    }

    async fn execute_batch_owned(&self, sql: String) -> DbResult<()> {
        self.with_conn(move |conn| {
            conn.execute_batch(&sql)
                .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql.trim())))
        })
        .await
    }
}

/// Quote an identifier for DuckDB
fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Qualified, quoted name of an object as it appears in DDL
fn qualified(name: &ObjectName) -> String {
    if name.is_schema() {
        quote_ident(&name.schema)
    } else {
        format!("{}.{}", quote_ident(&name.schema), quote_ident(&name.name))
    }
}

/// `DROP` statement(s) removing an object of `kind` if present
fn drop_sql(name: &ObjectName, kind: ObjectKind) -> String {
    let target = qualified(name);
    match kind {
        // scalar and table macros live in separate catalogs
        ObjectKind::Macro | ObjectKind::Function => format!(
            "DROP MACRO IF EXISTS {target}; DROP MACRO TABLE IF EXISTS {target};"
        ),
        other => format!("DROP {} IF EXISTS {};", other.sql_keyword(), target),
    }
}

#[async_trait]
impl Database for DuckDbBackend {
    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.execute_batch_owned(sql.to_string()).await
    }

    async fn relation_exists(&self, name: &ObjectName) -> DbResult<bool> {
        let schema = name.schema.clone();
        let table = name.name.clone();
        self.with_conn(move |conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM information_schema.tables \
                     WHERE lower(table_schema) = ? AND lower(table_name) = ?",
                    duckdb::params![schema, table],
                    |row| row.get(0),
                )
                .map_err(|e| DbError::ExecutionError(e.to_string()))?;
            Ok(count > 0)
        })
        .await
    }

    async fn row_count(&self, table: &ObjectName) -> DbResult<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", qualified(table));
        self.with_conn(move |conn| {
            let count: i64 = conn
                .query_row(&sql, [], |row| row.get(0))
                .map_err(DbError::from)?;
            Ok(count as usize)
        })
        .await
    }

    async fn table_columns(&self, table: &ObjectName) -> DbResult<Vec<String>> {
        let schema = table.schema.clone();
        let name = table.name.clone();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT column_name FROM information_schema.columns \
                     WHERE lower(table_schema) = ? AND lower(table_name) = ? \
                     ORDER BY ordinal_position",
                )
                .map_err(DbError::from)?;
            let columns = stmt
                .query_map(duckdb::params![schema, name], |row| row.get::<_, String>(0))
                .map_err(DbError::from)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(DbError::from)?;
            Ok(columns)
        })
        .await
    }

    async fn copy_table(&self, source: &ObjectName, target: &ObjectName) -> DbResult<()> {
        self.execute_batch_owned(format!(
            "CREATE TABLE {} AS SELECT * FROM {};",
            qualified(target),
            qualified(source)
        ))
        .await
    }

    async fn copy_rows(
        &self,
        source: &ObjectName,
        target: &ObjectName,
        columns: &[String],
    ) -> DbResult<usize> {
        let list = columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({list}) SELECT {list} FROM {}",
            qualified(target),
            qualified(source)
        );
        self.with_conn(move |conn| {
            conn.execute(&sql, [])
                .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))
        })
        .await
    }

    async fn drop_object(&self, name: &ObjectName, kind: ObjectKind) -> DbResult<()> {
        self.execute_batch_owned(drop_sql(name, kind)).await
    }

    async fn begin(&self) -> DbResult<()> {
        self.execute_batch_owned("BEGIN TRANSACTION".to_string())
            .await
            .map_err(|e| DbError::TransactionError(e.to_string()))
    }

    async fn commit(&self) -> DbResult<()> {
        self.execute_batch_owned("COMMIT".to_string())
            .await
            .map_err(|e| DbError::TransactionError(e.to_string()))
    }

    async fn rollback(&self) -> DbResult<()> {
        self.execute_batch_owned("ROLLBACK".to_string())
            .await
            .map_err(|e| DbError::TransactionError(e.to_string()))
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
