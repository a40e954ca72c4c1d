use super::*;
use crate::{DbError, DuckDbBackend};
use sb_core::{ObjectKind, ObjectName};

fn t() -> ObjectName {
    ObjectName::new("main", "t")
}

fn table(sql: &str) -> ObjectDescriptor {
    ObjectDescriptor::new(
        ObjectName::new("main", "t"),
        ObjectKind::Table,
        BuildActionType::Create,
        sql,
    )
}

async fn run(db: &DuckDbBackend, object: &ObjectDescriptor, action: BuildActionType) -> DbResult<()> {
    DatabaseScriptExecutor::new(db)
        .execute(&object.sql, object, action)
        .await
}

#[tokio::test]
async fn test_create_runs_statement() {
    let db = DuckDbBackend::in_memory().unwrap();
    run(&db, &table("CREATE TABLE t (id INT)"), BuildActionType::Create)
        .await
        .unwrap();
    assert!(db.relation_exists(&ObjectName::new("main", "t")).await.unwrap());
}

#[tokio::test]
async fn test_redefined_table_keeps_its_rows() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (id INT, legacy TEXT); INSERT INTO t VALUES (1, 'a'), (2, 'b'), (3, 'c');")
        .await
        .unwrap();

    run(&db, &table("CREATE TABLE t (id INT, name TEXT)"), BuildActionType::Alter)
        .await
        .unwrap();

    assert_eq!(db.row_count(&t()).await.unwrap(), 3);
    assert_eq!(
        db.table_columns(&t()).await.unwrap(),
        vec!["id".to_string(), "name".to_string()]
    );
    assert!(!db
        .relation_exists(&ObjectName::new("main", "__sb_saved_t"))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_teardown_then_redefine_restores_rows() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (id INT); INSERT INTO t VALUES (1), (2);")
        .await
        .unwrap();
    let object = table("CREATE TABLE t (id INT, note TEXT)");
    let executor = DatabaseScriptExecutor::new(&db);

    executor.teardown(&object).await.unwrap();
    assert!(!db.relation_exists(&t()).await.unwrap());

    executor
        .execute(&object.sql, &object, BuildActionType::Alter)
        .await
        .unwrap();
    assert_eq!(db.row_count(&t()).await.unwrap(), 2);
}

#[tokio::test]
async fn test_referenced_table_comes_down_after_its_dependent() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE orders (id INT PRIMARY KEY);
         CREATE TABLE order_lines (order_id INT REFERENCES orders(id));
         INSERT INTO orders VALUES (1), (2);
         INSERT INTO order_lines VALUES (1), (2), (2);",
    )
    .await
    .unwrap();
    let orders = ObjectDescriptor::new(
        ObjectName::new("main", "orders"),
        ObjectKind::Table,
        BuildActionType::Create,
        "CREATE TABLE orders (id INT PRIMARY KEY, placed DATE)",
    );
    let lines = ObjectDescriptor::new(
        ObjectName::new("main", "order_lines"),
        ObjectKind::Table,
        BuildActionType::Create,
        "CREATE TABLE order_lines (order_id INT REFERENCES orders(id))",
    )
    .with_dependencies([orders.name.clone()]);
    let executor = DatabaseScriptExecutor::new(&db);

    executor.teardown(&lines).await.unwrap();
    executor.teardown(&orders).await.unwrap();
    for object in [&orders, &lines] {
        executor
            .execute(&object.sql, object, BuildActionType::Alter)
            .await
            .unwrap();
    }

    assert_eq!(db.row_count(&orders.name).await.unwrap(), 2);
    assert_eq!(db.row_count(&lines.name).await.unwrap(), 3);
}

#[tokio::test]
async fn test_script_that_fills_its_table_owns_the_rows() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (id INT); INSERT INTO t VALUES (1), (2);")
        .await
        .unwrap();

    let seeded = table("CREATE TABLE t (id INT, code TEXT);\nINSERT INTO t VALUES (10, 'x');");
    run(&db, &seeded, BuildActionType::Alter).await.unwrap();

    assert_eq!(db.row_count(&t()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_rows_without_shared_columns_fail_the_redefinition() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (id INT); INSERT INTO t VALUES (1);")
        .await
        .unwrap();

    let err = run(&db, &table("CREATE TABLE t (code TEXT)"), BuildActionType::Alter)
        .await
        .unwrap_err();

    match err {
        DbError::RowsNotPreserved { table, rows, .. } => {
            assert_eq!(table, "main.t");
            assert_eq!(rows, 1);
        }
        other => panic!("expected rows not preserved, got {other:?}"),
    }
}

#[tokio::test]
async fn test_redefined_view_is_replaced() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE VIEW v AS SELECT 1 AS a").await.unwrap();
    let view = ObjectDescriptor::new(
        ObjectName::new("main", "v"),
        ObjectKind::View,
        BuildActionType::Create,
        "CREATE VIEW v AS SELECT 2 AS b",
    );

    run(&db, &view, BuildActionType::Alter).await.unwrap();
    db.execute_batch("SELECT b FROM v").await.unwrap();
}

#[tokio::test]
async fn test_alter_statement_runs_in_place() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (id INT); INSERT INTO t VALUES (1);")
        .await
        .unwrap();

    let mut object = table("ALTER TABLE t ADD COLUMN name TEXT");
    object.action = BuildActionType::Alter;
    run(&db, &object, BuildActionType::Alter).await.unwrap();

    assert_eq!(db.row_count(&t()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_drop_ignores_statement_text() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (id INT)").await.unwrap();

    run(&db, &table("CREATE TABLE t (id INT)"), BuildActionType::Drop)
        .await
        .unwrap();
    assert!(!db.relation_exists(&ObjectName::new("main", "t")).await.unwrap());
}

#[tokio::test]
async fn test_noop_does_nothing() {
    let db = DuckDbBackend::in_memory().unwrap();
    run(&db, &table("this is not sql"), BuildActionType::NoOp)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failure_is_reported() {
    let db = DuckDbBackend::in_memory().unwrap();
    let object = ObjectDescriptor::new(
        ObjectName::new("main", "v"),
        ObjectKind::View,
        BuildActionType::Create,
        "CREATE VIEW v AS SELECT * FROM nowhere",
    );
    assert!(run(&db, &object, BuildActionType::Create).await.is_err());
}
