use super::*;

fn name(schema: &str, object: &str) -> ObjectName {
    ObjectName::new(schema, object)
}

fn parse(sql: &str) -> Vec<ObjectDescriptor> {
    SqlScriptParser::duckdb().parse_sql(sql).unwrap()
}

#[test]
fn test_single_table() {
    let objects = parse("CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT);\n");
    assert_eq!(objects.len(), 1);
    let t = &objects[0];
    assert_eq!(t.name, name("main", "customers"));
    assert_eq!(t.kind, ObjectKind::Table);
    assert_eq!(t.action, BuildActionType::Create);
    assert!(t.dependencies.is_empty());
    assert_eq!(t.sql, "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT)");
    assert!(t.is_definition());
}

#[test]
fn test_view_depends_on_table() {
    let objects = parse("CREATE VIEW active_customers AS SELECT id FROM customers WHERE id > 0");
    assert_eq!(objects[0].kind, ObjectKind::View);
    assert_eq!(
        objects[0].dependencies.iter().collect::<Vec<_>>(),
        vec![&name("main", "customers")]
    );
}

#[test]
fn test_names_are_case_normalized() {
    let objects = parse("CREATE VIEW Sales.Summary AS SELECT * FROM Sales.Orders");
    let v = &objects[0];
    assert_eq!(v.name, name("sales", "summary"));
    assert!(v.dependencies.contains(&name("sales", "orders")));
    assert!(v.dependencies.contains(&ObjectName::schema("sales")));
}

#[test]
fn test_multiple_objects_in_declaration_order() {
    let objects = parse(
        "CREATE TABLE b (id INT);\nCREATE TABLE a (id INT, b_id INT REFERENCES b(id));",
    );
    let names: Vec<_> = objects.iter().map(|o| o.name.to_string()).collect();
    assert_eq!(names, vec!["main.b", "main.a"]);
    assert!(objects[1].dependencies.contains(&name("main", "b")));
}

#[test]
fn test_trailing_statements_belong_to_previous_object() {
    let objects = parse(
        "CREATE TABLE status_codes (code INT);\n\
         INSERT INTO status_codes SELECT code FROM staging_codes;\n\
         INSERT INTO status_codes VALUES (0);",
    );
    assert_eq!(objects.len(), 1);
    let t = &objects[0];
    assert_eq!(
        t.sql,
        "CREATE TABLE status_codes (code INT);\n\
         INSERT INTO status_codes SELECT code FROM staging_codes;\n\
         INSERT INTO status_codes VALUES (0)"
    );
    assert!(t.dependencies.contains(&name("main", "staging_codes")));
    assert!(!t.dependencies.contains(&name("main", "status_codes")));
}

#[test]
fn test_repeated_statements_merge() {
    let objects = parse("CREATE TABLE t (id INT);\nALTER TABLE t ADD COLUMN note TEXT;");
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].action, BuildActionType::Create);
    assert!(objects[0].sql.ends_with("ALTER TABLE t ADD COLUMN note TEXT"));
}

#[test]
fn test_alter_script() {
    let objects = parse("ALTER TABLE orders ADD COLUMN shipped_at TIMESTAMP");
    assert_eq!(objects[0].action, BuildActionType::Alter);
    assert!(!objects[0].is_definition());
}

#[test]
fn test_drop_declares_each_name() {
    let objects = parse("DROP VIEW IF EXISTS old_a, reporting.old_b");
    assert_eq!(objects.len(), 2);
    assert!(objects.iter().all(|o| o.action == BuildActionType::Drop));
    assert!(objects.iter().all(|o| o.dependencies.is_empty()));
    assert_eq!(objects[1].name, name("reporting", "old_b"));
}

#[test]
fn test_rename_depends_on_old_name() {
    let objects = parse("ALTER TABLE sales.orders RENAME TO orders_archive");
    let r = &objects[0];
    assert_eq!(r.action, BuildActionType::Rename);
    assert_eq!(r.name, name("sales", "orders_archive"));
    assert!(r.dependencies.contains(&name("sales", "orders")));
}

#[test]
fn test_index_lives_in_table_schema() {
    let objects = parse("CREATE INDEX idx_orders_date ON sales.orders (order_date)");
    let idx = &objects[0];
    assert_eq!(idx.kind, ObjectKind::Index);
    assert_eq!(idx.name, name("sales", "idx_orders_date"));
    assert!(idx.dependencies.contains(&name("sales", "orders")));
}

#[test]
fn test_schema_declaration() {
    let objects = parse("CREATE SCHEMA IF NOT EXISTS Reporting");
    assert_eq!(objects[0].kind, ObjectKind::Schema);
    assert_eq!(objects[0].name, ObjectName::schema("reporting"));
    assert!(objects[0].dependencies.is_empty());
}

#[test]
fn test_macro_dependencies() {
    let objects = parse("CREATE MACRO order_count() AS TABLE SELECT count(*) AS n FROM orders");
    assert_eq!(objects[0].kind, ObjectKind::Macro);
    assert!(objects[0].dependencies.contains(&name("main", "orders")));
}

#[test]
fn test_empty_and_comment_only_scripts() {
    assert!(parse("").is_empty());
    assert!(parse("-- nothing yet\n/* todo */").is_empty());
}

#[test]
fn test_leading_statement_without_object_is_ignored() {
    let objects = parse("SET threads = 1;\nCREATE TABLE t (x INT);");
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].sql, "CREATE TABLE t (x INT)");
}

#[test]
fn test_custom_default_schema() {
    let parser = SqlScriptParser::new(Dialect::Generic, "App");
    let objects = parser.parse_sql("CREATE VIEW v AS SELECT * FROM t").unwrap();
    assert_eq!(objects[0].name, name("app", "v"));
    assert!(objects[0].dependencies.contains(&name("app", "t")));
    assert!(!objects[0].dependencies.contains(&ObjectName::schema("app")));
}

#[test]
fn test_parse_error_names_script() {
    let script = ScriptFile::new("sql/broken.sql", "CREATE TABLE t (id INT);\nCREATE VIEW v AS SELEC 1;");
    let err = SqlScriptParser::duckdb().parse(&script).unwrap_err();
    match err {
        CoreError::ParseError { path, message } => {
            assert_eq!(path, "sql/broken.sql");
            assert!(message.contains("line 2"), "{message}");
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_script_parser_trait() {
    let parser: &dyn ScriptParser = &SqlScriptParser::default();
    let script = ScriptFile::new("v.sql", "CREATE VIEW v AS SELECT * FROM t");
    let objects = parser.parse(&script).unwrap();
    assert_eq!(objects[0].name, name("main", "v"));
}
