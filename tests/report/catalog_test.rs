//! Schema catalog driven composition against a SQLite catalog.

mod common;

use common::{id, validate_sql};
use reportsource::datasources::{ActivityProgress, Participants};
use reportsource::metadata::SqliteCatalog;
use reportsource::prelude::*;
use rusqlite::Connection;

fn site() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "
        CREATE TABLE mdl_modules (id INTEGER PRIMARY KEY, name TEXT NOT NULL, visible INTEGER NOT NULL);
        INSERT INTO mdl_modules (name, visible) VALUES
            ('assign', 1),
            ('chat', 0),
            ('label', 1),
            ('quiz', 1),
            ('quiz x) UNION SELECT password FROM mdl_user --', 1);
        CREATE TABLE mdl_assign (id INTEGER PRIMARY KEY, course INTEGER, name TEXT);
        CREATE TABLE mdl_chat (id INTEGER PRIMARY KEY, course INTEGER, name TEXT);
        CREATE TABLE mdl_label (id INTEGER PRIMARY KEY, course INTEGER, intro TEXT);
        CREATE TABLE mdl_quiz (id INTEGER PRIMARY KEY, course INTEGER, name TEXT);
        CREATE TABLE mdl_user (id INTEGER PRIMARY KEY, firstname TEXT, lastname TEXT, idnumber TEXT);
        ",
    )
    .unwrap();
    conn
}

fn context(conn: &Connection) -> ReportContext {
    let catalog = SqliteCatalog::new(conn, "mdl_").unwrap();
    let snapshot = CatalogSnapshot::capture(&catalog, "mdl_", &["user"]).unwrap();
    ReportContext::new(snapshot)
        .with_table_prefix("mdl_")
        .with_course(5)
}

#[test]
fn test_snapshot_keeps_unsafe_names_without_lookup() {
    let conn = site();
    let ctx = context(&conn);
    assert_eq!(ctx.catalog.modules().len(), 4);
    assert!(!ctx.catalog.modules().iter().any(|m| m == "chat"));
    assert!(ctx.catalog.has_column("quiz", "name"));
    assert!(ctx.catalog.has_column("user", "idnumber"));
}

#[test]
fn test_unsafe_module_never_reaches_sql() {
    let conn = site();
    let ds = ActivityProgress.initialise(&context(&conn)).unwrap();

    let activity = ds.entity("activity").unwrap();
    let name = activity.column("name").unwrap();
    let union = name.joins().last().unwrap().to_sql();
    assert!(union.contains("SELECT 'assign' AS modname"));
    assert!(union.contains("SELECT 'quiz' AS modname"));
    assert!(!union.contains("password"));
    assert!(!union.contains("'label'"));
    assert_eq!(name.joins().last().unwrap().params().len(), 2);

    let options: Vec<String> = match ds.filter(&id("activity:type")).unwrap().kind() {
        FilterKind::Select(options) => options.iter().map(|o| o.value.clone()).collect(),
        other => panic!("unexpected kind {other:?}"),
    };
    assert_eq!(options, ["assign", "label", "quiz"]);

    let sql = ds.compose_default().unwrap().query.to_sql_inlined();
    assert!(!sql.contains("password"));
    validate_sql(&sql);
}

#[test]
fn test_union_executes() {
    let conn = site();
    conn.execute_batch(
        "
        INSERT INTO mdl_assign VALUES (1, 5, 'Essay'), (2, 6, 'Elsewhere');
        INSERT INTO mdl_quiz VALUES (3, 5, 'Checkpoint');
        ",
    )
    .unwrap();
    let ds = ActivityProgress.initialise(&context(&conn)).unwrap();
    let join = ds
        .entity("activity")
        .unwrap()
        .column("name")
        .unwrap()
        .joins()
        .last()
        .unwrap()
        .clone();

    let sql = join.to_sql();
    let start = sql.find('(').unwrap() + 1;
    let end = sql.rfind(')').unwrap();
    let union = reportsource::sql::inline_params(&sql[start..end], join.params());

    let mut stmt = conn
        .prepare(&format!("SELECT modname, name FROM ({union}) ORDER BY name"))
        .unwrap();
    let rows: Vec<(String, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        rows,
        [
            ("quiz".to_string(), "Checkpoint".to_string()),
            ("assign".to_string(), "Essay".to_string()),
        ]
    );
}

#[test]
fn test_optional_user_column_follows_catalog() {
    let conn = site();
    let ds = Participants.initialise(&context(&conn)).unwrap();
    assert!(ds.column(&id("user:idnumber")).is_ok());

    let bare = ReportContext::new(CatalogSnapshot::default()).with_table_prefix("mdl_");
    let ds = Participants.initialise(&bare).unwrap();
    assert!(ds.column(&id("user:idnumber")).is_err());
}
