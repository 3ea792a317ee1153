//! Shipped datasources: composition, validation and execution against SQLite.

mod common;

use common::{fetch, id, validate_sql};
use reportsource::datasources::{self, ActivityProgress, Participants};
use reportsource::prelude::*;
use reportsource::report::TextOperator;
use reportsource::sql::ParamValue;
use rusqlite::Connection;

fn catalog() -> CatalogSnapshot {
    let catalog = StaticCatalog::new().with_standard_modules("mdl_", &["assign", "quiz"]);
    CatalogSnapshot::capture(&catalog, "mdl_", &["user"]).unwrap()
}

fn site_context() -> ReportContext {
    ReportContext::new(catalog()).with_table_prefix("mdl_")
}

fn course_context(course: i64) -> ReportContext {
    site_context().with_course(course)
}

fn sample_value(kind: &FilterKind) -> FilterValue {
    match kind {
        FilterKind::Text => FilterValue::Text(TextOperator::Contains, "a".into()),
        FilterKind::Date => FilterValue::DateRange {
            from: Some(1),
            to: Some(2_000_000_000),
        },
        FilterKind::Boolean => FilterValue::Boolean(true),
        FilterKind::Select(options) => FilterValue::Select(options[0].value.clone()),
    }
}

fn everything(ds: &ComposedDatasource) -> ReportSelection {
    let mut selection = ReportSelection::new();
    for column in ds.get_columns() {
        selection = selection.column(column.id().clone());
    }
    for filter in ds.get_filters() {
        selection = selection.filter(filter.id().clone(), sample_value(filter.kind()));
    }
    for condition in ds.get_conditions() {
        selection = selection.condition(condition.id().clone(), sample_value(condition.kind()));
    }
    selection
}

#[test]
fn test_participants_site_wide() {
    let ds = Participants.initialise(&site_context()).unwrap();
    assert!(ds.entity("completion").is_none());

    let report = ds.compose_default().unwrap();
    let sql = report.query.to_sql();
    assert_eq!(sql.matches("mdl_enrol e").count(), 1, "{sql}");
    assert!(sql.starts_with("SELECT CONCAT(u.firstname, ' ', u.lastname) AS c0_0, u.email AS c1_0"));
    assert!(sql.contains(
        "FROM mdl_user u JOIN mdl_user_enrolments ue ON ue.userid = u.id JOIN mdl_enrol e ON e.id = ue.enrolid"
    ));
    assert!(sql.contains("WHERE (u.deleted = 0) AND (ue.status = :rsparam1)"));
    assert!(!sql.contains("e.courseid"));
    assert_eq!(report.query.params(), [("rsparam1".to_string(), ParamValue::Int(0))]);
}

#[test]
fn test_participants_in_course() {
    let ds = Participants.initialise(&course_context(42)).unwrap();
    assert!(ds.entity("completion").is_some());
    assert!(ds.column(&id("completion:progress")).is_ok());

    let report = ds.compose_default().unwrap();
    let sql = report.query.to_sql();
    assert_eq!(sql.matches("mdl_enrol e").count(), 1);
    assert!(sql.contains("(e.courseid = :"));
    assert!(report
        .query
        .params()
        .iter()
        .any(|(_, v)| v == &ParamValue::Int(42)));
    // Completion joins only appear when a completion column is selected.
    assert!(!sql.contains("course_completions"));
}

#[test]
fn test_participants_progress_column_brings_its_joins() {
    let ds = Participants.initialise(&course_context(42)).unwrap();
    let report = ds
        .compose(
            &ReportSelection::new()
                .column(id("user:fullname"))
                .column(id("completion:progress")),
        )
        .unwrap();
    let joins: Vec<String> = report.query.joins().iter().map(|j| j.to_sql()).collect();
    assert_eq!(joins.len(), 5, "{joins:#?}");
    assert!(joins[2].starts_with("LEFT JOIN mdl_course_completions ccomp"));
    assert!(joins[3].ends_with(") cprog ON cprog.userid = u.id"));
    assert!(joins[4].starts_with("CROSS JOIN (SELECT COUNT(1) AS total"));

    let course_params = report
        .query
        .params()
        .iter()
        .filter(|(_, v)| v == &ParamValue::Int(42))
        .count();
    assert_eq!(course_params, 4);
    validate_sql(&report.query.to_sql_inlined());
}

#[test]
fn test_participants_defaults_and_bulk_action() {
    let ds = Participants.initialise(&site_context()).unwrap();

    let defaults: Vec<String> = ds
        .get_default_columns()
        .iter()
        .map(|c| c.id().to_string())
        .collect();
    assert_eq!(
        defaults,
        [
            "user:fullname",
            "user:email",
            "enrolment:method",
            "enrolment:timestarted",
            "enrolment:status"
        ]
    );
    assert_eq!(
        ds.default_condition_values(),
        [(id("enrolment:status"), FilterValue::Select("0".into()))]
    );
    assert_eq!(ds.default_sort(), [(id("user:fullname"), SortDir::Asc)]);

    let action = ds.bulk_action().unwrap();
    assert_eq!(action.identifier, "emailselected");
    assert_eq!(action.path, "/local/reportsource/bulkemail.php");
    assert_eq!(action.trigger_label.to_string(), "Email selected users");
}

#[test]
fn test_activity_progress_needs_course() {
    let err = ActivityProgress.initialise(&site_context()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "configuration error: datasource 'activity_progress' requires a course id"
    );
}

#[test]
fn test_activity_progress_unions_installed_modules() {
    let ds = ActivityProgress.initialise(&course_context(7)).unwrap();
    let report = ds.compose_default().unwrap();
    let sql = report.query.to_sql();

    assert!(sql.contains("FROM mdl_assign x WHERE x.course = :"));
    assert!(sql.contains(" UNION ALL SELECT 'quiz' AS modname"));
    assert!(sql.contains("JOIN mdl_course_modules cm ON cm.course = e.courseid"));
    assert!(sql.contains("(cm.completion > 0) AND (cm.deletioninprogress = 0)"));
    assert!(sql.ends_with("ORDER BY CONCAT(u.firstname, ' ', u.lastname) ASC, act.name ASC"));
    assert!(!sql.contains("course_completions"));

    // Only the subset the datasource exposes.
    assert!(ds.column(&id("user:username")).is_err());
    assert!(ds.condition(&id("enrolment:status")).is_ok());
    assert!(ds.filter(&id("enrolment:status")).is_err());
}

#[test]
fn test_every_selection_composes_to_valid_sql() {
    for datasource in datasources::all() {
        let ds = datasource.initialise(&course_context(3)).unwrap();
        let selection = everything(&ds);
        let report = ds.compose(&selection).unwrap();
        assert_eq!(report.columns.len(), ds.get_columns().len());
        validate_sql(&report.query.to_sql_inlined());
        validate_sql(&report.query.count_sql());

        for column in ds.get_columns().into_iter().filter(|c| c.is_sortable()) {
            let sorted = ds
                .compose(
                    &ReportSelection::new()
                        .column(id("user:fullname"))
                        .sort(column.id().clone(), SortDir::Desc),
                )
                .unwrap();
            validate_sql(&sorted.query.to_sql_inlined());
        }
    }
}

#[test]
fn test_invalid_selection_value() {
    let ds = Participants.initialise(&site_context()).unwrap();
    let err = ds
        .compose(&ReportSelection::new().filter(id("user:email"), FilterValue::Boolean(true)))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid value for filter 'user:email': a boolean value does not fit a text filter"
    );
}

fn moodle_site() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "
        CREATE TABLE mdl_user (
            id INTEGER PRIMARY KEY, firstname TEXT, lastname TEXT, email TEXT,
            username TEXT, lastaccess INTEGER, suspended INTEGER, deleted INTEGER
        );
        CREATE TABLE mdl_enrol (id INTEGER PRIMARY KEY, courseid INTEGER, enrol TEXT);
        CREATE TABLE mdl_user_enrolments (
            id INTEGER PRIMARY KEY, userid INTEGER, enrolid INTEGER, status INTEGER,
            timestart INTEGER, timeend INTEGER, timecreated INTEGER
        );
        CREATE TABLE mdl_modules (id INTEGER PRIMARY KEY, name TEXT, visible INTEGER);
        CREATE TABLE mdl_course_modules (
            id INTEGER PRIMARY KEY, course INTEGER, module INTEGER, instance INTEGER,
            completion INTEGER, deletioninprogress INTEGER
        );
        CREATE TABLE mdl_course_modules_completion (
            id INTEGER PRIMARY KEY, coursemoduleid INTEGER, userid INTEGER,
            completionstate INTEGER, timemodified INTEGER
        );
        CREATE TABLE mdl_assign (id INTEGER PRIMARY KEY, course INTEGER, name TEXT);
        CREATE TABLE mdl_quiz (id INTEGER PRIMARY KEY, course INTEGER, name TEXT);

        INSERT INTO mdl_user VALUES
            (1, 'Bob', 'Ray', 'bob@example.com', 'bob', 0, 0, 0),
            (2, 'Ann', 'Lee', 'ann@example.com', 'ann', 0, 0, 0),
            (3, 'Cat', 'Zed', 'cat@example.com', 'cat', 0, 0, 1),
            (4, 'Dan', 'Fox', 'dan@example.com', 'dan', 0, 0, 0);
        INSERT INTO mdl_enrol VALUES (10, 2, 'manual'), (11, 3, 'self');
        INSERT INTO mdl_user_enrolments VALUES
            (1, 1, 11, 0, 0, 0, 0),
            (2, 2, 10, 0, 1709618820, 0, 0),
            (3, 3, 10, 0, 0, 0, 0),
            (4, 4, 10, 1, 0, 0, 0);

        INSERT INTO mdl_modules VALUES (1, 'assign', 1), (2, 'quiz', 1);
        INSERT INTO mdl_course_modules VALUES
            (100, 2, 1, 5, 1, 0),
            (101, 2, 2, 6, 1, 0),
            (102, 2, 2, 7, 0, 0),
            (103, 3, 1, 8, 1, 0);
        INSERT INTO mdl_assign VALUES (5, 2, 'Essay'), (8, 3, 'Other course');
        INSERT INTO mdl_quiz VALUES (6, 2, 'Final quiz'), (7, 2, 'Practice');
        INSERT INTO mdl_course_modules_completion VALUES (1, 100, 2, 1, 1709618820);
        ",
    )
    .unwrap();
    conn
}

#[test]
fn test_participants_rows() {
    let conn = moodle_site();
    let ds = Participants.initialise(&site_context()).unwrap();
    let report = ds.compose_default().unwrap();

    let render = RenderContext::default();
    let rows: Vec<Vec<String>> = fetch(&conn, &report)
        .iter()
        .map(|row| report.format_row(row, &render))
        .collect();

    // Cat is deleted, Dan's enrolment is suspended.
    assert_eq!(
        rows,
        [
            vec!["Ann Lee", "ann@example.com", "manual", "5 March 2024, 6:07 AM", "Active"],
            vec!["Bob Ray", "bob@example.com", "self", "", "Active"],
        ]
    );
}

#[test]
fn test_participants_rows_for_one_course() {
    let conn = moodle_site();
    let ds = Participants.initialise(&course_context(2)).unwrap();
    let report = ds
        .compose(
            &ReportSelection::new()
                .column(id("user:fullname"))
                .column(id("enrolment:status"))
                .sort(id("user:fullname"), SortDir::Asc),
        )
        .unwrap();

    let render = RenderContext::default();
    let names: Vec<Vec<String>> = fetch(&conn, &report)
        .iter()
        .map(|row| report.format_row(row, &render))
        .collect();
    assert_eq!(
        names,
        [vec!["Ann Lee", "Active"], vec!["Dan Fox", "Suspended"]]
    );
}

#[test]
fn test_activity_progress_rows() {
    let conn = moodle_site();
    let ds = ActivityProgress.initialise(&course_context(2)).unwrap();
    let report = ds.compose_default().unwrap();

    let render = RenderContext::default();
    let rows: Vec<Vec<String>> = fetch(&conn, &report)
        .iter()
        .map(|row| report.format_row(row, &render))
        .collect();

    assert_eq!(
        rows,
        [
            vec!["Ann Lee", "Essay", "assign", "Completed", "5 March 2024, 6:07 AM"],
            vec!["Ann Lee", "Final quiz", "quiz", "Not completed", ""],
        ]
    );
}
