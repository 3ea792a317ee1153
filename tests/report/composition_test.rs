//! Datasource composition: alias bookkeeping, join deduplication and defaults.

mod common;

use common::{context, id, validate_sql, EnrolEntity, EventEntity, PersonEntity, Scenario};
use reportsource::prelude::*;
use reportsource::report::TextOperator;
use reportsource::sql::ParamValue;

fn join_texts(ds: &ComposedDatasource, selection: &ReportSelection) -> Vec<String> {
    ds.compose(selection)
        .unwrap()
        .query
        .joins()
        .iter()
        .map(|j| j.to_sql())
        .collect()
}

#[test]
fn test_enrol_join_emitted_once() {
    let ds = Scenario { reversed: false }.initialise(&context()).unwrap();
    let selection = ReportSelection::new()
        .column(id("person:name"))
        .column(id("enrol:method"))
        .column(id("enrol:status"))
        .condition(id("enrol:status"), FilterValue::Select("0".into()))
        .sort(id("enrol:method"), SortDir::Desc);

    let report = ds.compose(&selection).unwrap();
    let sql = report.query.to_sql();
    assert_eq!(sql.matches("mdl_enrol e").count(), 1, "{sql}");
    assert_eq!(report.query.joins().len(), 1);
    assert!(sql.contains("WHERE (e.status = :rsparam1)"));
    assert!(sql.ends_with("ORDER BY e.enrol DESC"));
    assert_eq!(report.query.param("rsparam1"), Some(&ParamValue::Int(0)));
}

#[test]
fn test_default_sql() {
    let ds = Scenario { reversed: false }.initialise(&context()).unwrap();
    let sql = ds.compose_default().unwrap().query.to_sql();
    insta::assert_snapshot!(sql, @"SELECT u.firstname AS c0_0, e.enrol AS c1_0 FROM mdl_user u JOIN mdl_enrol e ON e.userid = u.id ORDER BY u.firstname ASC");
}

#[test]
fn test_defaults_resolve_to_attached_entities() {
    let ds = Scenario { reversed: false }.initialise(&context()).unwrap();

    let columns: Vec<String> = ds
        .get_default_columns()
        .iter()
        .map(|c| c.id().to_string())
        .collect();
    assert_eq!(columns, ["person:name", "enrol:method"]);
    for column in ds.get_default_columns() {
        assert!(ds.entity(&column.id().entity).is_some());
    }
    assert_eq!(ds.get_default_filters()[0].id(), &id("person:email"));
    assert_eq!(ds.get_default_conditions()[0].id(), &id("enrol:status"));
    assert_eq!(ds.get_columns().len(), 4);
}

#[test]
fn test_dedup_independent_of_attach_order() {
    let forward = Scenario { reversed: false }.initialise(&context()).unwrap();
    let reversed = Scenario { reversed: true }.initialise(&context()).unwrap();

    let everything = ReportSelection::new()
        .column(id("enrol:status"))
        .column(id("person:email"))
        .column(id("enrol:method"))
        .condition(id("enrol:status"), FilterValue::Any);

    let mut a = join_texts(&forward, &everything);
    let mut b = join_texts(&reversed, &everything);
    a.sort();
    b.sort();
    assert_eq!(a, b);
    assert_eq!(a, ["JOIN mdl_enrol e ON e.userid = u.id"]);

    assert_eq!(
        forward.compose_default().unwrap().query.to_sql(),
        reversed.compose_default().unwrap().query.to_sql()
    );
}

#[test]
fn test_alias_conflict_fails_at_initialise() {
    let ctx = context();
    let mut ds = DatasourceBuilder::new("conflict", &ctx);
    ds.set_main_table("user", "u").unwrap();
    ds.add_entity(EnrolEntity::new()).unwrap();
    let err = ds.add_entity(EventEntity::new()).unwrap_err();

    match err {
        ReportError::Configuration(ConfigurationError::AliasConflict {
            alias,
            first,
            second,
        }) => {
            assert_eq!(alias, "e");
            assert_eq!(first, "enrol");
            assert_eq!(second, "event");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_base_alias_conflicts_with_entity() {
    let ctx = context();
    let mut ds = DatasourceBuilder::new("conflict", &ctx);
    ds.set_main_table("event", "e").unwrap();
    let err = ds.add_entity(EnrolEntity::new()).unwrap_err();
    assert!(matches!(
        err,
        ReportError::Configuration(ConfigurationError::AliasConflict { .. })
    ));
}

#[test]
fn test_different_join_on_same_alias_rejected() {
    let ctx = context();
    let mut ds = DatasourceBuilder::new("ambiguous", &ctx);
    ds.set_main_table("user", "u").unwrap();
    ds.add_join(JoinFragment::inner("mdl_enrol", "e").on("e.courseid = u.id"))
        .unwrap();
    ds.add_entity(EnrolEntity::new()).unwrap();
    ds.add_all_from_entity("enrol").unwrap();

    let err = ds.build().unwrap_err();
    assert_eq!(
        err.to_string(),
        "configuration error: alias 'e' is introduced by two different joins"
    );
}

#[test]
fn test_identical_datasource_join_is_deduplicated() {
    let ctx = context();
    let mut ds = DatasourceBuilder::new("dedup", &ctx);
    ds.set_main_table("user", "u").unwrap();
    ds.add_join(JoinFragment::raw(
        "JOIN mdl_enrol e\n    ON e.userid = u.id",
        &["e"],
    ))
    .unwrap();
    ds.add_entity(EnrolEntity::new()).unwrap();
    ds.add_all_from_entity("enrol").unwrap();
    let ds = ds.build().unwrap();

    let report = ds
        .compose(&ReportSelection::new().column(id("enrol:method")))
        .unwrap();
    assert_eq!(report.query.joins().len(), 1);
}

#[test]
fn test_datasource_join_spaced_differently_is_deduplicated() {
    let ctx = context();
    let mut ds = DatasourceBuilder::new("dedup", &ctx);
    ds.set_main_table("user", "u").unwrap();
    ds.add_join(JoinFragment::raw("JOIN mdl_enrol e ON e.userid=u.id", &["e"]))
        .unwrap();
    ds.add_entity(EnrolEntity::new()).unwrap();
    ds.add_all_from_entity("enrol").unwrap();
    let ds = ds.build().unwrap();

    let report = ds
        .compose(&ReportSelection::new().column(id("enrol:method")))
        .unwrap();
    assert_eq!(report.query.joins().len(), 1);
}

#[test]
fn test_unknown_default_column() {
    let ctx = context();
    let mut ds = DatasourceBuilder::new("typo", &ctx);
    ds.set_main_table("user", "u").unwrap();
    ds.add_entity(PersonEntity::new()).unwrap();
    ds.add_all_from_entity("person").unwrap();
    ds.set_default_columns(&["person:nickname"]).unwrap();

    let err = ds.build().unwrap_err();
    assert!(matches!(
        err,
        ReportError::Configuration(ConfigurationError::UnknownColumn(ref c)) if c == &id("person:nickname")
    ));
}

#[test]
fn test_default_must_be_exposed() {
    let ctx = context();
    let mut ds = DatasourceBuilder::new("partial", &ctx);
    ds.set_main_table("user", "u").unwrap();
    ds.add_entity(PersonEntity::new()).unwrap();
    ds.add_from_entity("person", &["name"], &[], &[]).unwrap();
    ds.set_default_columns(&["person:email"]).unwrap();
    assert!(ds.build().unwrap_err().is_configuration());
}

#[test]
fn test_add_from_entity_checks_names() {
    let ctx = context();
    let mut ds = DatasourceBuilder::new("partial", &ctx);
    ds.set_main_table("user", "u").unwrap();
    ds.add_entity(PersonEntity::new()).unwrap();

    let err = ds.add_from_entity("person", &[], &["nickname"], &[]).unwrap_err();
    assert!(matches!(
        err,
        ReportError::Configuration(ConfigurationError::UnknownFilter(_))
    ));
    let err = ds.add_all_from_entity("ghost").unwrap_err();
    assert!(matches!(
        err,
        ReportError::Configuration(ConfigurationError::UnknownEntity(_))
    ));
}

#[test]
fn test_entity_attached_twice() {
    let ctx = context();
    let mut ds = DatasourceBuilder::new("twice", &ctx);
    ds.set_main_table("user", "u").unwrap();
    ds.add_entity(PersonEntity::new()).unwrap();
    let err = ds.add_entity(PersonEntity::new()).unwrap_err();
    assert!(matches!(
        err,
        ReportError::Configuration(ConfigurationError::DuplicateEntity(_))
    ));
}

#[test]
fn test_missing_base_table() {
    let ctx = context();
    let ds = DatasourceBuilder::new("headless", &ctx);
    assert!(matches!(
        ds.build().unwrap_err(),
        ReportError::Configuration(ConfigurationError::MissingBaseTable(_))
    ));
}

#[test]
fn test_invalid_default_condition_value() {
    let ctx = context();
    let mut ds = DatasourceBuilder::new("bad_value", &ctx);
    ds.set_main_table("user", "u").unwrap();
    ds.add_entity(EnrolEntity::new()).unwrap();
    ds.add_all_from_entity("enrol").unwrap();
    ds.set_default_conditions(&["enrol:status"]).unwrap();
    ds.set_default_condition_value("enrol:status", FilterValue::Select("9".into()))
        .unwrap();
    assert!(matches!(
        ds.build().unwrap_err(),
        ReportError::InvalidFilterValue { .. }
    ));
}

#[test]
fn test_unsortable_sort_rejected() {
    let ds = Scenario { reversed: false }.initialise(&context()).unwrap();
    let err = ds
        .compose(&ReportSelection::new().sort(id("person:email"), SortDir::Asc))
        .unwrap_err();
    assert!(matches!(
        err,
        ReportError::Configuration(ConfigurationError::NotSortable(_))
    ));
}

#[test]
fn test_any_filter_adds_nothing() {
    let ds = Scenario { reversed: false }.initialise(&context()).unwrap();
    let report = ds
        .compose(
            &ReportSelection::new()
                .column(id("person:name"))
                .filter(id("person:email"), FilterValue::Any),
        )
        .unwrap();
    assert_eq!(
        report.query.to_sql(),
        "SELECT u.firstname AS c0_0 FROM mdl_user u"
    );
    assert!(report.query.params().is_empty());
}

#[test]
fn test_composed_sql_parses() {
    let ds = Scenario { reversed: true }.initialise(&context()).unwrap();
    let report = ds
        .compose(
            &ReportSelection::new()
                .column(id("person:name"))
                .column(id("person:email"))
                .column(id("enrol:status"))
                .filter(
                    id("person:email"),
                    FilterValue::Text(TextOperator::Contains, "o'brien_".into()),
                )
                .condition(id("enrol:status"), FilterValue::Select("1".into()))
                .sort(id("person:name"), SortDir::Asc),
        )
        .unwrap();

    let inlined = report.query.to_sql_inlined();
    assert!(inlined.contains("u.email LIKE '%o''brien|_%' ESCAPE '|'"), "{inlined}");
    validate_sql(&inlined);
    validate_sql(&report.query.count_sql());
}

#[test]
fn test_param_names_unique_across_composes() {
    let ds = Scenario { reversed: false }.initialise(&context()).unwrap();
    let selection = ReportSelection::new()
        .column(id("person:name"))
        .condition(id("enrol:status"), FilterValue::Select("0".into()));
    let first = ds.compose(&selection).unwrap();
    let second = ds.compose(&selection).unwrap();
    assert_ne!(first.query.params()[0].0, second.query.params()[0].0);
}
