//! The `enrolment` entity: user enrolments and the enrolment instance they
//! belong to.

use crate::report::format::{enrolment_status, userdate};
use crate::report::{
    ColumnSpec, ColumnType, Entity, EntityContext, EntityCore, FilterKind, FilterSpec, LangString,
    ReportResult, SelectOption,
};
use crate::sql::JoinFragment;

/// Enrolment plugins offered by the method filter.
pub const ENROLMENT_METHODS: [&str; 5] = ["manual", "self", "cohort", "guest", "meta"];

/// `JOIN <user_enrolments> ue ON ue.userid = u.id`
pub fn user_enrolments_join(table: &str, ue: &str, u: &str) -> JoinFragment {
    JoinFragment::inner(table, ue).on(format!("{ue}.userid = {u}.id"))
}

/// `JOIN <enrol> e ON e.id = ue.enrolid`
pub fn enrol_join(table: &str, e: &str, ue: &str) -> JoinFragment {
    JoinFragment::inner(table, e).on(format!("{e}.id = {ue}.enrolid"))
}

/// Enrolments. Expects `user_enrolments` to be joined by the datasource.
#[derive(Debug, Clone)]
pub struct EnrolmentEntity {
    core: EntityCore,
}

impl EnrolmentEntity {
    pub fn new() -> Self {
        Self {
            core: EntityCore::new("enrolment", &[("user_enrolments", "ue"), ("enrol", "e")]),
        }
    }
}

impl Default for EnrolmentEntity {
    fn default() -> Self {
        Self::new()
    }
}

impl Entity for EnrolmentEntity {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn prepare(&mut self, ctx: &EntityContext<'_>) -> ReportResult<()> {
        let ue = self.get_table_alias("user_enrolments")?.to_string();
        let e = self.get_table_alias("enrol")?.to_string();
        self.core_mut()
            .prepend_join(enrol_join(&ctx.table("enrol"), &e, &ue));
        Ok(())
    }

    fn build_columns(&self, _ctx: &EntityContext<'_>) -> ReportResult<Vec<ColumnSpec>> {
        let ue = self.get_table_alias("user_enrolments")?;
        let e = self.get_table_alias("enrol")?;

        let timestamp = |name: &str, fallback: &str, field: String| {
            ColumnSpec::new(name, LangString::key(name).with_fallback(fallback))
                .set_type(ColumnType::Timestamp)
                .add_field(field)
                .set_sortable(true)
                .set_formatter(userdate())
        };

        Ok(vec![
            ColumnSpec::new("method", LangString::key("method"))
                .add_field(format!("{e}.enrol"))
                .set_sortable(true),
            timestamp("timestarted", "Time started", format!("{ue}.timestart")),
            timestamp("timeended", "Time ended", format!("{ue}.timeend")),
            timestamp("timecreated", "Time created", format!("{ue}.timecreated")),
            ColumnSpec::new("status", LangString::key("status"))
                .set_type(ColumnType::Integer)
                .add_field(format!("{ue}.status"))
                .set_sortable(true)
                .set_formatter(enrolment_status()),
        ])
    }

    fn build_filters(&self, _ctx: &EntityContext<'_>) -> ReportResult<Vec<FilterSpec>> {
        let ue = self.get_table_alias("user_enrolments")?;
        let e = self.get_table_alias("enrol")?;

        let methods = ENROLMENT_METHODS
            .iter()
            .map(|m| {
                SelectOption::new(
                    *m,
                    LangString::new(&format!("enrol_{m}"), "pluginname", m),
                )
            })
            .collect();
        let statuses = vec![
            SelectOption::new("0", LangString::key("active")),
            SelectOption::new("1", LangString::key("suspended")),
        ];

        Ok(vec![
            FilterSpec::new(
                "method",
                LangString::key("method"),
                FilterKind::Select(methods),
                format!("{e}.enrol"),
            ),
            FilterSpec::new(
                "timestarted",
                LangString::key("timestarted").with_fallback("Time started"),
                FilterKind::Date,
                format!("{ue}.timestart"),
            ),
            FilterSpec::new(
                "timeended",
                LangString::key("timeended").with_fallback("Time ended"),
                FilterKind::Date,
                format!("{ue}.timeend"),
            ),
            FilterSpec::new(
                "status",
                LangString::key("status"),
                FilterKind::Select(statuses),
                format!("{ue}.status"),
            ),
        ])
    }
}
