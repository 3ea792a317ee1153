//! The `user` entity.

use crate::report::format::{escaped_text, userdate, yes_no};
use crate::report::{
    ColumnSpec, ColumnType, Entity, EntityContext, EntityCore, FilterKind, FilterSpec, LangString,
    ReportResult,
};

/// Display name expression for the user table aliased `alias`.
///
/// Shared by every entity or datasource that needs to show a person.
pub fn fullname_sql(alias: &str) -> String {
    format!("CONCAT({alias}.firstname, ' ', {alias}.lastname)")
}

/// People. The base entity of most datasources.
#[derive(Debug, Clone)]
pub struct UserEntity {
    core: EntityCore,
}

impl UserEntity {
    pub fn new() -> Self {
        Self {
            core: EntityCore::new("user", &[("user", "u")]),
        }
    }
}

impl Default for UserEntity {
    fn default() -> Self {
        Self::new()
    }
}

impl Entity for UserEntity {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn build_columns(&self, ctx: &EntityContext<'_>) -> ReportResult<Vec<ColumnSpec>> {
        let u = self.get_table_alias("user")?;

        let mut columns = vec![
            ColumnSpec::new("fullname", LangString::key("fullname").with_fallback("Full name"))
                .add_field(fullname_sql(u))
                .set_sortable(true)
                .set_formatter(escaped_text()),
            ColumnSpec::new("email", LangString::key("email"))
                .add_field(format!("{u}.email"))
                .set_sortable(true)
                .set_formatter(escaped_text()),
            ColumnSpec::new("username", LangString::key("username"))
                .add_field(format!("{u}.username"))
                .set_sortable(true),
        ];

        // Not every deployment keeps an external id on the user table.
        if ctx.catalog.has_column("user", "idnumber") {
            columns.push(
                ColumnSpec::new("idnumber", LangString::key("idnumber").with_fallback("ID number"))
                    .add_field(format!("{u}.idnumber"))
                    .set_sortable(true),
            );
        }

        columns.extend([
            ColumnSpec::new("lastaccess", LangString::key("lastaccess").with_fallback("Last access"))
                .set_type(ColumnType::Timestamp)
                .add_field(format!("{u}.lastaccess"))
                .set_sortable(true)
                .set_formatter(userdate()),
            ColumnSpec::new("suspended", LangString::key("suspended"))
                .set_type(ColumnType::Boolean)
                .add_field(format!("{u}.suspended"))
                .set_sortable(true)
                .set_formatter(yes_no()),
        ]);
        Ok(columns)
    }

    fn build_filters(&self, _ctx: &EntityContext<'_>) -> ReportResult<Vec<FilterSpec>> {
        let u = self.get_table_alias("user")?;
        Ok(vec![
            FilterSpec::new(
                "fullname",
                LangString::key("fullname").with_fallback("Full name"),
                FilterKind::Text,
                fullname_sql(u),
            ),
            FilterSpec::new(
                "email",
                LangString::key("email"),
                FilterKind::Text,
                format!("{u}.email"),
            ),
            FilterSpec::new(
                "lastaccess",
                LangString::key("lastaccess").with_fallback("Last access"),
                FilterKind::Date,
                format!("{u}.lastaccess"),
            ),
            FilterSpec::new(
                "suspended",
                LangString::key("suspended"),
                FilterKind::Boolean,
                format!("{u}.suspended"),
            ),
        ])
    }
}
