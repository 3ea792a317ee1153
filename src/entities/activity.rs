//! The `activity` entity: course modules and their completion state.
//!
//! Activity names live in one table per module type, so the name column
//! joins a `UNION ALL` derived table with one SELECT per installed module.
//! Module names come from the catalog and are interpolated into SQL, so each
//! is checked against the safe identifier pattern first.

use tracing::{debug, warn};

use crate::report::format::{completion_state, escaped_text, userdate};
use crate::report::{
    ColumnSpec, ColumnType, CompletionState, Entity, EntityContext, EntityCore, FilterKind,
    FilterSpec, LangString, ReportResult, SelectOption,
};
use crate::sql::{is_safe_identifier, JoinFragment, JoinType, ParamValue, UnionAll};

/// Columns a module table needs before it can contribute activity names.
const NAME_COLUMNS: [&str; 3] = ["id", "course", "name"];

/// Activities of one course. Expects `course_modules` to be joined by the
/// datasource.
#[derive(Debug, Clone)]
pub struct ActivityEntity {
    core: EntityCore,
    course_id: i64,
    modules: Vec<String>,
    names_join: Option<JoinFragment>,
}

impl ActivityEntity {
    pub fn new(course_id: i64) -> Self {
        Self {
            core: EntityCore::new(
                "activity",
                &[
                    ("course_modules", "cm"),
                    ("modules", "m"),
                    ("course_modules_completion", "cmc"),
                    ("activity_names", "act"),
                    ("user", "u"),
                ],
            ),
            course_id,
            modules: Vec::new(),
            names_join: None,
        }
    }

    /// Installed modules that passed the identifier check, in catalog order.
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    fn completion_state_sql(&self) -> ReportResult<String> {
        let cmc = self.get_table_alias("course_modules_completion")?;
        Ok(format!("COALESCE({cmc}.completionstate, 0)"))
    }

    fn time_completed_sql(&self) -> ReportResult<String> {
        let cmc = self.get_table_alias("course_modules_completion")?;
        Ok(format!(
            "CASE WHEN {cmc}.completionstate > 0 THEN {cmc}.timemodified END"
        ))
    }
}

impl Entity for ActivityEntity {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn prepare(&mut self, ctx: &EntityContext<'_>) -> ReportResult<()> {
        let cm = self.get_table_alias("course_modules")?.to_string();
        let m = self.get_table_alias("modules")?.to_string();
        let cmc = self.get_table_alias("course_modules_completion")?.to_string();
        let act = self.get_table_alias("activity_names")?.to_string();
        let u = self.get_table_alias("user")?.to_string();

        let mut names = UnionAll::new(&["modname", "instance", "name"]);
        let mut modules = Vec::new();
        for module in ctx.catalog.modules() {
            if !is_safe_identifier(module) {
                warn!(module = %module, "excluding module with unsafe name");
                continue;
            }
            modules.push(module.clone());
            if !NAME_COLUMNS.iter().all(|c| ctx.catalog.has_column(module, c)) {
                debug!(module = %module, "module table has no name columns");
                continue;
            }
            let course = ctx.params.fresh();
            let select = format!(
                "SELECT '{module}' AS modname, x.id AS instance, x.name AS name \
                 FROM {} x WHERE x.course = :{course}",
                ctx.table(module)
            );
            names = names.branch(select, [(course, ParamValue::Int(self.course_id))]);
        }
        debug!(
            modules = modules.len(),
            branches = names.len(),
            "built activity name union"
        );

        let names_sql = names.to_sql();
        self.names_join = Some(
            JoinFragment::subquery(JoinType::Left, names_sql, act.as_str())
                .on(format!(
                    "{act}.modname = {m}.name AND {act}.instance = {cm}.instance"
                ))
                .with_params(names.into_params()),
        );
        self.modules = modules;

        let core = self.core_mut();
        core.prepend_join(
            JoinFragment::left(ctx.table("course_modules_completion"), cmc.as_str()).on(format!(
                "{cmc}.coursemoduleid = {cm}.id AND {cmc}.userid = {u}.id"
            )),
        );
        core.prepend_join(
            JoinFragment::inner(ctx.table("modules"), m.as_str()).on(format!("{m}.id = {cm}.module")),
        );
        Ok(())
    }

    fn build_columns(&self, _ctx: &EntityContext<'_>) -> ReportResult<Vec<ColumnSpec>> {
        let m = self.get_table_alias("modules")?;
        let act = self.get_table_alias("activity_names")?;

        let mut name = ColumnSpec::new("name", LangString::key("activityname").with_fallback("Activity name"))
            .add_field(format!("{act}.name"))
            .set_sortable(true)
            .set_formatter(escaped_text());
        if let Some(join) = &self.names_join {
            name = name.add_join(join.clone());
        }

        Ok(vec![
            name,
            ColumnSpec::new("type", LangString::key("activitytype").with_fallback("Activity type"))
                .add_field(format!("{m}.name"))
                .set_sortable(true),
            ColumnSpec::new("completionstate", LangString::key("completionstate").with_fallback("Completion state"))
                .set_type(ColumnType::Integer)
                .add_field(self.completion_state_sql()?)
                .set_sortable(true)
                .set_formatter(completion_state()),
            ColumnSpec::new("timecompleted", LangString::key("timecompleted").with_fallback("Time completed"))
                .set_type(ColumnType::Timestamp)
                .add_field(self.time_completed_sql()?)
                .set_sortable(true)
                .set_formatter(userdate()),
        ])
    }

    fn build_filters(&self, _ctx: &EntityContext<'_>) -> ReportResult<Vec<FilterSpec>> {
        let m = self.get_table_alias("modules")?;

        let types = self
            .modules
            .iter()
            .map(|module| {
                SelectOption::new(
                    module.as_str(),
                    LangString::new(&format!("mod_{module}"), "modulename", module),
                )
            })
            .collect();
        let states = CompletionState::all()
            .into_iter()
            .map(|state| {
                SelectOption::new(
                    state.code().to_string(),
                    LangString::key("completionstate").with_fallback(state.label()),
                )
            })
            .collect();

        Ok(vec![
            FilterSpec::new(
                "type",
                LangString::key("activitytype").with_fallback("Activity type"),
                FilterKind::Select(types),
                format!("{m}.name"),
            ),
            FilterSpec::new(
                "completionstate",
                LangString::key("completionstate").with_fallback("Completion state"),
                FilterKind::Select(states),
                self.completion_state_sql()?,
            ),
            FilterSpec::new(
                "timecompleted",
                LangString::key("timecompleted").with_fallback("Time completed"),
                FilterKind::Date,
                self.time_completed_sql()?,
            ),
        ])
    }
}
