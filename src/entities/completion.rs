//! The `completion` entity: course completion of one course.

use crate::report::format::{check_icon, percent, userdate};
use crate::report::{
    ColumnSpec, ColumnType, Entity, EntityContext, EntityCore, FilterKind, FilterSpec, LangString,
    ReportResult,
};
use crate::sql::{JoinFragment, JoinType};

/// Course completion for `course_id`, joined onto the user table.
#[derive(Debug, Clone)]
pub struct CompletionEntity {
    core: EntityCore,
    course_id: i64,
    progress_joins: Vec<JoinFragment>,
}

impl CompletionEntity {
    pub fn new(course_id: i64) -> Self {
        Self {
            core: EntityCore::new(
                "completion",
                &[
                    ("course_completions", "ccomp"),
                    ("user", "u"),
                    ("completion_progress", "cprog"),
                    ("completion_total", "ctot"),
                ],
            ),
            course_id,
            progress_joins: Vec::new(),
        }
    }

    fn completed_sql(&self) -> ReportResult<String> {
        let ccomp = self.get_table_alias("course_completions")?;
        Ok(format!(
            "CASE WHEN {ccomp}.timecompleted > 0 THEN 1 ELSE 0 END"
        ))
    }
}

impl Entity for CompletionEntity {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn prepare(&mut self, ctx: &EntityContext<'_>) -> ReportResult<()> {
        let ccomp = self.get_table_alias("course_completions")?.to_string();
        let u = self.get_table_alias("user")?.to_string();
        let cprog = self.get_table_alias("completion_progress")?.to_string();
        let ctot = self.get_table_alias("completion_total")?.to_string();
        let cm = ctx.table("course_modules");
        let cmc = ctx.table("course_modules_completion");

        let course = ctx.params.fresh();
        let completions = JoinFragment::left(ctx.table("course_completions"), ccomp.as_str())
            .on(format!(
                "{ccomp}.userid = {u}.id AND {ccomp}.course = :{course}"
            ))
            .with_param(course, self.course_id);
        self.core_mut().prepend_join(completions);

        // Activities with completion tracking, done per user and in total.
        let done_course = ctx.params.fresh();
        let done = format!(
            "SELECT pcmc.userid, COUNT(1) AS done \
             FROM {cm} pcm JOIN {cmc} pcmc ON pcmc.coursemoduleid = pcm.id \
             WHERE pcm.course = :{done_course} AND pcm.completion > 0 AND pcmc.completionstate > 0 \
             GROUP BY pcmc.userid"
        );
        let total_course = ctx.params.fresh();
        let total = format!(
            "SELECT COUNT(1) AS total FROM {cm} tcm \
             WHERE tcm.course = :{total_course} AND tcm.completion > 0"
        );
        self.progress_joins = vec![
            JoinFragment::subquery(JoinType::Left, done, cprog.as_str())
                .on(format!("{cprog}.userid = {u}.id"))
                .with_param(done_course, self.course_id),
            JoinFragment::subquery(JoinType::Cross, total, ctot.as_str())
                .with_param(total_course, self.course_id),
        ];
        Ok(())
    }

    fn build_columns(&self, _ctx: &EntityContext<'_>) -> ReportResult<Vec<ColumnSpec>> {
        let ccomp = self.get_table_alias("course_completions")?;
        let cprog = self.get_table_alias("completion_progress")?;
        let ctot = self.get_table_alias("completion_total")?;

        Ok(vec![
            ColumnSpec::new("completed", LangString::key("completed"))
                .set_type(ColumnType::Boolean)
                .add_field(self.completed_sql()?)
                .set_sortable(true)
                .set_formatter(check_icon()),
            ColumnSpec::new("timecompleted", LangString::key("timecompleted").with_fallback("Time completed"))
                .set_type(ColumnType::Timestamp)
                .add_field(format!("{ccomp}.timecompleted"))
                .set_sortable(true)
                .set_formatter(userdate()),
            ColumnSpec::new("timeenrolled", LangString::key("timeenrolled").with_fallback("Time enrolled"))
                .set_type(ColumnType::Timestamp)
                .add_field(format!("{ccomp}.timeenrolled"))
                .set_sortable(true)
                .set_formatter(userdate()),
            ColumnSpec::new("progress", LangString::key("progress"))
                .set_type(ColumnType::Float)
                .add_field(format!(
                    "CASE WHEN {ctot}.total > 0 THEN 100.0 * COALESCE({cprog}.done, 0) / {ctot}.total END"
                ))
                .add_joins(self.progress_joins.iter().cloned())
                .set_sortable(true)
                .set_formatter(percent(0)),
        ])
    }

    fn build_filters(&self, _ctx: &EntityContext<'_>) -> ReportResult<Vec<FilterSpec>> {
        let ccomp = self.get_table_alias("course_completions")?;
        Ok(vec![
            FilterSpec::new(
                "completed",
                LangString::key("completed"),
                FilterKind::Boolean,
                self.completed_sql()?,
            ),
            FilterSpec::new(
                "timecompleted",
                LangString::key("timecompleted").with_fallback("Time completed"),
                FilterKind::Date,
                format!("{ccomp}.timecompleted"),
            ),
        ])
    }
}
