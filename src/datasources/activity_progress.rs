//! Activity progress: one row per enrolled user and tracked activity.

use crate::entities::{
    enrol_join, user_enrolments_join, ActivityEntity, CompletionEntity, EnrolmentEntity,
    UserEntity,
};
use crate::report::{
    ComposedDatasource, ConfigurationError, Datasource, DatasourceBuilder, FilterValue,
    LangString, ReportContext, ReportResult,
};
use crate::sql::{Condition, JoinFragment, SortDir};

#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityProgress;

impl Datasource for ActivityProgress {
    fn name(&self) -> &'static str {
        "activity_progress"
    }

    fn label(&self) -> LangString {
        LangString::key("activity_progress")
    }

    fn initialise(&self, ctx: &ReportContext) -> ReportResult<ComposedDatasource> {
        let course = ctx
            .course_id
            .ok_or_else(|| ConfigurationError::MissingParameter {
                datasource: self.name().to_string(),
                parameter: "a course id".to_string(),
            })?;

        let mut ds = DatasourceBuilder::new(self.name(), ctx);
        ds.set_main_table("user", "u")?;

        ds.add_entity(UserEntity::new())?;
        ds.add_entity(EnrolmentEntity::new())?;
        ds.add_entity(ActivityEntity::new(course))?;
        ds.add_entity(CompletionEntity::new(course))?;

        ds.add_join(user_enrolments_join(&ctx.table("user_enrolments"), "ue", "u"))?;
        ds.add_join(enrol_join(&ctx.table("enrol"), "e", "ue"))?;
        ds.add_join(
            JoinFragment::inner(ctx.table("course_modules"), "cm").on("cm.course = e.courseid"),
        )?;

        ds.add_base_condition(Condition::new("u.deleted = 0"));
        ds.add_base_condition_equals("e.courseid", course);
        ds.add_base_condition(Condition::new("cm.completion > 0"));
        ds.add_base_condition(Condition::new("cm.deletioninprogress = 0"));

        ds.add_from_entity("user", &["fullname", "email", "lastaccess"], &["fullname", "email"], &[])?;
        ds.add_from_entity("enrolment", &["status"], &[], &["status"])?;
        ds.add_all_from_entity("activity")?;
        ds.add_from_entity(
            "completion",
            &["completed", "progress"],
            &["completed"],
            &[],
        )?;

        ds.set_default_columns(&[
            "user:fullname",
            "activity:name",
            "activity:type",
            "activity:completionstate",
            "activity:timecompleted",
        ])?;
        ds.set_default_filters(&["user:fullname", "activity:type", "activity:completionstate"])?;
        ds.set_default_conditions(&["enrolment:status"])?;
        ds.set_default_condition_value("enrolment:status", FilterValue::Select("0".into()))?;
        ds.add_default_sort("user:fullname", SortDir::Asc)?;
        ds.add_default_sort("activity:name", SortDir::Asc)?;
        ds.build()
    }
}
