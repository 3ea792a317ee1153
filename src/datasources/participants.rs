//! Course participants: users, their enrolments and course completion.

use crate::entities::{
    enrol_join, user_enrolments_join, CompletionEntity, EnrolmentEntity, UserEntity,
};
use crate::report::{
    ComposedDatasource, Datasource, DatasourceBuilder, FilterValue, LangString, ReportContext,
    ReportResult,
};
use crate::sql::{Condition, SortDir};

/// Enrolled users. Restricted to one course when the context names one, in
/// which case course completion columns are available as well.
#[derive(Debug, Clone, Copy, Default)]
pub struct Participants;

impl Datasource for Participants {
    fn name(&self) -> &'static str {
        "participants"
    }

    fn label(&self) -> LangString {
        LangString::key("participants")
    }

    fn initialise(&self, ctx: &ReportContext) -> ReportResult<ComposedDatasource> {
        let mut ds = DatasourceBuilder::new(self.name(), ctx);
        ds.set_main_table("user", "u")?;

        ds.add_entity(UserEntity::new())?;
        ds.add_entity(EnrolmentEntity::new())?;
        if let Some(course) = ctx.course_id {
            ds.add_entity(CompletionEntity::new(course))?;
        }

        ds.add_join(user_enrolments_join(&ctx.table("user_enrolments"), "ue", "u"))?;
        ds.add_join(enrol_join(&ctx.table("enrol"), "e", "ue"))?;

        ds.add_base_condition(Condition::new("u.deleted = 0"));
        if let Some(course) = ctx.course_id {
            ds.add_base_condition_equals("e.courseid", course);
        }

        ds.add_all_from_entity("user")?;
        ds.add_all_from_entity("enrolment")?;
        if ctx.course_id.is_some() {
            ds.add_all_from_entity("completion")?;
        }

        ds.set_default_columns(&[
            "user:fullname",
            "user:email",
            "enrolment:method",
            "enrolment:timestarted",
            "enrolment:status",
        ])?;
        ds.set_default_filters(&["user:fullname", "user:email", "enrolment:method"])?;
        ds.set_default_conditions(&["enrolment:status"])?;
        ds.set_default_condition_value("enrolment:status", FilterValue::Select("0".into()))?;
        ds.add_default_sort("user:fullname", SortDir::Asc)?;

        ds.set_bulk_action(
            "emailselected",
            "/local/reportsource/bulkemail.php",
            LangString::key("emailselected").with_fallback("Email selected users"),
        );
        ds.build()
    }
}
