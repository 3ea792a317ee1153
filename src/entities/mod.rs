//! Entities shipped with the crate.
//!
//! | entity       | tables                                              |
//! |--------------|-----------------------------------------------------|
//! | `user`       | `user` (u)                                          |
//! | `enrolment`  | `user_enrolments` (ue), `enrol` (e)                 |
//! | `completion` | `course_completions` (ccomp)                        |
//! | `activity`   | `course_modules` (cm), `modules` (m), `course_modules_completion` (cmc), name union (act) |

mod activity;
mod completion;
mod enrolment;
mod user;

pub use activity::ActivityEntity;
pub use completion::CompletionEntity;
pub use enrolment::{enrol_join, user_enrolments_join, EnrolmentEntity, ENROLMENT_METHODS};
pub use user::{fullname_sql, UserEntity};
