//! 仓储层的请求参数与查询结果
//!
//! 按所属仓储分目录，每个目录下 `requests` 为查询参数，`responses` 为组合查询的结果行。

pub mod common;
pub mod course_study_plans;
pub mod student_study_plans;
pub mod study_plan_items;
pub mod study_plans;
pub mod submissions;

pub use common::{
    AssignmentType, ContentStructure, StudyPlanItemStatus, StudyPlanStatus, StudyPlanType,
    SubmissionStatus, UpdateStartEndDateFields,
};
