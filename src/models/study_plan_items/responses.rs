use sea_orm::prelude::{DateTimeWithTimeZone, Json};
use sea_orm::{DbErr, FromQueryResult, QueryResult};

use crate::entity::study_plan_items;

/// 学生及其名下的条目副本
#[derive(Debug, Clone, PartialEq)]
pub struct StudentStudyPlanItem {
    pub student_id: String,
    pub item: study_plan_items::Model,
}

impl FromQueryResult for StudentStudyPlanItem {
    fn from_query_result(res: &QueryResult, pre: &str) -> Result<Self, DbErr> {
        Ok(Self {
            student_id: res.try_get(pre, "student_id")?,
            item: study_plan_items::Model::from_query_result(res, pre)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, FromQueryResult)]
pub struct LearningMaterialStudyPlanItem {
    pub learning_material_id: String,
    pub study_plan_item_id: String,
}

/// 学习进度所需的条目字段
#[derive(Debug, Clone, PartialEq, FromQueryResult)]
pub struct StudyProgressItem {
    pub study_plan_item_id: String,
    pub content_structure: Option<Json>,
    pub completed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Debug, Clone, FromQueryResult)]
pub(crate) struct StudyPlanBookCourseRow {
    pub study_plan_id: String,
    pub book_id: Option<String>,
    pub course_id: Option<String>,
}

#[derive(Debug, Clone, FromQueryResult)]
pub(crate) struct ItemCountRow {
    pub root_study_plan_item_id: Option<String>,
    pub count_student: i64,
}
