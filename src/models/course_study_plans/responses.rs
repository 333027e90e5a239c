use sea_orm::prelude::{DateTimeWithTimeZone, Json};
use sea_orm::{DbErr, FromQueryResult, QueryResult};
use serde::Serialize;

use crate::models::ContentStructure;

/// 学生副本中的一个条目
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseStatisticItem {
    pub content_structure: ContentStructure,
    pub student_id: String,
    /// 主计划中对应条目的 id
    pub root_study_plan_item_id: Option<String>,
    pub study_plan_item_id: String,
    pub status: String,
    pub completed_at: Option<DateTimeWithTimeZone>,
    pub learning_material_id: Option<String>,
}

impl FromQueryResult for CourseStatisticItem {
    fn from_query_result(res: &QueryResult, pre: &str) -> Result<Self, DbErr> {
        let content: Json = res.try_get(pre, "content_structure")?;
        let content_structure = ContentStructure::from_json(content)
            .map_err(|e| DbErr::Type(e.message().to_string()))?;

        Ok(Self {
            content_structure,
            student_id: res.try_get(pre, "student_id")?,
            root_study_plan_item_id: res.try_get(pre, "root_study_plan_item_id")?,
            study_plan_item_id: res.try_get(pre, "study_plan_item_id")?,
            status: res.try_get(pre, "status")?,
            completed_at: res.try_get(pre, "completed_at")?,
            learning_material_id: res.try_get(pre, "learning_material_id")?,
        })
    }
}

/// 学习材料统计
///
/// `average_score` 为百分制平均分，没有已批改的提交时为 -1。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningMaterialStatistic {
    pub learning_material_id: String,
    pub topic_id: String,
    pub total_assign_student: i32,
    pub completed_student: i32,
    pub average_score: i32,
    pub average_score_raw: Option<i32>,
}

/// 主题统计，学生完成主题下全部有效学习材料才计为完成
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicStatistic {
    pub topic_id: String,
    pub total_assign_student: i32,
    pub completed_student: i32,
    pub average_score: i32,
}

pub const STATISTIC_TYPE_LEARNING_MATERIAL: &str = "LEARNING_MATERIAL";
pub const STATISTIC_TYPE_TOPIC: &str = "TOPIC";

/// 统计查询的原始行，按 `statistic_type` 区分主题与学习材料
#[derive(Debug, Clone, FromQueryResult)]
pub(crate) struct ItemStatisticRow {
    pub learning_material_id: String,
    pub topic_id: String,
    pub total_assign_student: i32,
    pub completed_student: i32,
    pub average_score: i32,
    pub average_score_raw: Option<i32>,
    pub statistic_type: String,
}
