use sea_orm::prelude::DateTimeWithTimeZone;
use serde::Deserialize;

/// 提交列表筛选条件
///
/// 列表按 `student_submission_id` 倒序分页，`offset_id` 为上一页最后一条的 id。
/// 只有同时给出 `start_date` 与 `end_date` 时才按条目开始时间过滤。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentSubmissionFilter {
    pub limit: u32,
    pub offset_id: Option<String>,
    pub student_ids: Option<Vec<String>>,
    pub statuses: Option<Vec<String>>,
    pub start_date: Option<DateTimeWithTimeZone>,
    pub end_date: Option<DateTimeWithTimeZone>,
    pub created_at: Option<DateTimeWithTimeZone>,
    pub assignment_name: Option<String>,
    pub course_id: Option<String>,
    #[serde(default)]
    pub class_ids: Vec<String>,
    #[serde(default)]
    pub location_ids: Vec<String>,
    pub student_name: Option<String>,
}

/// 批改结果与提交的对应
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionGrade {
    pub student_submission_grade_id: String,
    pub student_submission_id: String,
}
