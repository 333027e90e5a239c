use serde::Deserialize;

/// 课程学习计划查询条件，字段为空表示不过滤
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListCourseStudyPlansArgs {
    pub course_ids: Option<Vec<String>>,
    pub book_ids: Option<Vec<String>>,
}

/// 课程统计明细：主计划在课程内每个学生副本的条目
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListCourseStatisticItemsArgs {
    pub course_id: String,
    pub study_plan_id: String,
    /// 只统计这些班级的学生
    pub class_ids: Option<Vec<String>>,
}

/// 课程统计汇总
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListCourseStatisticArgs {
    pub course_id: String,
    pub study_plan_id: String,
    pub student_ids: Option<Vec<String>>,
}
